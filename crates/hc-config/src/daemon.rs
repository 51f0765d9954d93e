use serde::{Deserialize, Serialize};
use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::llm::LlmConfig;
use crate::paths::ConfigPaths;

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    9410
}

fn default_allowed_origins() -> Vec<String> {
    match env::var("HEALTHCOACH_ALLOWED_ORIGINS") {
        Ok(val) => val
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(skip)]
    paths: Option<ConfigPaths>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
            database_path: None,
            llm: LlmConfig::default(),
            paths: None,
        }
    }
}

impl DaemonConfig {
    /// Returns the `ConfigPaths` for this config. If paths haven't been set,
    /// creates the default paths (may fail if `$HOME` is unset).
    pub fn paths(&self) -> anyhow::Result<ConfigPaths> {
        match &self.paths {
            Some(p) => Ok(p.clone()),
            None => ConfigPaths::new(),
        }
    }

    pub fn set_paths(&mut self, paths: ConfigPaths) {
        self.paths = Some(paths);
    }

    /// Load config from the default location (`~/.healthcoach/config.toml`).
    pub fn load() -> anyhow::Result<Self> {
        let paths = ConfigPaths::new()?;
        Self::load_from(&paths)
    }

    pub fn load_from(paths: &ConfigPaths) -> anyhow::Result<Self> {
        let config_file = paths.config_path();
        let mut config = if config_file.exists() {
            let content = std::fs::read_to_string(&config_file)?;
            toml::from_str::<DaemonConfig>(&content)?
        } else {
            Self::default()
        };
        config.paths = Some(paths.clone());
        config.validate()?;
        Ok(config)
    }

    /// Validate config values. Called automatically by `load` / `load_from`.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must not be 0");
        }
        if self.llm.models.is_empty() {
            anyhow::bail!("llm.models must not be empty");
        }
        if self.llm.models.iter().any(|m| m.trim().is_empty()) {
            anyhow::bail!("llm.models must not contain blank model names");
        }
        if self.llm.request_timeout_secs == 0 {
            anyhow::bail!("llm.request_timeout_secs must be greater than 0");
        }
        if self.llm.base_url.is_empty() {
            anyhow::bail!("llm.base_url must not be empty");
        }
        Ok(())
    }

    /// Explicit `database_path`, or `records.db` under the config directory.
    pub fn database_path(&self) -> anyhow::Result<PathBuf> {
        match &self.database_path {
            Some(p) => Ok(p.clone()),
            None => Ok(self.paths()?.database_path()),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_paths() -> ConfigPaths {
        let dir = tempfile::tempdir().unwrap();
        ConfigPaths::with_base(dir.keep())
    }

    #[test]
    fn default_produces_expected_values() {
        let config = DaemonConfig::default();
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.port, 9410);
        assert!(config.database_path.is_none());
        assert_eq!(config.llm.max_history_depth, 10);
    }

    #[test]
    fn bind_addr_formats_correctly() {
        let mut config = DaemonConfig::default();
        config.port = 8080;
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn load_with_no_file_returns_default() {
        let paths = test_paths();
        paths.ensure_config_dir().unwrap();
        let config = DaemonConfig::load_from(&paths).unwrap();
        assert_eq!(config.port, 9410);
        assert_eq!(config.database_path().unwrap(), paths.database_path());
    }

    #[test]
    fn load_with_nested_llm_table() {
        let paths = test_paths();
        paths.ensure_config_dir().unwrap();
        std::fs::write(
            paths.config_path(),
            "port = 8888\n\n[llm]\nmodels = [\"primary\", \"backup\"]\nmax_history_depth = 4\n",
        )
        .unwrap();
        let config = DaemonConfig::load_from(&paths).unwrap();
        assert_eq!(config.port, 8888);
        assert_eq!(config.llm.models, vec!["primary", "backup"]);
        assert_eq!(config.llm.max_history_depth, 4);
        // untouched fields keep their defaults
        assert_eq!(config.llm.default_retry_delay_secs, 3600);
    }

    #[test]
    fn explicit_database_path_is_used() {
        let paths = test_paths();
        paths.ensure_config_dir().unwrap();
        std::fs::write(paths.config_path(), "database_path = \"/data/coach.db\"\n").unwrap();
        let config = DaemonConfig::load_from(&paths).unwrap();
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/data/coach.db")
        );
    }

    #[test]
    fn load_with_invalid_toml_returns_error() {
        let paths = test_paths();
        paths.ensure_config_dir().unwrap();
        std::fs::write(paths.config_path(), "not valid {{{{ toml").unwrap();
        assert!(DaemonConfig::load_from(&paths).is_err());
    }

    #[test]
    fn load_rejects_empty_model_chain() {
        let paths = test_paths();
        paths.ensure_config_dir().unwrap();
        std::fs::write(paths.config_path(), "[llm]\nmodels = []\n").unwrap();
        assert!(DaemonConfig::load_from(&paths).is_err());
    }

    #[test]
    fn validate_rejects_port_zero() {
        let mut config = DaemonConfig::default();
        config.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_model_name() {
        let mut config = DaemonConfig::default();
        config.llm.models.push("  ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = DaemonConfig::default();
        config.llm.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_roundtrip() {
        let config = DaemonConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: DaemonConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.port, config.port);
        assert_eq!(deserialized.host, config.host);
        assert_eq!(deserialized.llm.models, config.llm.models);
    }
}
