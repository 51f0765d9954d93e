//! Shared helpers used by the `healthcoachd` binary.

use hc_config::{ConfigPaths, DaemonConfig};
use hc_records::{BatchProcessor, BatchProposal, BatchResult, ProposalItem, SqliteRecordStore};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Build-time daemon version string.
///
/// `HEALTHCOACHD_VERSION` from the build environment wins over the crate
/// package version.
pub const DAEMON_VERSION: &str = match option_env!("HEALTHCOACHD_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

pub const DEFAULT_LOG_FILTER: &str =
    "healthcoachd=info,hc_api=info,hc_coach=info,hc_records=info,tower_http=info";

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Config paths rooted at `config_dir`, or `~/.healthcoach` when absent.
pub fn resolve_paths(config_dir: Option<PathBuf>) -> anyhow::Result<ConfigPaths> {
    match config_dir {
        Some(dir) => Ok(ConfigPaths::with_base(dir)),
        None => ConfigPaths::new(),
    }
}

pub fn load_config(config_dir: Option<PathBuf>) -> anyhow::Result<DaemonConfig> {
    let paths = resolve_paths(config_dir)?;
    DaemonConfig::load_from(&paths)
}

/// Effective config as TOML. The API key is never written out.
pub fn render_config(config: &DaemonConfig) -> anyhow::Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

// ---------------------------------------------------------------------------
// Batch import
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum BatchFile {
    Wrapped { records: Vec<ProposalItem> },
    Bare(Vec<ProposalItem>),
}

/// Reads a `{ "records": [...] }` file (a bare array is accepted too).
pub fn read_batch_file(path: &Path) -> anyhow::Result<BatchProposal> {
    let content = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    let file: BatchFile = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Invalid batch file {}: {}", path.display(), e))?;
    let items = match file {
        BatchFile::Wrapped { records } => records,
        BatchFile::Bare(records) => records,
    };
    Ok(BatchProposal::new(items))
}

/// Validates and commits the records in `path` against the configured database.
pub fn import_batch(config: &DaemonConfig, path: &Path) -> anyhow::Result<BatchResult> {
    let proposal = read_batch_file(path)?;
    let db_path = config.database_path()?;
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let store = Arc::new(SqliteRecordStore::open(&db_path)?);
    let processor = BatchProcessor::new(store);
    Ok(processor.process(&proposal)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use hc_records::RecordKind;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn config_in(dir: &Path) -> DaemonConfig {
        load_config(Some(dir.to_path_buf())).unwrap()
    }

    #[test]
    fn load_config_defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        assert_eq!(config.port, 9410);
        assert_eq!(
            config.database_path().unwrap(),
            dir.path().join("records.db")
        );
    }

    #[test]
    fn load_config_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "config.toml", "port = 0\n");
        assert!(load_config(Some(dir.path().to_path_buf())).is_err());
    }

    #[test]
    fn render_config_omits_api_key() {
        let mut config = DaemonConfig::default();
        config.llm.api_key = Some("secret-key".to_string());
        let rendered = render_config(&config).unwrap();
        assert!(rendered.contains("port = 9410"));
        assert!(rendered.contains("[llm]"));
        assert!(!rendered.contains("secret-key"));
    }

    #[test]
    fn read_batch_file_accepts_wrapped_and_bare() {
        let dir = tempfile::tempdir().unwrap();
        let wrapped = write(
            dir.path(),
            "wrapped.json",
            r#"{"records": [{"record_type": "habit", "data": {"name": "Read"}}]}"#,
        );
        let bare = write(
            dir.path(),
            "bare.json",
            r#"[{"record_type": "habit", "data": {"name": "Read"}}, {"record_type": "meal"}]"#,
        );
        assert_eq!(read_batch_file(&wrapped).unwrap().len(), 1);
        assert_eq!(read_batch_file(&bare).unwrap().len(), 2);
    }

    #[test]
    fn read_batch_file_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bad.json", "{not json");
        let err = read_batch_file(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid batch file"));
    }

    #[test]
    fn import_batch_commits_valid_records() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let path = write(
            dir.path(),
            "batch.json",
            r#"{"records": [
                {"record_type": "meal", "data": {"date": "2024-03-03", "meal_type": "Dinner", "calories": "650"}},
                {"record_type": "meal", "data": {"date": "2024-03-03"}}
            ]}"#,
        );

        let result = import_batch(&config, &path).unwrap();
        assert_eq!((result.total, result.successful, result.failed), (2, 1, 1));

        let store = SqliteRecordStore::open(&config.database_path().unwrap()).unwrap();
        assert_eq!(store.record_counts().unwrap()[&RecordKind::Meal], 1);
    }

    #[test]
    fn import_batch_fails_when_nothing_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let empty = write(dir.path(), "empty.json", r#"{"records": []}"#);
        let invalid = write(
            dir.path(),
            "invalid.json",
            r#"{"records": [{"record_type": "meal", "data": {}}]}"#,
        );

        let err = import_batch(&config, &empty).unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));
        let err = import_batch(&config, &invalid).unwrap_err();
        assert!(err.to_string().contains("All records failed"));
    }
}
