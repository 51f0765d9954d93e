use hc_coach::{
    CoachOrchestrator, CompletionProvider, GeminiProvider, InMemoryConversationLog,
    OrchestratorSettings,
};
use hc_config::DaemonConfig;
use hc_quota::QuotaLedger;
use hc_records::{BatchProcessor, SqliteRecordStore};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub config: DaemonConfig,
    pub orchestrator: Arc<CoachOrchestrator>,
    pub processor: Arc<BatchProcessor>,
    pub store: Arc<SqliteRecordStore>,
    pub version: &'static str,
}

impl AppState {
    /// Open the record database and wire the Gemini provider from config.
    pub fn new(config: DaemonConfig) -> anyhow::Result<Self> {
        let db_path = config.database_path()?;
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = Arc::new(SqliteRecordStore::open(&db_path)?);

        let api_key = config.llm.resolved_api_key().unwrap_or_else(|| {
            tracing::warn!("No Gemini API key configured; chat requests will fail");
            String::new()
        });
        let provider = Arc::new(GeminiProvider::new(
            api_key,
            config.llm.base_url.clone(),
            Duration::from_secs(config.llm.request_timeout_secs),
        )?);

        Ok(Self::with_parts(config, provider, store))
    }

    pub fn with_parts(
        config: DaemonConfig,
        provider: Arc<dyn CompletionProvider>,
        store: Arc<SqliteRecordStore>,
    ) -> Self {
        let settings = OrchestratorSettings {
            models: config.llm.models.clone(),
            default_retry_delay_secs: config.llm.default_retry_delay_secs,
            system_prompt: config.llm.system_prompt.clone(),
        };
        let orchestrator = CoachOrchestrator::new(provider, Arc::new(QuotaLedger::new()), settings)
            .with_log(Arc::new(InMemoryConversationLog::new()));
        let processor = Arc::new(BatchProcessor::new(store.clone()));

        Self {
            config,
            orchestrator: Arc::new(orchestrator),
            processor,
            store,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
