pub mod daemon;
pub mod llm;
pub mod paths;

pub use daemon::DaemonConfig;
pub use llm::LlmConfig;
pub use paths::ConfigPaths;
