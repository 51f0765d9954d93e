pub mod context;
pub mod error;
pub mod gemini;
pub mod normalize;
pub mod orchestrator;
pub mod provider;
pub mod transcript;

pub use context::{ChatTurn, Role, DEFAULT_MAX_HISTORY_DEPTH};
pub use error::{CoachError, ProviderError};
pub use gemini::GeminiProvider;
pub use normalize::{CompletionResult, MULTIPLE_CALLS_NAME};
pub use orchestrator::{CoachOrchestrator, CompletionRequest, OrchestratorSettings};
pub use provider::{
    BlockThreshold, CallableSchema, CompletionProvider, HarmCategory, ProviderContext,
    ProviderResponse, SafetyPolicy, StructuredCall,
};
pub use transcript::{ConversationLog, InMemoryConversationLog};
