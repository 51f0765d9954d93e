use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::ChatTurn;
use crate::error::ProviderError;

/// A named request emitted by the model to trigger a concrete operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl StructuredCall {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Function declaration offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallableSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HarmCategory {
    Harassment,
    HateSpeech,
    SexuallyExplicit,
    DangerousContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockThreshold {
    BlockLowAndAbove,
    BlockMediumAndAbove,
    BlockOnlyHigh,
    BlockNone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SafetyPolicy {
    pub settings: Vec<(HarmCategory, BlockThreshold)>,
}

impl SafetyPolicy {
    /// Block medium-and-above for every category. Applied to every call.
    pub fn conservative() -> Self {
        Self {
            settings: [
                HarmCategory::Harassment,
                HarmCategory::HateSpeech,
                HarmCategory::SexuallyExplicit,
                HarmCategory::DangerousContent,
            ]
            .into_iter()
            .map(|category| (category, BlockThreshold::BlockMediumAndAbove))
            .collect(),
        }
    }
}

/// Everything the provider needs to answer one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderContext {
    pub system_instruction: String,
    /// Prior turns followed by the new user message as the final entry.
    pub messages: Vec<ChatTurn>,
}

/// Raw reply from a provider, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderResponse {
    pub text: String,
    pub calls: Vec<StructuredCall>,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn send(
        &self,
        model: &str,
        context: &ProviderContext,
        schemas: Option<&[CallableSchema]>,
        safety: &SafetyPolicy,
    ) -> Result<ProviderResponse, ProviderError>;
}
