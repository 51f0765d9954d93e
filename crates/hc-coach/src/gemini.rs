use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;

use crate::context::Role;
use crate::error::ProviderError;
use crate::provider::{
    BlockThreshold, CallableSchema, CompletionProvider, HarmCategory, ProviderContext,
    ProviderResponse, SafetyPolicy, StructuredCall,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// `generateContent` client for the Gemini REST API.
pub struct GeminiProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Option<Map<String, Value>>,
}

impl GeminiProvider {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

fn harm_category_name(category: HarmCategory) -> &'static str {
    match category {
        HarmCategory::Harassment => "HARM_CATEGORY_HARASSMENT",
        HarmCategory::HateSpeech => "HARM_CATEGORY_HATE_SPEECH",
        HarmCategory::SexuallyExplicit => "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        HarmCategory::DangerousContent => "HARM_CATEGORY_DANGEROUS_CONTENT",
    }
}

fn threshold_name(threshold: BlockThreshold) -> &'static str {
    match threshold {
        BlockThreshold::BlockLowAndAbove => "BLOCK_LOW_AND_ABOVE",
        BlockThreshold::BlockMediumAndAbove => "BLOCK_MEDIUM_AND_ABOVE",
        BlockThreshold::BlockOnlyHigh => "BLOCK_ONLY_HIGH",
        BlockThreshold::BlockNone => "BLOCK_NONE",
    }
}

fn request_body(
    context: &ProviderContext,
    schemas: Option<&[CallableSchema]>,
    safety: &SafetyPolicy,
) -> Value {
    let contents: Vec<Value> = context
        .messages
        .iter()
        .map(|turn| {
            let role = match turn.role {
                Role::User => "user",
                Role::Assistant => "model",
            };
            json!({ "role": role, "parts": [{ "text": turn.content }] })
        })
        .collect();

    let safety_settings: Vec<Value> = safety
        .settings
        .iter()
        .map(|(category, threshold)| {
            json!({
                "category": harm_category_name(*category),
                "threshold": threshold_name(*threshold),
            })
        })
        .collect();

    let mut body = json!({
        "systemInstruction": { "parts": [{ "text": context.system_instruction }] },
        "contents": contents,
        "safetySettings": safety_settings,
    });

    if let Some(schemas) = schemas.filter(|s| !s.is_empty()) {
        let declarations: Vec<Value> = schemas
            .iter()
            .map(|s| {
                json!({
                    "name": s.name,
                    "description": s.description,
                    "parameters": s.parameters,
                })
            })
            .collect();
        body["tools"] = json!([{ "functionDeclarations": declarations }]);
    }

    body
}

fn parse_response(body: &str) -> Result<ProviderResponse, ProviderError> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;

    let mut text = String::new();
    let mut calls = Vec::new();
    // Only the first candidate is used; the rest are alternatives.
    if let Some(content) = parsed.candidates.into_iter().next().and_then(|c| c.content) {
        for part in content.parts {
            if let Some(t) = part.text {
                text.push_str(&t);
            }
            if let Some(call) = part.function_call {
                calls.push(StructuredCall::new(call.name, call.args.unwrap_or_default()));
            }
        }
    }
    Ok(ProviderResponse { text, calls })
}

/// `error.status` from a Google API error body, e.g. `RESOURCE_EXHAUSTED`.
fn error_category(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("status")?
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    async fn send(
        &self,
        model: &str,
        context: &ProviderContext,
        schemas: Option<&[CallableSchema]>,
        safety: &SafetyPolicy,
    ) -> Result<ProviderResponse, ProviderError> {
        let resp = self
            .http
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(context, schemas, safety))
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ProviderError::Auth(body));
        }
        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                category: error_category(&body),
                message: body,
            });
        }

        parse_response(&body)
    }
}
