use serde::Serialize;
use serde_json::{Map, Value};

use crate::provider::{ProviderResponse, StructuredCall};

/// Name of the synthetic call that wraps two or more structured calls.
pub const MULTIPLE_CALLS_NAME: &str = "multiple_function_calls";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompletionResult {
    pub text: String,
    pub calls: Vec<StructuredCall>,
}

impl CompletionResult {
    /// The record operations carried by this result, with the
    /// `multiple_function_calls` wrapper unwrapped.
    pub fn record_calls(&self) -> Vec<StructuredCall> {
        let mut out = Vec::new();
        for call in &self.calls {
            if call.name != MULTIPLE_CALLS_NAME {
                out.push(call.clone());
                continue;
            }
            let Some(Value::Array(inner)) = call.arguments.get("calls") else {
                tracing::warn!("Wrapper call without a calls list; ignoring");
                continue;
            };
            for entry in inner {
                match serde_json::from_value::<StructuredCall>(entry.clone()) {
                    Ok(c) => out.push(c),
                    Err(e) => tracing::warn!(error = %e, "Skipping malformed wrapped call"),
                }
            }
        }
        out
    }
}

/// Turn a raw provider reply into a [`CompletionResult`].
///
/// Zero calls keep the text as-is. One call is passed through. Two or more
/// are folded into a single [`MULTIPLE_CALLS_NAME`] call. When calls are
/// present but the model said nothing, a short placeholder is supplied.
pub fn normalize(response: ProviderResponse) -> CompletionResult {
    let ProviderResponse { text, calls } = response;
    let count = calls.len();

    let calls = match count {
        0 | 1 => calls,
        _ => vec![wrap_calls(calls)],
    };

    let text = if count > 0 && text.trim().is_empty() {
        placeholder_text(count)
    } else {
        text
    };

    CompletionResult { text, calls }
}

fn wrap_calls(calls: Vec<StructuredCall>) -> StructuredCall {
    let entries: Vec<Value> = calls
        .into_iter()
        .map(|c| {
            let mut entry = Map::new();
            entry.insert("name".to_string(), Value::String(c.name));
            entry.insert("arguments".to_string(), Value::Object(c.arguments));
            Value::Object(entry)
        })
        .collect();
    let mut arguments = Map::new();
    arguments.insert("calls".to_string(), Value::Array(entries));
    StructuredCall::new(MULTIPLE_CALLS_NAME, arguments)
}

fn placeholder_text(count: usize) -> String {
    if count == 1 {
        "I've prepared a record for review.".to_string()
    } else {
        format!("I've prepared {count} records for review.")
    }
}
