use regex::Regex;
use std::sync::OnceLock;

/// Failure reported by a completion provider.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    /// Non-success reply. `message` keeps the raw payload so retry hints
    /// embedded in it can still be read.
    #[error("provider returned HTTP {status}: {message}")]
    Api {
        status: u16,
        category: Option<String>,
        message: String,
    },
    #[error("provider authentication failed: {0}")]
    Auth(String),
    #[error("provider request failed: {0}")]
    Transport(String),
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

const QUOTA_KEYWORDS: [&str; 4] = ["quota", "rate_limit", "ratelimit", "too many requests"];

// Whole word only, so "generate" and "accurate" do not count.
fn rate_word() -> &'static Regex {
    static RATE: OnceLock<Regex> = OnceLock::new();
    RATE.get_or_init(|| Regex::new(r"(?i)\brate\b").expect("valid regex"))
}

fn retry_hint_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // protobuf text form: `retry_delay { seconds: 37 }`
            Regex::new(r"seconds:\s*(\d+)").expect("valid regex"),
            // JSON form: `"retryDelay": "37s"` or `"retryDelay": "37.5s"`
            Regex::new(r#"(?i)"?retry_?delay"?\s*:\s*"(\d+)(?:\.\d+)?s""#).expect("valid regex"),
        ]
    })
}

impl ProviderError {
    /// True for rate-limit / quota failures: HTTP 429, a resource-exhaustion
    /// category, or a quota keyword in the message.
    pub fn is_quota(&self) -> bool {
        match self {
            ProviderError::Api {
                status,
                category,
                message,
            } => {
                if *status == 429 {
                    return true;
                }
                if category
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case("RESOURCE_EXHAUSTED"))
                {
                    return true;
                }
                let lower = message.to_ascii_lowercase();
                QUOTA_KEYWORDS.iter().any(|k| lower.contains(k)) || rate_word().is_match(message)
            }
            _ => false,
        }
    }

    /// Retry delay advertised in the error payload, if any.
    pub fn retry_delay_secs(&self) -> Option<u64> {
        let ProviderError::Api { message, .. } = self else {
            return None;
        };
        retry_hint_patterns().iter().find_map(|re| {
            re.captures(message)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<u64>().ok())
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoachError {
    #[error("{}", quota_message(.retry_after_secs))]
    QuotaExhausted { retry_after_secs: Option<i64> },
    #[error("model {model} failed: {source}")]
    Provider {
        model: String,
        #[source]
        source: ProviderError,
    },
    #[error("no models configured")]
    NoModelsConfigured,
}

fn quota_message(retry_after_secs: &Option<i64>) -> String {
    let wait = match retry_after_secs {
        None => "later".to_string(),
        Some(secs) if *secs < 60 => "in less than a minute".to_string(),
        Some(secs) => {
            let minutes = (secs + 59) / 60;
            if minutes == 1 {
                "in about a minute".to_string()
            } else {
                format!("in about {} minutes", minutes)
            }
        }
    };
    format!("All AI models are over their usage quota right now. Please try again {wait}.")
}
