//! Response processor for extracting token usage from completion responses

use crate::infrastructure::log_messages::audit as messages;
use crate::providers::constants::paths;
use http::Method;
use serde::{Deserialize, Deserializer};

/// Token accounting extracted from an upstream response
///
/// Every field falls back to its zero value when the upstream omitted it or
/// sent something unparseable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageRecord {
    pub completion_id: String,
    pub model: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub created_at_epoch_seconds: i64,
}

/// Subset of the chat completion response shape the proxy cares about
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChatCompletionResponse {
    #[serde(deserialize_with = "null_as_default")]
    id: String,
    #[serde(deserialize_with = "null_as_default")]
    model: String,
    #[serde(deserialize_with = "null_as_default")]
    usage: TokenUsage,
    #[serde(deserialize_with = "null_as_default")]
    created: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TokenUsage {
    #[serde(deserialize_with = "null_as_default")]
    prompt_tokens: u64,
    #[serde(deserialize_with = "null_as_default")]
    completion_tokens: u64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parses retained response bytes into a [`UsageRecord`]
pub struct UsageExtractor;

impl UsageExtractor {
    /// Extract usage from a complete response body. Never fails.
    pub fn extract(body: &[u8]) -> UsageRecord {
        match serde_json::from_slice::<ChatCompletionResponse>(body) {
            Ok(response) => UsageRecord {
                completion_id: response.id,
                model: response.model,
                prompt_tokens: response.usage.prompt_tokens,
                completion_tokens: response.usage.completion_tokens,
                created_at_epoch_seconds: response.created,
            },
            Err(e) => {
                tracing::debug!(error = %e, "{}", messages::NO_USAGE_DATA);
                UsageRecord::default()
            }
        }
    }
}

/// Which calls are billed and therefore produce a usage record
pub struct UsageEndpoint;

impl UsageEndpoint {
    pub fn matches(method: &Method, path: &str) -> bool {
        *method == Method::POST && path == paths::CHAT_COMPLETIONS
    }
}
