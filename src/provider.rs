//! Vision-provider seam: the trait the pipeline talks to, plus the
//! Anthropic Messages API implementation.
//!
//! The pipeline never constructs HTTP requests itself — it hands an
//! [`ImageData`] and a prompt to a `dyn VisionProvider` and gets text back.
//! That seam exists for the same reason the conversion config accepts a
//! pre-built provider: tests inject a mock and exercise the whole batch
//! pipeline offline, and callers who need custom middleware (caching,
//! rate-limiting) can wrap the real provider.

use crate::error::ExtractError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// A base64-encoded image ready for a multimodal API request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    /// Base64-encoded image bytes (standard alphabet, padded).
    pub data: String,
    /// IANA media type of the encoded bytes, e.g. "image/jpeg".
    pub media_type: String,
}

impl ImageData {
    pub fn new(data: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            media_type: media_type.into(),
        }
    }
}

/// One completed vision call.
#[derive(Debug, Clone, Default)]
pub struct VisionResponse {
    /// Concatenated text blocks of the reply.
    pub content: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A vision model that can read one image and answer one prompt.
///
/// Object-safe so configs can carry `Arc<dyn VisionProvider>`. Errors are
/// plain strings: the caller (the retry loop in `batch`) only logs them and
/// decides whether to try again, so a structured error type would buy nothing.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Send `image` and `prompt` as a single user turn; return the reply text.
    async fn analyze(&self, image: &ImageData, prompt: &str) -> Result<VisionResponse, String>;

    /// Human-readable provider name for logs and error messages.
    fn name(&self) -> &str {
        "vision"
    }
}

// ── Anthropic Messages API ───────────────────────────────────────────────

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// [`VisionProvider`] backed by the Anthropic Messages API.
///
/// One user message per call: an image content block (base64 source)
/// followed by a text block carrying the prompt. The image goes first —
/// Anthropic's docs recommend image-before-text for single-image prompts.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: usize,
}

impl AnthropicProvider {
    /// Build a provider with an explicit key.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: usize,
        timeout_secs: u64,
    ) -> Result<Self, ExtractError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExtractError::HttpClientFailed(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
        })
    }

    /// Build a provider from `ANTHROPIC_API_KEY`.
    pub fn from_env(
        model: impl Into<String>,
        max_tokens: usize,
        timeout_secs: u64,
    ) -> Result<Self, ExtractError> {
        let key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(ExtractError::ApiKeyMissing)?;
        Self::new(key, model, max_tokens, timeout_secs)
    }
}

#[async_trait]
impl VisionProvider for AnthropicProvider {
    async fn analyze(&self, image: &ImageData, prompt: &str) -> Result<VisionResponse, String> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            kind: "base64",
                            media_type: &image.media_type,
                            data: &image.data,
                        },
                    },
                    ContentBlock::Text { text: prompt },
                ],
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    format!("request failed: {e}")
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            // The error envelope is JSON when the API produced it, plain
            // text when a proxy did. Surface whichever detail we can get.
            let text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|env| format!("{}: {}", env.error.kind, env.error.message))
                .unwrap_or(text);
            return Err(format!("HTTP {status}: {detail}"));
        }

        let reply: MessagesResponse = response
            .json()
            .await
            .map_err(|e| format!("malformed API response: {e}"))?;

        let content: String = reply
            .content
            .iter()
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        debug!(
            input_tokens = reply.usage.input_tokens,
            output_tokens = reply.usage.output_tokens,
            "Messages API call complete"
        );

        Ok(VisionResponse {
            content,
            input_tokens: reply.usage.input_tokens,
            output_tokens: reply.usage.output_tokens,
        })
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentBlock<'a> {
    Image { source: ImageSource<'a> },
    Text { text: &'a str },
}

#[derive(Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    media_type: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Deserialize)]
struct ResponseBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let body = MessagesRequest {
            model: "claude-3-haiku-20240307",
            max_tokens: 1024,
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            kind: "base64",
                            media_type: "image/jpeg",
                            data: "AAAA",
                        },
                    },
                    ContentBlock::Text { text: "extract" },
                ],
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "claude-3-haiku-20240307");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"][0]["type"], "image");
        assert_eq!(
            json["messages"][0]["content"][0]["source"]["media_type"],
            "image/jpeg"
        );
        assert_eq!(json["messages"][0]["content"][1]["type"], "text");
        assert_eq!(json["messages"][0]["content"][1]["text"], "extract");
    }

    #[test]
    fn response_parses_text_blocks_and_usage() {
        let raw = r#"{
            "id": "msg_01",
            "content": [{"type": "text", "text": "{\"surname\": \"DOE\"}"}],
            "usage": {"input_tokens": 1510, "output_tokens": 142}
        }"#;
        let reply: MessagesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(reply.content[0].text.as_deref(), Some("{\"surname\": \"DOE\"}"));
        assert_eq!(reply.usage.input_tokens, 1510);
    }

    #[test]
    fn response_tolerates_missing_usage() {
        let raw = r#"{"content": [{"type": "text", "text": "hi"}]}"#;
        let reply: MessagesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(reply.usage.output_tokens, 0);
    }

    #[test]
    fn error_envelope_parses() {
        let raw = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let env: ErrorEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(env.error.kind, "overloaded_error");
        assert_eq!(env.error.message, "Overloaded");
    }

    #[test]
    fn from_env_requires_key() {
        let prev = std::env::var("ANTHROPIC_API_KEY").ok();
        std::env::remove_var("ANTHROPIC_API_KEY");
        let result = AnthropicProvider::from_env("m", 1024, 60);
        if let Some(k) = prev {
            std::env::set_var("ANTHROPIC_API_KEY", k);
        }
        assert!(matches!(result, Err(ExtractError::ApiKeyMissing)));
    }
}
