//! Text-completion client for metadata inference and plan generation.
//!
//! The completion service is treated as an unreliable free-form text channel:
//! [`CompletionService::complete`] only moves a prompt and a reply across the
//! wire, while [`CompletionService::complete_json`] wraps it with the run-log
//! records and the best-effort JSON extraction from [`crate::extract`].

use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

use crate::extract;

/// Errors from the completion subsystem.
#[derive(Debug, Error, Diagnostic)]
pub enum LlmError {
    #[error("completion request failed: {message}")]
    #[diagnostic(
        code(shelver::llm::request_failed),
        help("Check your network connection and that the API URL in the config is correct.")
    )]
    RequestFailed { message: String },

    #[error("completion request timed out (connect {connect_secs}s, read {read_secs}s)")]
    #[diagnostic(
        code(shelver::llm::timeout),
        help("Raise `connect_timeout_secs` / `read_timeout_secs` in the config or retry later.")
    )]
    Timeout { connect_secs: u64, read_secs: u64 },

    #[error("completion service returned status {status}: {body}")]
    #[diagnostic(
        code(shelver::llm::status),
        help("A 401 usually means the API key is wrong; a 429 means the free tier is rate-limited.")
    )]
    Status { status: u16, body: String },

    #[error("completion service reported an error: {message}")]
    #[diagnostic(code(shelver::llm::api_error))]
    Api { message: String },

    #[error("response does not contain 'choices'")]
    #[diagnostic(
        code(shelver::llm::missing_choices),
        help("The model returned an unexpected response format.")
    )]
    MissingChoices,

    #[error("failed to parse completion response: {message}")]
    #[diagnostic(
        code(shelver::llm::parse_error),
        help("The model returned an unexpected response format.")
    )]
    ParseError { message: String },
}

/// Configuration for the HTTP completion client.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Chat-completions endpoint.
    pub api_url: String,
    /// Model identifier sent in the request body.
    pub model: String,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds.
    pub read_timeout_secs: u64,
    /// Sent as `HTTP-Referer`.
    pub referer: String,
    /// Sent as `X-Title`.
    pub app_title: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_url: "https://openrouter.ai/api/v1/chat/completions".into(),
            model: "deepseek/deepseek-r1-distill-llama-70b:free".into(),
            connect_timeout_secs: 15,
            read_timeout_secs: 30,
            referer: "https://bibliography-organizer.local".into(),
            app_title: "Bibliography Organizer".into(),
        }
    }
}

/// A service that turns a single user prompt into a free-form text reply.
pub trait CompletionService {
    /// Send `prompt` and return the raw reply content.
    fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    /// Send `prompt`, extract the most plausible JSON object from the reply,
    /// and record both in the run log.
    ///
    /// The `Model output:` record is what replay later parses, so it is
    /// written for every successful exchange even when the extracted text is
    /// not valid JSON.
    fn complete_json(&self, prompt: &str) -> Result<String, LlmError> {
        tracing::info!("=== Starting API Query ===");
        tracing::info!("Prompt sent to model:\n{prompt}");

        let raw = self.complete(prompt).inspect_err(|e| {
            tracing::error!("API Request failed: {e}");
        })?;

        let output = extract::extract_json(&raw);
        tracing::info!("Model output:\n{output}");
        Ok(output)
    }
}

/// Pull `choices[0].message.content` out of a chat-completions response body.
pub fn parse_completion_body(body: &str) -> Result<String, LlmError> {
    let json: serde_json::Value = serde_json::from_str(body).map_err(|e| LlmError::ParseError {
        message: e.to_string(),
    })?;

    if let Some(error) = json.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        return Err(LlmError::Api { message });
    }

    let first = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|choices| choices.first())
        .ok_or(LlmError::MissingChoices)?;

    first["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| LlmError::ParseError {
            message: "missing 'choices[0].message.content' field".into(),
        })
}

/// Client for an OpenAI-compatible chat-completions endpoint (OpenRouter by default).
pub struct OpenRouterClient {
    config: CompletionConfig,
    api_key: String,
    agent: ureq::Agent,
}

impl OpenRouterClient {
    /// Create a client with a bearer credential.
    pub fn new(config: CompletionConfig, api_key: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(config.connect_timeout_secs))
            .timeout_read(Duration::from_secs(config.read_timeout_secs))
            .build();
        Self {
            config,
            api_key: api_key.into(),
            agent,
        }
    }

    /// Get the model name being used.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn transport_error(&self, transport: ureq::Transport) -> LlmError {
        let timed_out = std::error::Error::source(&transport)
            .and_then(|source| source.downcast_ref::<std::io::Error>())
            .is_some_and(|io| {
                matches!(
                    io.kind(),
                    std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                )
            });

        if timed_out {
            LlmError::Timeout {
                connect_secs: self.config.connect_timeout_secs,
                read_secs: self.config.read_timeout_secs,
            }
        } else {
            LlmError::RequestFailed {
                message: transport.to_string(),
            }
        }
    }
}

impl CompletionService for OpenRouterClient {
    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": prompt}],
        });

        let body_str = serde_json::to_string(&body).map_err(|e| LlmError::RequestFailed {
            message: format!("JSON serialize error: {e}"),
        })?;

        let resp = self
            .agent
            .post(&self.config.api_url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Content-Type", "application/json")
            .set("HTTP-Referer", &self.config.referer)
            .set("X-Title", &self.config.app_title)
            .send_string(&body_str)
            .map_err(|e| match e {
                ureq::Error::Status(status, resp) => LlmError::Status {
                    status,
                    body: resp.into_string().unwrap_or_default(),
                },
                ureq::Error::Transport(transport) => self.transport_error(transport),
            })?;

        let resp_str = resp.into_string().map_err(|e| LlmError::ParseError {
            message: e.to_string(),
        })?;

        parse_completion_body(&resp_str).inspect_err(|e| {
            tracing::error!("Failed to parse API response ({e}):\n{resp_str}");
        })
    }
}

impl std::fmt::Debug for OpenRouterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterClient")
            .field("api_url", &self.config.api_url)
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(&'static str);

    impl CompletionService for Canned {
        fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn parses_first_choice_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}]}"#;
        assert_eq!(parse_completion_body(body).unwrap(), "hello");
    }

    #[test]
    fn error_field_is_a_failure() {
        let body = r#"{"error":{"message":"Rate limit exceeded","code":429}}"#;
        let err = parse_completion_body(body).unwrap_err();
        assert!(matches!(err, LlmError::Api { ref message } if message == "Rate limit exceeded"));
    }

    #[test]
    fn missing_or_empty_choices_is_a_failure() {
        assert!(matches!(
            parse_completion_body(r#"{"id":"x"}"#),
            Err(LlmError::MissingChoices)
        ));
        assert!(matches!(
            parse_completion_body(r#"{"choices":[]}"#),
            Err(LlmError::MissingChoices)
        ));
    }

    #[test]
    fn non_json_body_is_a_parse_error() {
        assert!(matches!(
            parse_completion_body("<html>bad gateway</html>"),
            Err(LlmError::ParseError { .. })
        ));
    }

    #[test]
    fn complete_json_extracts_from_prose() {
        let service = Canned("Here you go:\n```json\n{\"title\":\"T\",\"author\":\"A\"}\n```");
        assert_eq!(
            service.complete_json("prompt").unwrap(),
            r#"{"title":"T","author":"A"}"#
        );
    }

    #[test]
    fn unreachable_endpoint_is_a_transport_error() {
        let config = CompletionConfig {
            api_url: "http://127.0.0.1:1/v1/chat/completions".into(), // unreachable port
            connect_timeout_secs: 1,
            read_timeout_secs: 1,
            ..Default::default()
        };
        let client = OpenRouterClient::new(config, "test-key");
        let err = client.complete("test").unwrap_err();
        assert!(matches!(
            err,
            LlmError::RequestFailed { .. } | LlmError::Timeout { .. }
        ));
    }

    #[test]
    fn default_config_values() {
        let config = CompletionConfig::default();
        assert_eq!(config.api_url, "https://openrouter.ai/api/v1/chat/completions");
        assert_eq!(config.connect_timeout_secs, 15);
        assert_eq!(config.read_timeout_secs, 30);
    }
}
