//! Concrete oracle backends: an OpenAI-compatible chat-completions client
//! (used for both the `openai` and `llama` providers, which speak the same
//! wire protocol) and a Gemini `generateContent` client.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tracing::warn;
use wts_config::{OracleConfig, OracleProvider};

use crate::error::{OracleError, OracleResult};
use crate::models::{
    ChatCompletionRequest, ChatCompletionResponse, ChatCompletionStreamChunk, ChatMessage, GeminiContent,
    GeminiGenerateRequest, GeminiGenerateResponse, GeminiPart,
};

const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;
const MAX_ERROR_BODY_SIZE: usize = 1000;

/// A single capability shared by every concrete oracle backend: turn a prompt
/// into a generated string. Construction (not `generate`) is where credential
/// and configuration errors must surface.
#[async_trait]
pub trait Oracle: Send + Sync + std::fmt::Debug {
    async fn generate(&self, prompt: &str) -> OracleResult<String>;
}

/// Build the configured oracle backend, validating credentials up front.
pub fn build_oracle(config: &OracleConfig) -> OracleResult<Box<dyn Oracle>> {
    match config.provider {
        OracleProvider::OpenAi | OracleProvider::Llama => {
            Ok(Box::new(ChatCompletionsClient::new(config)?))
        }
        OracleProvider::Gemini => Ok(Box::new(GeminiClient::new(config)?)),
    }
}

async fn with_retry<T, F, Fut>(
    attempts: u32,
    base_delay_ms: u64,
    operation: F,
) -> OracleResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = OracleResult<T>>,
{
    if attempts == 0 {
        return operation().await;
    }

    let mut last_error = None;

    for attempt in 0..attempts {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !e.is_retryable() {
                    return Err(e);
                } else if attempt < attempts - 1 {
                    let delay = base_delay_ms * 2_u64.pow(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        delay_ms = delay,
                        error = %e,
                        "retrying oracle call after transient error"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    last_error = Some(e);
                } else {
                    last_error = Some(e);
                    break;
                }
            }
        }
    }

    Err(OracleError::RetriesExhausted {
        attempts,
        last_error: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string()),
    })
}

fn truncate_error_body(body: String) -> String {
    if body.len() <= MAX_ERROR_BODY_SIZE {
        return body;
    }
    let truncate_at = body
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|&i| i <= MAX_ERROR_BODY_SIZE)
        .last()
        .unwrap_or(0);
    format!("{}... (truncated)", &body[..truncate_at])
}

/// Backend for the `openai` and `llama` providers: both speak the
/// OpenAI-compatible `/chat/completions` wire protocol.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    http_client: Client,
    config: OracleConfig,
    retry_attempts: u32,
    retry_base_delay_ms: u64,
}

impl ChatCompletionsClient {
    pub fn new(config: &OracleConfig) -> OracleResult<Self> {
        if matches!(config.provider, OracleProvider::OpenAi) && config.credential.is_none() {
            return Err(OracleError::MissingCredential("openai".to_string()));
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(OracleError::HttpError)?;

        Ok(Self {
            http_client,
            config: config.clone(),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
        })
    }

    /// Construct with a pre-built HTTP client (used in tests against a mock server).
    pub fn with_client(config: &OracleConfig, http_client: Client) -> Self {
        Self {
            http_client,
            config: config.clone(),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
        }
    }

    async fn generate_once(&self, prompt: &str) -> OracleResult<String> {
        let streaming = self.config.stream_prompts;

        let mut request = self
            .http_client
            .post(self.config.chat_completions_url())
            .json(&ChatCompletionRequest {
                model: self.config.model.clone(),
                messages: vec![ChatMessage::user(prompt)],
                stream: streaming,
            });

        if streaming {
            request = request.timeout(Duration::from_secs(self.config.streaming_timeout_secs));
        }

        if let Some(credential) = &self.config.credential {
            request = request.bearer_auth(credential);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::ApiError {
                status: status.as_u16(),
                message: format!("{status}: {}", truncate_error_body(body)),
            });
        }

        if streaming {
            Self::read_stream(response).await
        } else {
            let parsed: ChatCompletionResponse = response.json().await?;
            parsed
                .choices
                .into_iter()
                .next()
                .map(|choice| choice.message.content)
                .ok_or_else(|| OracleError::InvalidResponse("no choices in response".to_string()))
        }
    }

    /// Assemble a server-sent-events chat-completion stream (`data: {...}`
    /// lines, terminated by `data: [DONE]`) into the same plain string a
    /// non-streaming call would have returned. Streaming is transparent to
    /// the caller: only this function and `generate_once`'s request
    /// construction know it happened.
    async fn read_stream(response: reqwest::Response) -> OracleResult<String> {
        let mut byte_stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut content = String::new();

        while let Some(chunk) = byte_stream.next().await {
            let chunk = chunk?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(newline_at) = buffer.find('\n') {
                let line = buffer[..newline_at].trim().to_string();
                buffer.drain(..=newline_at);

                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data.is_empty() || data == "[DONE]" {
                    continue;
                }

                let parsed: ChatCompletionStreamChunk = serde_json::from_str(data)?;
                if let Some(choice) = parsed.choices.into_iter().next() {
                    if let Some(delta) = choice.delta.content {
                        content.push_str(&delta);
                    }
                }
            }
        }

        if content.is_empty() {
            return Err(OracleError::InvalidResponse(
                "streamed response assembled no content".to_string(),
            ));
        }
        Ok(content)
    }
}

#[async_trait]
impl Oracle for ChatCompletionsClient {
    async fn generate(&self, prompt: &str) -> OracleResult<String> {
        with_retry(self.retry_attempts, self.retry_base_delay_ms, || {
            self.generate_once(prompt)
        })
        .await
    }
}

/// Backend for the `gemini` provider, speaking the `generateContent` wire protocol.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http_client: Client,
    config: OracleConfig,
    retry_attempts: u32,
    retry_base_delay_ms: u64,
}

impl GeminiClient {
    pub fn new(config: &OracleConfig) -> OracleResult<Self> {
        if config.credential.is_none() {
            return Err(OracleError::MissingCredential("gemini".to_string()));
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(OracleError::HttpError)?;

        Ok(Self {
            http_client,
            config: config.clone(),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
        })
    }

    pub fn with_client(config: &OracleConfig, http_client: Client) -> Self {
        Self {
            http_client,
            config: config.clone(),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
        }
    }

    async fn generate_once(&self, prompt: &str) -> OracleResult<String> {
        let credential = self
            .config
            .credential
            .as_ref()
            .ok_or_else(|| OracleError::MissingCredential("gemini".to_string()))?;

        let streaming = self.config.stream_prompts;
        let url = if streaming {
            format!("{}&key={credential}", self.config.gemini_stream_generate_url())
        } else {
            format!("{}?key={credential}", self.config.gemini_generate_url())
        };

        let mut request = self.http_client.post(url).json(&GeminiGenerateRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
        });

        if streaming {
            request = request.timeout(Duration::from_secs(self.config.streaming_timeout_secs));
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::ApiError {
                status: status.as_u16(),
                message: format!("{status}: {}", truncate_error_body(body)),
            });
        }

        if streaming {
            Self::read_stream(response).await
        } else {
            let parsed: GeminiGenerateResponse = response.json().await?;
            parsed
                .candidates
                .into_iter()
                .next()
                .and_then(|c| c.content.parts.into_iter().next())
                .map(|part| part.text)
                .ok_or_else(|| OracleError::InvalidResponse("no candidates in response".to_string()))
        }
    }

    /// Gemini's `streamGenerateContent?alt=sse` emits one full
    /// `GeminiGenerateResponse` object per `data:` line, each carrying an
    /// incremental slice of text rather than a delta field; concatenating
    /// each chunk's text reassembles the complete response.
    async fn read_stream(response: reqwest::Response) -> OracleResult<String> {
        let mut byte_stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut content = String::new();

        while let Some(chunk) = byte_stream.next().await {
            let chunk = chunk?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(newline_at) = buffer.find('\n') {
                let line = buffer[..newline_at].trim().to_string();
                buffer.drain(..=newline_at);

                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data.is_empty() {
                    continue;
                }

                let parsed: GeminiGenerateResponse = serde_json::from_str(data)?;
                if let Some(text) = parsed
                    .candidates
                    .into_iter()
                    .next()
                    .and_then(|c| c.content.parts.into_iter().next())
                    .map(|part| part.text)
                {
                    content.push_str(&text);
                }
            }
        }

        if content.is_empty() {
            return Err(OracleError::InvalidResponse(
                "streamed response assembled no content".to_string(),
            ));
        }
        Ok(content)
    }
}

#[async_trait]
impl Oracle for GeminiClient {
    async fn generate(&self, prompt: &str) -> OracleResult<String> {
        with_retry(self.retry_attempts, self.retry_base_delay_ms, || {
            self.generate_once(prompt)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn llama_config(base_url: String) -> OracleConfig {
        OracleConfig {
            provider: OracleProvider::Llama,
            model: "llama3.1".to_string(),
            base_url,
            credential: None,
            stream_prompts: false,
            timeout_secs: 5,
            streaming_timeout_secs: 5,
        }
    }

    fn gemini_config(base_url: String) -> OracleConfig {
        OracleConfig {
            provider: OracleProvider::Gemini,
            model: "gemini-1.5-pro".to_string(),
            base_url,
            credential: Some("secret".to_string()),
            stream_prompts: false,
            timeout_secs: 5,
            streaming_timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn test_generate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "hello back"}}]
            })))
            .mount(&server)
            .await;

        let client = ChatCompletionsClient::new(&llama_config(server.uri())).unwrap();
        let result = client.generate("hello").await.unwrap();
        assert_eq!(result, "hello back");
    }

    #[tokio::test]
    async fn test_generate_retries_on_server_error_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "recovered"}}]
            })))
            .mount(&server)
            .await;

        let mut config = llama_config(server.uri());
        config.timeout_secs = 5;
        let client = ChatCompletionsClient::new(&config)
            .unwrap();
        let result = client.generate("hello").await.unwrap();
        assert_eq!(result, "recovered");
    }

    #[tokio::test]
    async fn test_generate_non_retryable_error_fails_fast() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .mount(&server)
            .await;

        let client = ChatCompletionsClient::new(&llama_config(server.uri())).unwrap();
        let err = client.generate("hello").await.unwrap_err();
        assert!(matches!(err, OracleError::ApiError { status: 400, .. }));
    }

    #[test]
    fn test_openai_requires_credential() {
        let config = OracleConfig {
            provider: OracleProvider::OpenAi,
            model: "gpt-5".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            credential: None,
            stream_prompts: false,
            timeout_secs: 5,
            streaming_timeout_secs: 5,
        };
        assert!(ChatCompletionsClient::new(&config).is_err());
    }

    #[test]
    fn test_gemini_requires_credential() {
        let config = OracleConfig {
            provider: OracleProvider::Gemini,
            model: "gemini-1.5-pro".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            credential: None,
            stream_prompts: false,
            timeout_secs: 5,
            streaming_timeout_secs: 5,
        };
        assert!(GeminiClient::new(&config).is_err());
    }

    #[test]
    fn test_truncate_error_body_short_string_untouched() {
        assert_eq!(truncate_error_body("short".to_string()), "short");
    }

    #[tokio::test]
    async fn test_generate_assembles_streamed_chunks() {
        let server = MockServer::start().await;
        let body = [
            r#"data: {"choices":[{"delta":{"content":"hello"}}]}"#,
            r#"data: {"choices":[{"delta":{"content":" there"}}]}"#,
            "data: [DONE]",
            "",
        ]
        .join("\n");

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let mut config = llama_config(server.uri());
        config.stream_prompts = true;
        let client = ChatCompletionsClient::new(&config).unwrap();
        let result = client.generate("hello").await.unwrap();
        assert_eq!(result, "hello there");
    }

    #[tokio::test]
    async fn test_generate_streamed_empty_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("data: [DONE]\n"))
            .mount(&server)
            .await;

        let mut config = llama_config(server.uri());
        config.stream_prompts = true;
        let client = ChatCompletionsClient::new(&config).unwrap();
        let err = client.generate("hello").await.unwrap_err();
        assert!(matches!(err, OracleError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_gemini_generate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-pro:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "hello back"}]}}]
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&gemini_config(server.uri())).unwrap();
        let result = client.generate("hello").await.unwrap();
        assert_eq!(result, "hello back");
    }

    #[tokio::test]
    async fn test_gemini_generate_assembles_streamed_chunks() {
        let server = MockServer::start().await;
        let body = [
            r#"data: {"candidates":[{"content":{"parts":[{"text":"hello"}]}}]}"#,
            r#"data: {"candidates":[{"content":{"parts":[{"text":" there"}]}}]}"#,
            "",
        ]
        .join("\n");

        Mock::given(method("POST"))
            .and(path("/models/gemini-1.5-pro:streamGenerateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let mut config = gemini_config(server.uri());
        config.stream_prompts = true;
        let client = GeminiClient::new(&config).unwrap();
        let result = client.generate("hello").await.unwrap();
        assert_eq!(result, "hello there");
    }
}
