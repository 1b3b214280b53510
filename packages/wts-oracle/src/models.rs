//! Wire DTOs for the OpenAI-compatible chat-completions API (shared by the
//! Llama and OpenAI backends) and the Gemini `generateContent` API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChoice {
    pub message: ChatMessage,
}

/// One chunk of a server-sent-events chat-completion stream
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionStreamChunk {
    pub choices: Vec<ChatCompletionStreamChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionStreamChoice {
    pub delta: ChatCompletionDelta,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletionDelta {
    #[serde(default)]
    pub content: Option<String>,
}

// ---- Gemini generateContent wire shapes ----

#[derive(Debug, Clone, Serialize)]
pub struct GeminiGenerateRequest {
    pub contents: Vec<GeminiContent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeminiContent {
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiPart {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiGenerateResponse {
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiCandidate {
    pub content: GeminiContent2,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiContent2 {
    pub parts: Vec<GeminiPart>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_constructors() {
        let m = ChatMessage::user("hello");
        assert_eq!(m.role, "user");
        assert_eq!(m.content, "hello");

        let m = ChatMessage::system("be terse");
        assert_eq!(m.role, "system");
    }

    #[test]
    fn test_request_serializes_without_stream_when_false() {
        let req = ChatCompletionRequest {
            model: "llama3.1".to_string(),
            messages: vec![ChatMessage::user("hi")],
            stream: false,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("stream"));
    }

    #[test]
    fn test_response_deserializes() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"hi there"}}]}"#;
        let resp: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.choices[0].message.content, "hi there");
    }

    #[test]
    fn test_gemini_response_deserializes() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"hi there"}]}}]}"#;
        let resp: GeminiGenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.candidates[0].content.parts[0].text, "hi there");
    }
}
