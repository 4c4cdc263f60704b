//! Gemini chat session over the `generateContent` REST endpoint

use super::config::LlmConfig;
use super::context::{ChatContext, ChatRole};
use super::ChatSession;
use crate::{MurmurError, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: ChatRole,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Multi-turn chat with a hosted Gemini model
pub struct GeminiChat {
    client: Client,
    api_key: String,
    url: String,
    context: ChatContext,
}

impl GeminiChat {
    /// Start a chat session. Fails without a usable API key.
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .key()
            .ok_or_else(|| MurmurError::ConfigError("Gemini API key is required".into()))?
            .to_string();

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| MurmurError::ConfigError(format!("failed to create HTTP client: {}", e)))?;

        let url = format!(
            "{}/models/{}:generateContent",
            config.endpoint.trim_end_matches('/'),
            config.model
        );

        info!("Gemini chat session ready ({})", config.model);

        Ok(Self {
            client,
            api_key,
            url,
            context: ChatContext::new(config.max_turns, config.context_tokens),
        })
    }

    fn request_body<'a>(&'a self, query: &'a str) -> GenerateRequest<'a> {
        let mut contents: Vec<Content<'a>> = self
            .context
            .turns()
            .iter()
            .map(|turn| Content {
                role: turn.role,
                parts: vec![Part { text: &turn.text }],
            })
            .collect();
        contents.push(Content {
            role: ChatRole::User,
            parts: vec![Part { text: query }],
        });
        GenerateRequest { contents }
    }
}

impl ChatSession for GeminiChat {
    fn send(&mut self, query: &str) -> Result<String> {
        debug!("Sending chat query ({} turns of history)", self.context.len());

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(query))
            .send()
            .map_err(|e| MurmurError::LlmError(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(MurmurError::LlmError(format!("{}: {}", status, body.trim())));
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| MurmurError::LlmError(format!("invalid response: {}", e)))?;

        let reply = extract_reply(parsed)
            .ok_or_else(|| MurmurError::LlmError("response contained no text".into()))?;

        self.context.push_exchange(query, reply.clone());
        Ok(reply)
    }

    fn reset(&mut self) {
        self.context.clear();
    }
}

fn extract_reply(response: GenerateResponse) -> Option<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(
            GeminiChat::new(&LlmConfig::default()),
            Err(MurmurError::ConfigError(_))
        ));
    }

    #[test]
    fn test_url_built_from_config() {
        let chat = GeminiChat::new(
            &LlmConfig::new("key")
                .with_endpoint("http://localhost:1/v1beta/")
                .with_model("m"),
        )
        .unwrap();
        assert_eq!(chat.url, "http://localhost:1/v1beta/models/m:generateContent");
    }

    #[test]
    fn test_request_body_includes_history() {
        let mut chat = GeminiChat::new(&LlmConfig::new("key")).unwrap();
        chat.context.push_exchange("hi", "hello");

        let body = serde_json::to_value(chat.request_body("how are you")).unwrap();
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "how are you");
    }

    #[test]
    fn test_extract_reply_joins_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello "},{"text":"there"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_reply(response).as_deref(), Some("Hello there"));
    }

    #[test]
    fn test_extract_reply_empty() {
        let response: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(extract_reply(response).is_none());
    }

    #[test]
    fn test_reset_clears_history() {
        let mut chat = GeminiChat::new(&LlmConfig::new("key")).unwrap();
        chat.context.push_exchange("a", "b");
        chat.reset();
        assert!(chat.context.is_empty());
    }
}
