//! Encyclopedia lookups
//!
//! Used for explicit "wikipedia" queries and as the fallback answer source
//! when no chat model is configured.

use crate::speech::split_segments;
use crate::{MurmurError, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Short summaries of a topic
pub trait Lookup: Send + Sync {
    /// Summarize `topic` in at most `sentences` sentences
    fn summarize(&self, topic: &str, sentences: usize) -> Result<String>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// MediaWiki action API endpoint
    pub endpoint: String,

    /// Sentences per summary
    pub sentences: usize,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://en.wikipedia.org/w/api.php".to_string(),
            sentences: 2,
            timeout_secs: 15,
        }
    }
}

/// Searches Wikipedia and returns the intro of the best match
pub struct WikipediaLookup {
    client: Client,
    endpoint: String,
}

impl WikipediaLookup {
    pub fn new(config: &LookupConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("murmur/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MurmurError::ConfigError(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

impl Lookup for WikipediaLookup {
    fn summarize(&self, topic: &str, sentences: usize) -> Result<String> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(MurmurError::LookupError("empty topic".into()));
        }

        debug!("Looking up '{}'", topic);
        let count = sentences.max(1);
        let count_param = count.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("generator", "search"),
                ("gsrsearch", topic),
                ("gsrlimit", "1"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("exsentences", count_param.as_str()),
                ("redirects", "1"),
            ])
            .send()
            .map_err(|e| MurmurError::LookupError(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(MurmurError::LookupError(format!("status {}", response.status())));
        }

        let body: Value = response
            .json()
            .map_err(|e| MurmurError::LookupError(format!("invalid response: {}", e)))?;

        let extract = first_extract(&body)
            .ok_or_else(|| MurmurError::LookupError(format!("no page found for '{}'", topic)))?;

        Ok(limit_sentences(&extract, count))
    }
}

fn first_extract(body: &Value) -> Option<String> {
    body.get("query")?
        .get("pages")?
        .as_object()?
        .values()
        .filter_map(|page| page.get("extract")?.as_str())
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

// The API's own sentence limit is not always honored for plain-text extracts
fn limit_sentences(text: &str, sentences: usize) -> String {
    split_segments(text)
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .take(sentences)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_extract() {
        let body = json!({
            "query": { "pages": { "123": { "title": "Pandas", "extract": "Pandas are bears. They eat bamboo." } } }
        });
        assert_eq!(
            first_extract(&body).as_deref(),
            Some("Pandas are bears. They eat bamboo.")
        );
    }

    #[test]
    fn test_first_extract_missing() {
        assert!(first_extract(&json!({ "batchcomplete": "" })).is_none());
        assert!(first_extract(&json!({ "query": { "pages": { "1": { "extract": "  " } } } })).is_none());
    }

    #[test]
    fn test_limit_sentences() {
        assert_eq!(limit_sentences("One. Two. Three.", 2), "One. Two.");
        assert_eq!(limit_sentences("Only one", 2), "Only one");
    }

    #[test]
    fn test_empty_topic_is_an_error() {
        let lookup = WikipediaLookup::new(&LookupConfig::default()).unwrap();
        assert!(matches!(lookup.summarize("   ", 2), Err(MurmurError::LookupError(_))));
    }
}
