//! Text-to-image generation through the Stability REST API

use crate::messages::ImageRef;
use crate::{MurmurError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Shortest key accepted as plausibly valid
const MIN_KEY_LEN: usize = 8;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Produces an image from a text prompt
pub trait ImageGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<ImageRef>;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// API key; image generation is disabled when absent
    pub api_key: Option<String>,

    /// Text-to-image endpoint
    pub endpoint: String,

    pub cfg_scale: f32,
    pub width: u32,
    pub height: u32,
    pub steps: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: "https://api.stability.ai/v1/generation/stable-diffusion-xl-1024-v1-0/text-to-image"
                .to_string(),
            cfg_scale: 7.0,
            width: 1024,
            height: 1024,
            steps: 30,
            timeout_secs: 120,
        }
    }
}

impl ImageConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }
}

#[derive(Serialize)]
struct TextPrompt<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct TextToImageRequest<'a> {
    text_prompts: Vec<TextPrompt<'a>>,
    cfg_scale: f32,
    height: u32,
    width: u32,
    samples: u32,
    steps: u32,
}

#[derive(Deserialize)]
struct TextToImageResponse {
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

#[derive(Deserialize)]
struct Artifact {
    base64: String,
}

pub struct StabilityImageGenerator {
    client: Client,
    api_key: String,
    config: ImageConfig,
}

impl StabilityImageGenerator {
    /// Enable image generation. Rejects missing or implausibly short keys.
    pub fn new(config: ImageConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        if api_key.len() < MIN_KEY_LEN {
            return Err(MurmurError::ConfigError(
                "image generation API key is missing or too short".into(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MurmurError::ConfigError(format!("failed to create HTTP client: {}", e)))?;

        info!("Image generation enabled");
        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    fn request_body<'a>(&self, prompt: &'a str) -> TextToImageRequest<'a> {
        TextToImageRequest {
            text_prompts: vec![TextPrompt { text: prompt }],
            cfg_scale: self.config.cfg_scale,
            height: self.config.height,
            width: self.config.width,
            samples: 1,
            steps: self.config.steps,
        }
    }
}

impl ImageGenerator for StabilityImageGenerator {
    fn generate(&self, prompt: &str) -> Result<ImageRef> {
        debug!("Generating image for '{}'", prompt);

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&self.request_body(prompt))
            .send()
            .map_err(|e| MurmurError::ImageError(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(MurmurError::ImageError(format!("{}: {}", status, body.trim())));
        }

        let parsed: TextToImageResponse = response
            .json()
            .map_err(|e| MurmurError::ImageError(format!("invalid response: {}", e)))?;

        let artifact = parsed
            .artifacts
            .into_iter()
            .next()
            .ok_or_else(|| MurmurError::ImageError("response contained no image".into()))?;

        png_data_url(&artifact.base64)
    }
}

/// Validate a base64 PNG payload and wrap it in a `data:` URL
fn png_data_url(encoded: &str) -> Result<ImageRef> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| MurmurError::ImageError(format!("invalid image data: {}", e)))?;

    if !bytes.starts_with(&PNG_SIGNATURE) {
        return Err(MurmurError::ImageError("image is not a PNG".into()));
    }

    Ok(ImageRef::new(format!(
        "data:image/png;base64,{}",
        STANDARD.encode(&bytes)
    )))
}
