pub mod error;
pub mod json;
pub mod types;

pub use error::{GeminiError, Result};
pub use types::{GenerateRequest, GenerationConfig, Part};

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use types::GenerateResponse;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model used by the investigation pipeline.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

pub struct Gemini {
    api_key: String,
    model: String,
    http: reqwest::Client,
    base_url: String,
}

impl Gemini {
    pub fn new(api_key: &str, model: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            http,
            base_url: GEMINI_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a generateContent request and return the first text reply.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        debug!(model = %self.model, "Gemini generateContent request");

        let resp = self.http.post(&url).json(request).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GeminiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateResponse = resp.json().await?;
        body.text().map(str::to_string).ok_or(GeminiError::Empty)
    }

    /// Text prompt with the pipeline's default settings (temperature 0.3).
    pub async fn prompt(&self, prompt: &str) -> Result<String> {
        self.generate(&GenerateRequest::text(prompt, GenerationConfig::new(0.3, 4096)))
            .await
    }

    /// Text prompt, then deserialize the JSON payload embedded in the reply.
    /// Callers are expected to supply a fallback on error; parse failures are
    /// routine with free-form model output.
    pub async fn extract<T: DeserializeOwned>(&self, prompt: &str) -> Result<T> {
        let reply = self
            .generate(&GenerateRequest::text(prompt, GenerationConfig::new(0.2, 4096)))
            .await?;
        json::extract_json(&reply)
            .ok_or_else(|| GeminiError::Parse(format!("no JSON object in reply: {reply}")))
    }

    /// Vision call: system prompt + inline image + optional user prompt.
    /// Returns the raw text reply for the caller to parse.
    pub async fn analyze_image(
        &self,
        system_prompt: &str,
        mime_type: &str,
        image_base64: &str,
        user_prompt: Option<&str>,
    ) -> Result<String> {
        let mut parts = vec![
            Part::text(system_prompt),
            Part::inline_data(mime_type, image_base64),
        ];
        if let Some(p) = user_prompt {
            parts.push(Part::text(p));
        }

        let config = GenerationConfig::new(0.2, 4096).top_p(0.8);
        self.generate(&GenerateRequest::parts(parts, config)).await
    }
}
