use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{build_prompt, TranslationSource};

const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const MODEL: &str = "gemini-2.0-flash";

/// Gemini generateContent client. Single request/response, no streaming,
/// no retry; the client's own timeout is the only guard.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("kashi/0.1.0")
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap();

        Self { client, api_key }
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "contents": [
                {"parts": [{"text": prompt}]}
            ]
        });

        let response = self
            .client
            .post(format!("{API_BASE_URL}/models/{MODEL}:generateContent"))
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "Gemini request failed: {} - {}",
                status,
                error_text
            ));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let text = parsed.text();

        if text.is_empty() {
            return Err(anyhow!("Gemini returned no text"));
        }

        Ok(text)
    }
}

#[async_trait]
impl TranslationSource for GeminiClient {
    async fn translate(&self, lyrics: &str) -> Result<String> {
        self.generate(&build_prompt(lyrics)).await
    }
}

// generateContent response shapes (only the fields we read)

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts.
    fn text(&self) -> String {
        let Some(candidate) = self.candidates.first() else {
            return String::new();
        };
        let Some(content) = &candidate.content else {
            return String::new();
        };
        content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}
