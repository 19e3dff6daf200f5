use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::{parser, LyricsSource, SearchHit, SearchResponse};

const API_BASE_URL: &str = "https://api.genius.com";

/// Genius lyrics client: search the API for the song, then pull the lyrics
/// text out of the song page (the API itself does not serve lyrics).
#[derive(Clone)]
pub struct GeniusClient {
    client: reqwest::Client,
    token: String,
}

impl GeniusClient {
    pub fn new(token: String) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("kashi/0.1.0")
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();

        Self { client, token }
    }

    async fn search_song(&self, track: &str, artist: &str) -> Result<Vec<SearchHit>> {
        let query = format!("{track} {artist}");
        let response = self
            .client
            .get(format!("{API_BASE_URL}/search"))
            .query(&[("q", query.as_str())])
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "Genius search failed: {} - {}",
                status,
                error_text
            ));
        }

        let parsed: SearchResponse = response.json().await?;
        Ok(parsed.response.hits)
    }

    /// Pick the hit for the requested artist, falling back to the first hit
    /// when no primary artist lines up.
    fn best_match(hits: Vec<SearchHit>, artist: &str) -> Option<SearchHit> {
        if let Some(matching) = hits.iter().find(|h| h.result.matches_artist(artist)) {
            return Some(matching.clone());
        }
        hits.into_iter().next()
    }

    async fn fetch_song_page(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Failed to fetch Genius song page: {}",
                response.status()
            ));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl LyricsSource for GeniusClient {
    async fn search(&self, track: &str, artist: &str) -> Result<Option<String>> {
        let hits = self.search_song(track, artist).await?;

        let Some(hit) = Self::best_match(hits, artist) else {
            debug!(track, artist, "no Genius search hits");
            return Ok(None);
        };

        debug!(title = %hit.result.title, url = %hit.result.url, "fetching song page");
        let html = self.fetch_song_page(&hit.result.url).await?;

        Ok(parser::extract_lyrics(&html))
    }
}
