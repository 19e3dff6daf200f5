use anyhow::{anyhow, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

use super::CurrentTrack;

const API_BASE_URL: &str = "https://api.spotify.com/v1";

#[derive(Debug, Deserialize)]
pub struct CurrentlyPlayingResponse {
    pub item: Option<PlayingItem>,
}

#[derive(Debug, Deserialize)]
pub struct PlayingItem {
    pub name: String,
    pub album: Album,
}

#[derive(Debug, Deserialize)]
pub struct Album {
    pub artists: Vec<Artist>,
}

#[derive(Debug, Deserialize)]
pub struct Artist {
    pub name: String,
}

#[derive(Clone)]
pub struct SpotifyClient {
    client: reqwest::Client,
}

impl Default for SpotifyClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SpotifyClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent("kashi/0.1.0")
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();

        Self { client }
    }

    /// Query Spotify for the user's currently playing track.
    ///
    /// `Ok(None)` when nothing is playing: Spotify answers 204 with an
    /// empty body, or 200 with a null `item` (ads, podcasts between
    /// episodes).
    pub async fn currently_playing(&self, access_token: &str) -> Result<Option<CurrentTrack>> {
        let response = self
            .client
            .get(format!("{API_BASE_URL}/me/player/currently-playing"))
            .bearer_auth(access_token)
            .send()
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "Spotify currently-playing request failed: {} - {}",
                status,
                error_text
            ));
        }

        let playing: CurrentlyPlayingResponse = response.json().await?;

        let Some(item) = playing.item else {
            return Ok(None);
        };

        // Primary artist comes from the album, matching what the UI shows
        let artist = item
            .album
            .artists
            .into_iter()
            .next()
            .map(|a| a.name)
            .unwrap_or_else(|| "Unknown Artist".to_string());

        Ok(Some(CurrentTrack {
            track: item.name,
            artist,
        }))
    }
}
