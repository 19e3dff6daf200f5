use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub mod api;
pub mod auth;

pub use api::SpotifyClient;
pub use auth::SpotifyAuth;

/// The song the playback service reports as currently playing.
/// Transient: pulled fresh on every request, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentTrack {
    pub track: String,
    pub artist: String,
}

/// Source of the currently playing track. `Ok(None)` means nothing is
/// playing (or the playing item carries no track), which is a normal
/// outcome, not an error.
#[async_trait]
pub trait TrackSource: Send + Sync {
    async fn currently_playing(&self) -> Result<Option<CurrentTrack>>;
}

/// Spotify-backed [`TrackSource`]: OAuth token from the shared auth
/// handler, one API call per request.
pub struct SpotifyPlayer {
    auth: Arc<SpotifyAuth>,
    api: SpotifyClient,
}

impl SpotifyPlayer {
    pub fn new(auth: Arc<SpotifyAuth>) -> Self {
        Self {
            auth,
            api: SpotifyClient::new(),
        }
    }
}

#[async_trait]
impl TrackSource for SpotifyPlayer {
    async fn currently_playing(&self) -> Result<Option<CurrentTrack>> {
        let token = self.auth.access_token().await?;
        self.api.currently_playing(&token).await
    }
}
