use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{Duration, SystemTime};
use urlencoding::encode;

const AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SCOPE: &str = "user-read-currently-playing";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: SystemTime,
}

/// Spotify OAuth2 authorization-code flow with an in-process token cache.
///
/// The token lives for the process: the authorize redirect lands on `/`,
/// the code gets exchanged here, and subsequent API calls reuse (and
/// refresh) the cached token.
pub struct SpotifyAuth {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    session_secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyAuth {
    pub fn new(
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        session_secret: String,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id,
            client_secret,
            redirect_uri,
            session_secret,
            token: Mutex::new(None),
        }
    }

    /// Whether a token has been obtained (it may still need a refresh).
    pub fn is_authorized(&self) -> bool {
        self.token.lock().is_some()
    }

    /// Drop the cached token; the next visit to `/` shows the sign-in link.
    pub fn sign_out(&self) {
        *self.token.lock() = None;
    }

    /// Anti-forgery token for the authorize redirect, derived from the
    /// session secret so it survives restarts mid-handshake.
    pub fn state_token(&self) -> String {
        format!("{:x}", Sha256::digest(self.session_secret.as_bytes()))
    }

    /// Where to send the user to sign in.
    pub fn authorize_url(&self) -> String {
        format!(
            "{AUTHORIZE_URL}?client_id={}&response_type=code&redirect_uri={}&scope={}&state={}&show_dialog=true",
            encode(&self.client_id),
            encode(&self.redirect_uri),
            encode(SCOPE),
            self.state_token()
        )
    }

    /// Step 2 of the handshake: trade the authorization code for a token.
    pub async fn exchange_code(&self, code: &str) -> Result<()> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let token_response = self.token_request(&params).await?;
        self.cache_token(token_response, None);
        Ok(())
    }

    /// Current access token, refreshed through the refresh-token grant when
    /// expired. Errors when the user never signed in.
    pub async fn access_token(&self) -> Result<String> {
        let cached = self.token.lock().clone();

        let Some(cached) = cached else {
            return Err(anyhow!("Not signed in to Spotify"));
        };

        if SystemTime::now() < cached.expires_at {
            return Ok(cached.access_token);
        }

        let Some(refresh_token) = cached.refresh_token else {
            return Err(anyhow!("Spotify session expired, sign in again"));
        };

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ];

        let token_response = self.token_request(&params).await?;
        let access_token = token_response.access_token.clone();
        // Spotify may omit the refresh token on refresh; keep the old one
        self.cache_token(token_response, Some(refresh_token));
        Ok(access_token)
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "Failed to get access token: {} - {}",
                status,
                error_text
            ));
        }

        let token_response: TokenResponse = response.json().await?;
        Ok(token_response)
    }

    fn cache_token(&self, response: TokenResponse, previous_refresh: Option<String>) {
        // Subtract 60s for safety
        let expires_at =
            SystemTime::now() + Duration::from_secs(response.expires_in.saturating_sub(60));
        *self.token.lock() = Some(CachedToken {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(previous_refresh),
            expires_at,
        });
    }
}
