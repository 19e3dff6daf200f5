use std::path::PathBuf;
use tracing::warn;

const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8080";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_CACHE_PATH: &str = "kashi_cache.sqlite3";
const DEFAULT_ACCESS_LOG: &str = "access_log.csv";

#[derive(Debug, Clone)]
pub struct Config {
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub genius_api_token: Option<String>,
    pub gemini_api_key: Option<String>,
    pub session_secret_key: Option<String>,
    pub redirect_uri: String,
    pub host: String,
    pub port: u16,
    pub cache_path: PathBuf,
    pub access_log_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        let spotify_client_id = std::env::var("SPOTIFY_CLIENT_ID").ok();
        let spotify_client_secret = std::env::var("SPOTIFY_CLIENT_SECRET").ok();
        let genius_api_token = std::env::var("GENIUS_API_TOKEN").ok();
        let gemini_api_key = std::env::var("GEMINI_API_KEY").ok();
        let session_secret_key = std::env::var("SESSION_SECRET_KEY").ok();

        // Must match the redirect URI registered in the Spotify app settings
        let redirect_uri = std::env::var("REDIRECT_URI")
            .unwrap_or_else(|_| DEFAULT_REDIRECT_URI.to_string());

        let host = std::env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(value = %raw, "PORT is not a valid port number, using {DEFAULT_PORT}");
                DEFAULT_PORT
            }),
            Err(_) => DEFAULT_PORT,
        };

        let cache_path = std::env::var("KASHI_CACHE_PATH")
            .unwrap_or_else(|_| DEFAULT_CACHE_PATH.to_string())
            .into();
        let access_log_path = std::env::var("KASHI_ACCESS_LOG")
            .unwrap_or_else(|_| DEFAULT_ACCESS_LOG.to_string())
            .into();

        Self {
            spotify_client_id,
            spotify_client_secret,
            genius_api_token,
            gemini_api_key,
            session_secret_key,
            redirect_uri,
            host,
            port,
            cache_path,
            access_log_path,
        }
    }

    pub fn has_spotify_credentials(&self) -> bool {
        self.spotify_client_id.is_some() && self.spotify_client_secret.is_some()
    }

    pub fn spotify_credentials(&self) -> Option<(String, String)> {
        match (&self.spotify_client_id, &self.spotify_client_secret) {
            (Some(id), Some(secret)) => Some((id.clone(), secret.clone())),
            _ => None,
        }
    }
}
