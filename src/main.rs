use anyhow::{anyhow, Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kashi::access_log::AccessLog;
use kashi::cache::TranslationCache;
use kashi::config::Config;
use kashi::lyrics::GeniusClient;
use kashi::orchestrator::Orchestrator;
use kashi::server::{self, AppState};
use kashi::spotify::{SpotifyAuth, SpotifyPlayer};
use kashi::translate::GeminiClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kashi=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    // Missing credentials are the only fatal error; everything after
    // startup degrades per request instead of crashing
    let (client_id, client_secret) = config
        .spotify_credentials()
        .ok_or_else(|| anyhow!("SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET must be set"))?;
    let genius_token = config
        .genius_api_token
        .clone()
        .ok_or_else(|| anyhow!("GENIUS_API_TOKEN must be set"))?;
    let gemini_key = config
        .gemini_api_key
        .clone()
        .ok_or_else(|| anyhow!("GEMINI_API_KEY must be set"))?;
    let session_secret = config
        .session_secret_key
        .clone()
        .ok_or_else(|| anyhow!("SESSION_SECRET_KEY must be set"))?;

    let auth = Arc::new(SpotifyAuth::new(
        client_id,
        client_secret,
        config.redirect_uri.clone(),
        session_secret,
    ));
    let tracks = Arc::new(SpotifyPlayer::new(Arc::clone(&auth)));

    let cache = TranslationCache::open(&config.cache_path)
        .with_context(|| format!("failed to open cache at {}", config.cache_path.display()))?;
    let access_log = AccessLog::new(&config.access_log_path);

    let orchestrator = Orchestrator::new(
        tracks.clone(),
        Arc::new(GeniusClient::new(genius_token)),
        Arc::new(GeminiClient::new(gemini_key)),
        cache,
        access_log,
    );

    let state = Arc::new(AppState {
        auth,
        tracks,
        orchestrator,
    });

    let app = server::router(state);

    let host: std::net::IpAddr = config
        .host
        .parse()
        .with_context(|| format!("HOST must be a valid IP address: {}", config.host))?;
    let addr = SocketAddr::new(host, config.port);

    info!("kashi listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("failed to bind to address")?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    Ok(())
}
