use axum::extract::{ConnectInfo, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::orchestrator::{CacheMode, Orchestrator};
use crate::spotify::{SpotifyAuth, TrackSource};

/// Everything the handlers need, constructed once at startup.
pub struct AppState {
    pub auth: Arc<SpotifyAuth>,
    pub tracks: Arc<dyn TrackSource>,
    pub orchestrator: Orchestrator,
}

#[derive(Debug, Serialize)]
struct CurrentlyPlayingBody {
    track_name: String,
    artist_name: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/sign_out", get(sign_out))
        .route("/currently_playing", get(currently_playing))
        .route("/lyrics", get(lyrics))
        .route("/force_lyrics", get(force_lyrics))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

/// OAuth handshake and landing page.
///
/// Step 1: no token yet, show the sign-in link. Step 2: redirected back
/// from Spotify with `?code=`, exchange it and bounce to `/`. Step 3:
/// signed in, show the navigation links.
async fn index(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Some(code) = params.get("code") {
        // A callback without the expected state token is forged or stale
        if !callback_state_valid(&params, &state.auth.state_token()) {
            warn!("OAuth state missing or mismatched on callback");
            return (
                StatusCode::BAD_REQUEST,
                Html("<p>Sign-in failed: state mismatch.</p>".to_string()),
            )
                .into_response();
        }

        return match state.auth.exchange_code(code).await {
            Ok(()) => Redirect::to("/").into_response(),
            Err(e) => {
                warn!(error = %e, "authorization code exchange failed");
                Html(format!("<p>Sign-in failed: {e}</p>")).into_response()
            }
        };
    }

    if !state.auth.is_authorized() {
        let auth_url = state.auth.authorize_url();
        return Html(format!(r#"<h2><a href="{auth_url}">Sign in with Spotify</a></h2>"#))
            .into_response();
    }

    Html(
        r#"<h2>Signed in <small><a href="/sign_out">[sign out]</a></small></h2>
<a href="/currently_playing">currently playing</a> | <a href="/lyrics">lyrics</a>"#
            .to_string(),
    )
    .into_response()
}

/// The callback must echo the state token exactly; absence counts as a
/// mismatch, not a pass.
fn callback_state_valid(params: &HashMap<String, String>, expected: &str) -> bool {
    params.get("state").map(String::as_str) == Some(expected)
}

async fn sign_out(State(state): State<Arc<AppState>>) -> Redirect {
    state.auth.sign_out();
    Redirect::to("/")
}

async fn currently_playing(State(state): State<Arc<AppState>>) -> Response {
    if !state.auth.is_authorized() {
        return Redirect::to("/").into_response();
    }

    match state.tracks.currently_playing().await {
        Ok(Some(current)) => Json(CurrentlyPlayingBody {
            track_name: current.track,
            artist_name: current.artist,
        })
        .into_response(),
        Ok(None) => "No track currently playing.".into_response(),
        Err(e) => Json(ErrorBody {
            error: e.to_string(),
        })
        .into_response(),
    }
}

async fn lyrics(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    lyrics_response(state, addr, CacheMode::Normal).await
}

async fn force_lyrics(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Response {
    lyrics_response(state, addr, CacheMode::Force).await
}

async fn lyrics_response(state: Arc<AppState>, addr: SocketAddr, mode: CacheMode) -> Response {
    if !state.auth.is_authorized() {
        return Redirect::to("/").into_response();
    }

    let report = state
        .orchestrator
        .lyrics_report(&addr.ip().to_string(), mode)
        .await;

    Json(report).into_response()
}
