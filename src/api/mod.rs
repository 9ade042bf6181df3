//! HTTP API handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::adapters::{AdapterCommand, PlayerError, PlayerHandle};
use crate::bus::{MediaPlayerState, SharedBus};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub player: PlayerHandle,
    pub bus: SharedBus,
}

impl AppState {
    pub fn new(player: PlayerHandle, bus: SharedBus) -> Self {
        Self { player, bus }
    }
}

/// All API routes
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .route("/player", get(player_handler))
        .route("/player/control", post(control_handler))
        .route("/player/volume", post(volume_handler))
        .route("/player/mute", post(mute_handler))
        .route("/player/seek", post(seek_handler))
        .route("/events", get(events_handler))
        .with_state(state)
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

/// Map a command outcome to an HTTP response.
/// Bad input is the caller's fault; remote failures are a bad gateway.
fn command_response(result: Result<(), PlayerError>) -> Response {
    match result {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"ok": true}))).into_response(),
        Err(e @ (PlayerError::InvalidVolume(_) | PlayerError::InvalidPosition(_))) => {
            error_response(StatusCode::BAD_REQUEST, e)
        }
        Err(e @ PlayerError::Api(_)) => error_response(StatusCode::BAD_GATEWAY, e),
    }
}

/// General status response
#[derive(Serialize)]
pub struct StatusResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub git_sha: &'static str,
    pub bus_subscribers: usize,
}

/// GET /status - Service health check
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        service: "beefweb-bridge",
        version: env!("BEEFWEB_BRIDGE_VERSION"),
        git_sha: env!("BEEFWEB_BRIDGE_GIT_SHA"),
        bus_subscribers: state.bus.subscriber_count(),
    })
}

/// GET /player - Current entity state
pub async fn player_handler(State(state): State<AppState>) -> Json<MediaPlayerState> {
    Json(state.player.state())
}

/// Control request body
#[derive(Deserialize)]
pub struct ControlRequest {
    pub action: String,
}

/// POST /player/control - play, pause, stop, turn_on, turn_off
pub async fn control_handler(
    State(state): State<AppState>,
    Json(req): Json<ControlRequest>,
) -> Response {
    let Some(command) = AdapterCommand::from_action(&req.action) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Unknown action: {}", req.action),
        );
    };
    command_response(state.player.execute(command).await)
}

/// Volume request body
#[derive(Deserialize)]
pub struct VolumeRequest {
    /// Linear 0.0..=1.0
    pub level: f64,
}

/// POST /player/volume - Set volume level
pub async fn volume_handler(
    State(state): State<AppState>,
    Json(req): Json<VolumeRequest>,
) -> Response {
    command_response(
        state
            .player
            .execute(AdapterCommand::SetVolume(req.level))
            .await,
    )
}

#[derive(Deserialize)]
pub struct MuteRequest {
    pub muted: bool,
}

/// POST /player/mute - Mute or unmute
pub async fn mute_handler(
    State(state): State<AppState>,
    Json(req): Json<MuteRequest>,
) -> Response {
    command_response(state.player.execute(AdapterCommand::Mute(req.muted)).await)
}

#[derive(Deserialize)]
pub struct SeekRequest {
    /// Seconds
    pub position: f64,
}

/// POST /player/seek - Seek within the current track
pub async fn seek_handler(
    State(state): State<AppState>,
    Json(req): Json<SeekRequest>,
) -> Response {
    command_response(
        state
            .player
            .execute(AdapterCommand::Seek(req.position))
            .await,
    )
}

/// GET /events - Server-Sent Events stream of bus events
pub async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.bus.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => match serde_json::to_string(&event) {
            Ok(json) => Some(Ok(Event::default().data(json))),
            Err(_) => None,
        },
        Err(_) => None, // Skip lagged messages
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
