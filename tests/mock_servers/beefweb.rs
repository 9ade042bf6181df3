//! Mock beefweb player API for testing
//!
//! Simulates the player endpoints under /api

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Mock player state
#[derive(Debug, Clone)]
pub struct MockPlayer {
    pub playback_state: String,
    pub playlist_index: i64,
    pub index: i64,
    pub position: f64,
    pub duration: f64,
    /// Decibels
    pub volume: f64,
    pub is_muted: bool,
}

impl Default for MockPlayer {
    fn default() -> Self {
        Self {
            playback_state: "stopped".to_string(),
            playlist_index: -1,
            index: -1,
            position: 0.0,
            duration: 0.0,
            volume: 0.0,
            is_muted: false,
        }
    }
}

/// Mock beefweb server state
#[derive(Default)]
struct MockBeefwebState {
    player: MockPlayer,
    /// Bodies received on POST /api/player
    set_state_requests: Vec<Value>,
    /// Transport commands received ("play", "pause", "stop")
    commands: Vec<String>,
    /// Respond 500 to everything
    failing: bool,
    /// Delay before answering GET /api/player
    state_delay: Option<Duration>,
}

type SharedState = Arc<RwLock<MockBeefwebState>>;

/// Mock beefweb server
pub struct MockBeefwebServer {
    addr: SocketAddr,
    state: SharedState,
    handle: JoinHandle<()>,
}

impl MockBeefwebServer {
    /// Start a mock beefweb server on a random port
    pub async fn start() -> Self {
        let state: SharedState = Arc::new(RwLock::new(MockBeefwebState::default()));

        let app = Router::new()
            .route("/api/player", get(get_player).post(set_player))
            .route("/api/player/play", post(play))
            .route("/api/player/pause", post(pause))
            .route("/api/player/stop", post(stop))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Get the server address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Replace the player state
    pub async fn set_player(&self, player: MockPlayer) {
        self.state.write().await.player = player;
    }

    pub async fn player(&self) -> MockPlayer {
        self.state.read().await.player.clone()
    }

    /// Make every endpoint answer 500
    pub async fn set_failing(&self, failing: bool) {
        self.state.write().await.failing = failing;
    }

    /// Delay GET /api/player responses
    pub async fn set_state_delay(&self, delay: Option<Duration>) {
        self.state.write().await.state_delay = delay;
    }

    pub async fn set_state_requests(&self) -> Vec<Value> {
        self.state.read().await.set_state_requests.clone()
    }

    pub async fn commands(&self) -> Vec<String> {
        self.state.read().await.commands.clone()
    }

    /// Stop the mock server
    pub async fn stop(self) {
        self.handle.abort();
    }
}

async fn get_player(State(state): State<SharedState>) -> Result<Json<Value>, StatusCode> {
    let delay = state.read().await.state_delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let state = state.read().await;
    if state.failing {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    let p = &state.player;
    Ok(Json(json!({
        "player": {
            "info": {
                "name": "Mock DeaDBeeF",
                "title": "Mock",
                "version": "1.8.8",
                "pluginVersion": "0.8"
            },
            "activeItem": {
                "playlistId": "p0",
                "playlistIndex": p.playlist_index,
                "index": p.index,
                "position": p.position,
                "duration": p.duration,
                "columns": []
            },
            "playbackState": p.playback_state,
            "playbackMode": 0,
            "playbackModes": ["Default", "Repeat Playlist"],
            "volume": {
                "type": "db",
                "min": -100.0,
                "max": 0.0,
                "value": p.volume,
                "isMuted": p.is_muted
            }
        }
    })))
}

async fn set_player(
    State(state): State<SharedState>,
    Json(body): Json<Value>,
) -> StatusCode {
    let mut state = state.write().await;
    if state.failing {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }

    if let Some(position) = body.get("position").and_then(Value::as_f64) {
        state.player.position = position;
    }
    if let Some(volume) = body.get("volume").and_then(Value::as_f64) {
        state.player.volume = volume;
    }
    if let Some(is_muted) = body.get("isMuted").and_then(Value::as_bool) {
        state.player.is_muted = is_muted;
    }
    state.set_state_requests.push(body);
    StatusCode::NO_CONTENT
}

async fn transport(state: SharedState, command: &str, playback_state: &str) -> StatusCode {
    let mut state = state.write().await;
    if state.failing {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    state.commands.push(command.to_string());
    state.player.playback_state = playback_state.to_string();
    StatusCode::NO_CONTENT
}

async fn play(State(state): State<SharedState>) -> StatusCode {
    transport(state, "play", "playing").await
}

async fn pause(State(state): State<SharedState>) -> StatusCode {
    transport(state, "pause", "paused").await
}

async fn stop(State(state): State<SharedState>) -> StatusCode {
    transport(state, "stop", "stopped").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_beefweb_starts_and_stops() {
        let server = MockBeefwebServer::start().await;
        assert!(server.addr().port() > 0);
        server.stop().await;
    }

    #[tokio::test]
    async fn mock_beefweb_reports_state() {
        let server = MockBeefwebServer::start().await;
        server
            .set_player(MockPlayer {
                playback_state: "playing".to_string(),
                position: 12.0,
                ..Default::default()
            })
            .await;

        let body: Value = reqwest::get(format!("http://{}/api/player", server.addr()))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["player"]["playbackState"], "playing");
        assert_eq!(body["player"]["activeItem"]["position"], 12.0);

        server.stop().await;
    }
}
