//! Beefweb HTTP client
//!
//! Typed client for the player endpoints of the beefweb remote control API
//! exposed by DeaDBeeF and foobar2000. Only the calls the media player
//! entity needs are implemented:
//!
//! - `GET  {base}/player`        current player state
//! - `POST {base}/player`        set position / volume / mute
//! - `POST {base}/player/play`   play current item
//! - `POST {base}/player/pause`  pause
//! - `POST {base}/player/stop`   stop

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::adapters::traits::PlayerApi;

/// Default beefweb listening port
pub const DEFAULT_PORT: u16 = 8880;
/// Base path used when no interface description says otherwise
pub const DEFAULT_BASE_PATH: &str = "/api";
/// Timeout applied to every request unless the caller imposes a shorter one
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors returned by the beefweb client
#[derive(Debug, Error)]
pub enum BeefwebError {
    #[error("beefweb request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("beefweb returned {status} for {path}")]
    Status {
        status: reqwest::StatusCode,
        path: String,
    },

    #[error("invalid beefweb response: {0}")]
    Decode(String),

    #[error("beefweb request timed out after {0:?}")]
    Timeout(Duration),
}

// =============================================================================
// Wire types
// =============================================================================

/// Envelope of `GET /player`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlayerStateResponse {
    pub player: PlayerState,
}

/// Remote player state as reported by beefweb
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerState {
    /// "playing", "paused", "stopped" (anything else is treated as off)
    pub playback_state: String,
    pub active_item: ActiveItem,
    pub volume: VolumeInfo,
}

/// The currently loaded track
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ActiveItem {
    pub playlist_index: i64,
    pub index: i64,
    /// Seconds
    pub position: f64,
    /// Seconds
    pub duration: f64,
}

impl Default for ActiveItem {
    fn default() -> Self {
        // beefweb reports -1 indices when nothing is loaded
        Self {
            playlist_index: -1,
            index: -1,
            position: 0.0,
            duration: 0.0,
        }
    }
}

/// Volume in the device's native decibel scale
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct VolumeInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub min: f64,
    pub max: f64,
    /// Decibels
    pub value: f64,
    pub is_muted: bool,
}

impl Default for VolumeInfo {
    fn default() -> Self {
        Self {
            kind: "db".to_string(),
            min: -100.0,
            max: 0.0,
            value: 0.0,
            is_muted: false,
        }
    }
}

/// Body of `POST /player`; absent fields are left untouched by the player
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SetPlayerState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<f64>,
    /// Decibels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_muted: Option<bool>,
}

impl SetPlayerState {
    pub fn position(position: f64) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn volume(volume_db: f64) -> Self {
        Self {
            volume: Some(volume_db),
            ..Default::default()
        }
    }

    pub fn muted(is_muted: bool) -> Self {
        Self {
            is_muted: Some(is_muted),
            ..Default::default()
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// HTTP client bound to one beefweb instance
#[derive(Clone)]
pub struct BeefwebClient {
    client: Client,
    base_url: String,
}

impl BeefwebClient {
    /// Create a client for `http://{host}:{port}{base_path}`
    pub fn new(host: &str, port: u16, base_path: &str) -> Result<Self, BeefwebError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, host, port, base_path))
    }

    /// Create a client reusing an existing reqwest client
    pub fn with_client(client: Client, host: &str, port: u16, base_path: &str) -> Self {
        let base_path = base_path.trim_end_matches('/');
        Self {
            client,
            base_url: format!("http://{}:{}{}", host, port, base_path),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "beefweb request");
        self.client.request(method, url)
    }

    async fn send(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<reqwest::Response, BeefwebError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BeefwebError::Status {
                status,
                path: path.to_string(),
            });
        }
        Ok(response)
    }

    async fn post_empty(&self, path: &str) -> Result<(), BeefwebError> {
        self.send(path, self.request(Method::POST, path)).await?;
        Ok(())
    }
}

#[async_trait]
impl PlayerApi for BeefwebClient {
    async fn get_player_state(&self) -> Result<PlayerState, BeefwebError> {
        let path = "/player";
        let response = self.send(path, self.request(Method::GET, path)).await?;
        let body = response.bytes().await?;
        let parsed: PlayerStateResponse =
            serde_json::from_slice(&body).map_err(|e| BeefwebError::Decode(e.to_string()))?;
        debug!(
            playback_state = %parsed.player.playback_state,
            position = parsed.player.active_item.position,
            volume_db = parsed.player.volume.value,
            "beefweb player state"
        );
        Ok(parsed.player)
    }

    async fn set_player_state(&self, update: SetPlayerState) -> Result<(), BeefwebError> {
        let path = "/player";
        self.send(path, self.request(Method::POST, path).json(&update))
            .await?;
        Ok(())
    }

    async fn play_current(&self) -> Result<(), BeefwebError> {
        self.post_empty("/player/play").await
    }

    async fn pause(&self) -> Result<(), BeefwebError> {
        self.post_empty("/player/pause").await
    }

    async fn stop(&self) -> Result<(), BeefwebError> {
        self.post_empty("/player/stop").await
    }
}
