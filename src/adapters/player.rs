//! Beefweb media player entity
//!
//! Keeps the last known player snapshot, refreshes it from the remote on
//! every poll and turns host actions into beefweb calls.
//!
//! Two error tiers:
//! - Poll path (`update`): never fails. A timed out or failed request is
//!   replaced by a synthetic "off" response built from the cached values, so
//!   the host sees the player as off rather than unavailable.
//! - Command path: remote failures propagate to the caller untouched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::adapters::beefweb::{ActiveItem, BeefwebError, PlayerState, SetPlayerState, VolumeInfo};
use crate::adapters::traits::{MediaPlayer, PlayerApi};
use crate::bus::{MediaPlayerState, MediaType, PlaybackState, SupportedFeatures};

/// Default entity name
pub const DEFAULT_NAME: &str = "Beefweb";
/// Upper bound for a single poll request
pub const POLL_TIMEOUT: Duration = Duration::from_secs(9);
/// Smallest linear volume fed to the log transform (-100 dB)
pub const LINEAR_VOLUME_FLOOR: f64 = 1e-5;
/// Playback state string used for the synthetic fallback response
const FALLBACK_PLAYBACK_STATE: &str = "off";

/// Features this entity reports to the host
pub const SUPPORT_BEEFWEB: SupportedFeatures = SupportedFeatures::from_bits(
    SupportedFeatures::PAUSE.bits()
        | SupportedFeatures::SEEK.bits()
        | SupportedFeatures::VOLUME_SET.bits()
        | SupportedFeatures::VOLUME_MUTE.bits()
        | SupportedFeatures::TURN_ON.bits()
        | SupportedFeatures::TURN_OFF.bits()
        | SupportedFeatures::STOP.bits()
        | SupportedFeatures::PLAY.bits(),
);

/// Errors surfaced by entity actions
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error(transparent)]
    Api(#[from] BeefwebError),

    #[error("volume level must be within 0.0..=1.0, got {0}")]
    InvalidVolume(f64),

    #[error("seek position must be a non-negative number of seconds, got {0}")]
    InvalidPosition(f64),
}

// =============================================================================
// Volume conversion
// =============================================================================

/// Decibels to linear 0..1 volume
pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Linear 0..1 volume to decibels; values at or below the floor map to the floor
pub fn linear_to_db(linear: f64) -> f64 {
    20.0 * linear.max(LINEAR_VOLUME_FLOOR).log10()
}

// =============================================================================
// Snapshot
// =============================================================================

/// Last known state of the remote player. Every field is unset until the
/// first poll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerSnapshot {
    pub playback_status: Option<PlaybackState>,
    pub volume_linear: Option<f64>,
    pub muted: Option<bool>,
    pub position_seconds: Option<f64>,
    pub duration_seconds: Option<f64>,
    pub position_updated_at: Option<DateTime<Utc>>,
    pub track_id: Option<String>,
    pub playlist_index: Option<i64>,
    pub item_index: Option<i64>,
}

impl PlayerSnapshot {
    /// Response to use when the remote can't be reached: the cached values
    /// with the playback state forced to "off".
    pub fn fallback_response(&self) -> PlayerState {
        let defaults = ActiveItem::default();
        // First poll: no known volume, seed from the floor instead of log(0)
        let volume_db = linear_to_db(self.volume_linear.unwrap_or(LINEAR_VOLUME_FLOOR));

        PlayerState {
            playback_state: FALLBACK_PLAYBACK_STATE.to_string(),
            active_item: ActiveItem {
                playlist_index: self.playlist_index.unwrap_or(defaults.playlist_index),
                index: self.item_index.unwrap_or(defaults.index),
                position: self.position_seconds.unwrap_or(defaults.position),
                duration: self.duration_seconds.unwrap_or(defaults.duration),
            },
            volume: VolumeInfo {
                value: volume_db,
                is_muted: self.muted.unwrap_or(false),
                ..VolumeInfo::default()
            },
        }
    }

    /// Fold a remote response into the snapshot.
    ///
    /// The position timestamp only moves when the position itself changed,
    /// so the host's elapsed-time extrapolation stays anchored.
    pub fn apply(&mut self, response: &PlayerState, now: DateTime<Utc>) {
        let item = &response.active_item;

        self.playback_status = Some(PlaybackState::from_remote(&response.playback_state));
        self.duration_seconds = Some(item.duration);

        if self.position_seconds != Some(item.position) {
            self.position_seconds = Some(item.position);
            self.position_updated_at = Some(now);
        }

        // Same dB as the cached level (e.g. an echoed fallback): keep the
        // exact linear value instead of its floored round trip
        if self.volume_linear.map(linear_to_db) != Some(response.volume.value) {
            self.volume_linear = Some(db_to_linear(response.volume.value));
        }
        self.muted = Some(response.volume.is_muted);

        self.playlist_index = Some(item.playlist_index);
        self.item_index = Some(item.index);
        self.track_id = Some(format!("{}:{}", item.playlist_index, item.index));
    }
}

// =============================================================================
// BeefwebPlayer
// =============================================================================

/// Media player entity backed by one beefweb instance.
///
/// The snapshot sits behind a short-lived lock that is never held across a
/// remote call, so accessors stay responsive while a poll is in flight.
pub struct BeefwebPlayer<C: PlayerApi> {
    name: String,
    client: C,
    snapshot: RwLock<PlayerSnapshot>,
    poll_timeout: Duration,
}

impl<C: PlayerApi> BeefwebPlayer<C> {
    pub fn new(name: impl Into<String>, client: C) -> Self {
        Self {
            name: name.into(),
            client,
            snapshot: RwLock::new(PlayerSnapshot::default()),
            poll_timeout: POLL_TIMEOUT,
        }
    }

    /// Override the poll timeout (tests use short timeouts)
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Copy of the current snapshot
    pub fn snapshot(&self) -> PlayerSnapshot {
        self.read_snapshot().clone()
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn read_snapshot(&self) -> RwLockReadGuard<'_, PlayerSnapshot> {
        self.snapshot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_snapshot(&self) -> RwLockWriteGuard<'_, PlayerSnapshot> {
        self.snapshot.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch the remote state, falling back to `fallback` on any failure
    async fn fetch_or_fallback(&self, fallback: PlayerState) -> PlayerState {
        match tokio::time::timeout(self.poll_timeout, self.client.get_player_state()).await {
            Ok(Ok(state)) => state,
            Ok(Err(e)) => {
                warn!(player = %self.name, "Poll failed, reporting off: {}", e);
                fallback
            }
            Err(_) => {
                warn!(
                    player = %self.name,
                    "Poll failed, reporting off: {}",
                    BeefwebError::Timeout(self.poll_timeout)
                );
                fallback
            }
        }
    }

    fn set_playback_status(&self, status: PlaybackState) {
        self.write_snapshot().playback_status = Some(status);
    }
}

#[async_trait]
impl<C: PlayerApi> MediaPlayer for BeefwebPlayer<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> Option<PlaybackState> {
        self.read_snapshot().playback_status
    }

    fn volume_level(&self) -> Option<f64> {
        self.read_snapshot().volume_linear
    }

    fn is_volume_muted(&self) -> Option<bool> {
        self.read_snapshot().muted
    }

    fn media_content_id(&self) -> Option<String> {
        self.read_snapshot().track_id.clone()
    }

    fn media_content_type(&self) -> MediaType {
        MediaType::Music
    }

    fn media_duration(&self) -> Option<f64> {
        self.read_snapshot().duration_seconds
    }

    fn media_position(&self) -> Option<f64> {
        self.read_snapshot().position_seconds
    }

    fn media_position_updated_at(&self) -> Option<DateTime<Utc>> {
        self.read_snapshot().position_updated_at
    }

    fn supported_features(&self) -> SupportedFeatures {
        SUPPORT_BEEFWEB
    }

    /// One consistent view taken under a single read lock
    fn to_state(&self) -> MediaPlayerState {
        let snapshot = self.read_snapshot();
        MediaPlayerState {
            name: self.name.clone(),
            state: snapshot.playback_status,
            volume_level: snapshot.volume_linear,
            is_volume_muted: snapshot.muted,
            media_content_id: snapshot.track_id.clone(),
            media_content_type: MediaType::Music,
            media_duration: snapshot.duration_seconds,
            media_position: snapshot.position_seconds,
            media_position_updated_at: snapshot.position_updated_at,
            supported_features: SUPPORT_BEEFWEB,
        }
    }

    async fn update(&self) -> bool {
        let fallback = self.read_snapshot().fallback_response();
        let response = self.fetch_or_fallback(fallback).await;

        let snapshot = {
            let mut snapshot = self.write_snapshot();
            snapshot.apply(&response, Utc::now());
            snapshot.clone()
        };
        debug!(
            player = %self.name,
            state = ?snapshot.playback_status,
            position = ?snapshot.position_seconds,
            volume = ?snapshot.volume_linear,
            "Player updated"
        );
        true
    }

    async fn media_play(&self) -> Result<(), PlayerError> {
        self.client.play_current().await?;
        self.set_playback_status(PlaybackState::Playing);
        info!(player = %self.name, "Play");
        Ok(())
    }

    async fn media_pause(&self) -> Result<(), PlayerError> {
        self.client.pause().await?;
        self.set_playback_status(PlaybackState::Paused);
        info!(player = %self.name, "Pause");
        Ok(())
    }

    async fn media_stop(&self) -> Result<(), PlayerError> {
        self.client.stop().await?;
        self.set_playback_status(PlaybackState::Stopped);
        info!(player = %self.name, "Stop");
        Ok(())
    }

    async fn turn_on(&self) -> Result<(), PlayerError> {
        self.media_play().await
    }

    async fn turn_off(&self) -> Result<(), PlayerError> {
        self.media_pause().await
    }

    async fn media_seek(&self, position: f64) -> Result<(), PlayerError> {
        if !position.is_finite() || position < 0.0 {
            return Err(PlayerError::InvalidPosition(position));
        }
        // Position is picked up by the next poll
        self.client
            .set_player_state(SetPlayerState::position(position))
            .await?;
        info!(player = %self.name, position, "Seek");
        Ok(())
    }

    async fn mute_volume(&self, mute: bool) -> Result<(), PlayerError> {
        self.client
            .set_player_state(SetPlayerState::muted(mute))
            .await?;
        self.write_snapshot().muted = Some(mute);
        info!(player = %self.name, mute, "Mute");
        Ok(())
    }

    async fn set_volume_level(&self, volume: f64) -> Result<(), PlayerError> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(PlayerError::InvalidVolume(volume));
        }
        let volume_db = linear_to_db(volume);
        self.client
            .set_player_state(SetPlayerState::volume(volume_db))
            .await?;
        self.write_snapshot().volume_linear = Some(volume);
        info!(player = %self.name, volume, volume_db, "Set volume");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
