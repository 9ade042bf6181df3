//! Normalized media player model shared by the adapter, the bus and the HTTP API.
//!
//! These types mirror the host framework's generic media player entity:
//! a playback state, a supported-features bitmask and a flat state view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

// =============================================================================
// PlaybackState
// =============================================================================

/// Normalized playback state
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
    /// Unreachable player or a state the remote reported that we don't know
    #[default]
    Off,
}

impl PlaybackState {
    /// Translate a raw beefweb `playbackState` string.
    ///
    /// Only the three literal values are recognized; everything else,
    /// including an empty string, is `Off`.
    pub fn from_remote(raw: &str) -> Self {
        match raw {
            "playing" => Self::Playing,
            "paused" => Self::Paused,
            "stopped" => Self::Stopped,
            _ => Self::Off,
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Playing => write!(f, "playing"),
            Self::Paused => write!(f, "paused"),
            Self::Stopped => write!(f, "stopped"),
            Self::Off => write!(f, "off"),
        }
    }
}

// =============================================================================
// SupportedFeatures
// =============================================================================

/// Media player feature bitmask, using the host framework's flag values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupportedFeatures(u32);

impl SupportedFeatures {
    pub const PAUSE: Self = Self(1);
    pub const SEEK: Self = Self(2);
    pub const VOLUME_SET: Self = Self(4);
    pub const VOLUME_MUTE: Self = Self(8);
    pub const TURN_ON: Self = Self(128);
    pub const TURN_OFF: Self = Self(256);
    pub const STOP: Self = Self(4096);
    pub const PLAY: Self = Self(16384);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SupportedFeatures {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// =============================================================================
// MediaType
// =============================================================================

/// Content type of the current media
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Music,
}

// =============================================================================
// MediaPlayerState
// =============================================================================

/// Flat, serializable view of everything the host reads from an entity.
///
/// Built from the accessors after each poll or command; the poll driver diffs
/// consecutive views to decide which bus events to publish.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaPlayerState {
    pub name: String,
    pub state: Option<PlaybackState>,
    pub volume_level: Option<f64>,
    pub is_volume_muted: Option<bool>,
    pub media_content_id: Option<String>,
    pub media_content_type: MediaType,
    pub media_duration: Option<f64>,
    pub media_position: Option<f64>,
    pub media_position_updated_at: Option<DateTime<Utc>>,
    pub supported_features: SupportedFeatures,
}
