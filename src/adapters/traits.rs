use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::adapters::beefweb::{BeefwebError, PlayerState, SetPlayerState};
use crate::adapters::player::PlayerError;
use crate::bus::{MediaPlayerState, MediaType, PlaybackState, SupportedFeatures};

// =============================================================================
// PlayerApi - remote player operations
// =============================================================================

/// The fixed set of remote calls the media player entity makes.
///
/// `BeefwebClient` implements this over HTTP; tests substitute an in-memory
/// fake so the translation logic can be exercised without a network.
#[async_trait]
pub trait PlayerApi: Send + Sync + 'static {
    async fn get_player_state(&self) -> Result<PlayerState, BeefwebError>;

    async fn set_player_state(&self, update: SetPlayerState) -> Result<(), BeefwebError>;

    async fn play_current(&self) -> Result<(), BeefwebError>;

    async fn pause(&self) -> Result<(), BeefwebError>;

    async fn stop(&self) -> Result<(), BeefwebError>;
}

// =============================================================================
// MediaPlayer - host entity contract
// =============================================================================

/// Generic media player entity as seen by the host framework.
///
/// Accessors return `None` until the first poll has populated a value.
/// Actions propagate remote failures; only `update` swallows them.
///
/// Every method takes `&self`: implementations keep their state behind a lock
/// that is released before any remote call, and callers that need polls and
/// commands to run one at a time serialize them outside the entity.
#[async_trait]
pub trait MediaPlayer: Send + Sync {
    fn name(&self) -> &str;
    fn state(&self) -> Option<PlaybackState>;
    fn volume_level(&self) -> Option<f64>;
    fn is_volume_muted(&self) -> Option<bool>;
    fn media_content_id(&self) -> Option<String>;
    fn media_content_type(&self) -> MediaType;
    fn media_duration(&self) -> Option<f64>;
    fn media_position(&self) -> Option<f64>;
    fn media_position_updated_at(&self) -> Option<DateTime<Utc>>;
    fn supported_features(&self) -> SupportedFeatures;

    /// Refresh from the remote player. Always reports success.
    async fn update(&self) -> bool;

    async fn media_play(&self) -> Result<(), PlayerError>;
    async fn media_pause(&self) -> Result<(), PlayerError>;
    async fn media_stop(&self) -> Result<(), PlayerError>;
    async fn turn_on(&self) -> Result<(), PlayerError>;
    async fn turn_off(&self) -> Result<(), PlayerError>;
    async fn media_seek(&self, position: f64) -> Result<(), PlayerError>;
    async fn mute_volume(&self, mute: bool) -> Result<(), PlayerError>;
    async fn set_volume_level(&self, volume: f64) -> Result<(), PlayerError>;

    /// Snapshot of every accessor, for serialization and change detection
    fn to_state(&self) -> MediaPlayerState {
        MediaPlayerState {
            name: self.name().to_string(),
            state: self.state(),
            volume_level: self.volume_level(),
            is_volume_muted: self.is_volume_muted(),
            media_content_id: self.media_content_id(),
            media_content_type: self.media_content_type(),
            media_duration: self.media_duration(),
            media_position: self.media_position(),
            media_position_updated_at: self.media_position_updated_at(),
            supported_features: self.supported_features(),
        }
    }
}

// =============================================================================
// Commands routed through the poll driver
// =============================================================================

/// Command that can be sent to a media player entity
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterCommand {
    Play,
    Pause,
    Stop,
    TurnOn,
    TurnOff,
    Seek(f64),
    Mute(bool),
    /// Linear volume, 0.0..=1.0
    SetVolume(f64),
}

impl AdapterCommand {
    /// Parse a transport action name as used by the HTTP API
    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            "play" => Some(Self::Play),
            "pause" => Some(Self::Pause),
            "stop" => Some(Self::Stop),
            "turn_on" => Some(Self::TurnOn),
            "turn_off" => Some(Self::TurnOff),
            _ => None,
        }
    }

    /// Short name for logs and bus events
    pub fn label(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::TurnOn => "turn_on",
            Self::TurnOff => "turn_off",
            Self::Seek(_) => "seek",
            Self::Mute(_) => "mute",
            Self::SetVolume(_) => "set_volume",
        }
    }

    /// Dispatch this command to an entity
    pub async fn apply<P: MediaPlayer + ?Sized>(self, player: &P) -> Result<(), PlayerError> {
        match self {
            Self::Play => player.media_play().await,
            Self::Pause => player.media_pause().await,
            Self::Stop => player.media_stop().await,
            Self::TurnOn => player.turn_on().await,
            Self::TurnOff => player.turn_off().await,
            Self::Seek(position) => player.media_seek(position).await,
            Self::Mute(mute) => player.mute_volume(mute).await,
            Self::SetVolume(volume) => player.set_volume_level(volume).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transport_actions() {
        assert_eq!(AdapterCommand::from_action("play"), Some(AdapterCommand::Play));
        assert_eq!(AdapterCommand::from_action("turn_off"), Some(AdapterCommand::TurnOff));
        assert_eq!(AdapterCommand::from_action("next"), None);
        assert_eq!(AdapterCommand::from_action(""), None);
    }

    #[test]
    fn labels_round_trip_for_transport_actions() {
        for command in [
            AdapterCommand::Play,
            AdapterCommand::Pause,
            AdapterCommand::Stop,
            AdapterCommand::TurnOn,
            AdapterCommand::TurnOff,
        ] {
            assert_eq!(AdapterCommand::from_action(command.label()), Some(command));
        }
        assert_eq!(AdapterCommand::SetVolume(0.5).label(), "set_volume");
    }
}
