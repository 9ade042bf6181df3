//! PlayerHandle - drives a media player entity the way the host scheduler would
//!
//! Polls the entity on a fixed interval, turns differences between consecutive
//! views into bus events and runs polls and commands one at a time. Reads
//! never wait for an operation in flight: the entity only locks its snapshot
//! briefly. Poll failures are already absorbed by the entity, so the loop
//! itself only ends on shutdown.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapters::player::PlayerError;
use crate::adapters::traits::{AdapterCommand, MediaPlayer};
use crate::bus::{BusEvent, MediaPlayerState, SharedBus};

/// Default poll interval (the host's default scan interval)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Entity shared between the poll loop and command callers
pub type SharedPlayer = Arc<dyn MediaPlayer>;

#[derive(Clone)]
pub struct PlayerHandle {
    player: SharedPlayer,
    /// Serializes polls and commands against the remote
    operations: Arc<Mutex<()>>,
    bus: SharedBus,
    poll_interval: Duration,
    shutdown: CancellationToken,
}

impl PlayerHandle {
    pub fn new(player: SharedPlayer, bus: SharedBus, shutdown: CancellationToken) -> Self {
        Self {
            player,
            operations: Arc::new(Mutex::new(())),
            bus,
            poll_interval: DEFAULT_POLL_INTERVAL,
            shutdown,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Current view of the entity
    pub fn state(&self) -> MediaPlayerState {
        self.player.to_state()
    }

    /// Poll once and publish whatever changed
    pub async fn poll_once(&self) {
        let op_guard = self.operations.lock().await;
        let before = self.player.to_state();
        self.player.update().await;
        let after = self.player.to_state();
        drop(op_guard);

        publish_changes(&self.bus, &before, &after);
    }

    /// Run one command against the entity.
    ///
    /// Remote failures are returned to the caller and announced on the bus;
    /// the optimistic local state is published on success.
    pub async fn execute(&self, command: AdapterCommand) -> Result<(), PlayerError> {
        let label = command.label();
        let op_guard = self.operations.lock().await;
        let before = self.player.to_state();
        let result = command.apply(self.player.as_ref()).await;
        let after = self.player.to_state();
        drop(op_guard);

        match &result {
            Ok(()) => publish_changes(&self.bus, &before, &after),
            Err(e) => {
                warn!("{}: command {} failed: {}", after.name, label, e);
                self.bus.publish(BusEvent::CommandFailed {
                    name: after.name,
                    command: label.to_string(),
                    error: e.to_string(),
                });
            }
        }
        result
    }

    /// Poll until shutdown is requested
    pub async fn run(self) {
        let name = self.state().name;
        info!("{}: polling every {:?}", name, self.poll_interval);

        let mut timer = interval(self.poll_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("{}: polling shutting down", name);
                    break;
                }
                _ = timer.tick() => {
                    self.poll_once().await;
                }
            }
        }

        self.bus.publish(BusEvent::AdapterStopped { adapter: name });
    }
}

/// Publish one event per kind of change between two views
fn publish_changes(bus: &SharedBus, before: &MediaPlayerState, after: &MediaPlayerState) {
    let name = &after.name;

    if before.state != after.state {
        debug!("{}: state {:?} -> {:?}", name, before.state, after.state);
        bus.publish(BusEvent::StateChanged {
            player: after.clone(),
        });
    }

    if before.volume_level != after.volume_level || before.is_volume_muted != after.is_volume_muted
    {
        if let Some(value) = after.volume_level {
            bus.publish(BusEvent::VolumeChanged {
                name: name.clone(),
                value,
                is_muted: after.is_volume_muted.unwrap_or(false),
            });
        }
    }

    if before.media_content_id != after.media_content_id {
        bus.publish(BusEvent::TrackChanged {
            name: name.clone(),
            content_id: after.media_content_id.clone(),
        });
    }

    if before.media_position_updated_at != after.media_position_updated_at {
        if let Some(position) = after.media_position {
            bus.publish(BusEvent::SeekPositionChanged {
                name: name.clone(),
                position,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::beefweb::{
        ActiveItem, BeefwebError, PlayerState, SetPlayerState, VolumeInfo,
    };
    use crate::adapters::player::BeefwebPlayer;
    use crate::adapters::traits::PlayerApi;
    use crate::bus::{create_bus, PlaybackState};
    use async_trait::async_trait;
    use std::time::Instant;

    /// Remote with a fixed state, an optional poll delay and a call log
    struct ScriptedApi {
        state: Option<PlayerState>,
        poll_delay: Duration,
        log: std::sync::Mutex<Vec<&'static str>>,
    }

    impl ScriptedApi {
        fn new(state: Option<PlayerState>) -> Self {
            Self {
                state,
                poll_delay: Duration::ZERO,
                log: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn slow(state: Option<PlayerState>, poll_delay: Duration) -> Self {
            Self {
                poll_delay,
                ..Self::new(state)
            }
        }

        fn record(&self, entry: &'static str) {
            self.log.lock().unwrap().push(entry);
        }
    }

    #[async_trait]
    impl PlayerApi for ScriptedApi {
        async fn get_player_state(&self) -> Result<PlayerState, BeefwebError> {
            tokio::time::sleep(self.poll_delay).await;
            self.record("poll");
            self.state
                .clone()
                .ok_or_else(|| BeefwebError::Decode("offline".to_string()))
        }

        async fn set_player_state(&self, _update: SetPlayerState) -> Result<(), BeefwebError> {
            Ok(())
        }

        async fn play_current(&self) -> Result<(), BeefwebError> {
            self.record("play");
            Ok(())
        }

        async fn pause(&self) -> Result<(), BeefwebError> {
            Err(BeefwebError::Decode("pause rejected".to_string()))
        }

        async fn stop(&self) -> Result<(), BeefwebError> {
            Ok(())
        }
    }

    fn playing(position: f64) -> PlayerState {
        PlayerState {
            playback_state: "playing".to_string(),
            active_item: ActiveItem {
                playlist_index: 0,
                index: 1,
                position,
                duration: 120.0,
            },
            volume: VolumeInfo::default(),
        }
    }

    fn handle_for(player: Arc<BeefwebPlayer<ScriptedApi>>) -> (PlayerHandle, SharedBus) {
        let bus = create_bus();
        let handle = PlayerHandle::new(player, bus.clone(), CancellationToken::new());
        (handle, bus)
    }

    fn handle(api: ScriptedApi) -> (PlayerHandle, SharedBus) {
        handle_for(Arc::new(BeefwebPlayer::new("Den", api)))
    }

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<BusEvent>) -> Vec<BusEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn first_poll_publishes_every_change() {
        let (handle, bus) = handle(ScriptedApi::new(Some(playing(5.0))));
        let mut rx = bus.subscribe();

        handle.poll_once().await;

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            BusEvent::StateChanged { player } if player.state == Some(PlaybackState::Playing)
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            BusEvent::VolumeChanged { value, .. } if (*value - 1.0).abs() < 1e-9
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            BusEvent::TrackChanged { content_id, .. } if content_id.as_deref() == Some("0:1")
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            BusEvent::SeekPositionChanged { position, .. } if *position == 5.0
        )));
    }

    #[tokio::test]
    async fn unchanged_poll_publishes_nothing() {
        let (handle, bus) = handle(ScriptedApi::new(Some(playing(5.0))));
        handle.poll_once().await;

        let mut rx = bus.subscribe();
        handle.poll_once().await;

        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn state_is_readable_while_poll_in_flight() {
        let player = Arc::new(
            BeefwebPlayer::new(
                "Den",
                ScriptedApi::slow(Some(playing(5.0)), Duration::from_millis(500)),
            )
            .with_poll_timeout(Duration::from_secs(2)),
        );
        let (handle, _bus) = handle_for(player);

        let poller = tokio::spawn({
            let handle = handle.clone();
            async move { handle.poll_once().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let started = Instant::now();
        let view = handle.state();
        assert!(started.elapsed() < Duration::from_millis(100));
        assert_eq!(view.state, None);

        poller.await.unwrap();
        assert_eq!(handle.state().state, Some(PlaybackState::Playing));
    }

    #[tokio::test]
    async fn command_waits_for_poll_in_flight() {
        let player = Arc::new(BeefwebPlayer::new(
            "Den",
            ScriptedApi::slow(Some(playing(5.0)), Duration::from_millis(200)),
        ));
        let (handle, _bus) = handle_for(player.clone());

        let poller = tokio::spawn({
            let handle = handle.clone();
            async move { handle.poll_once().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        handle.execute(AdapterCommand::Play).await.unwrap();
        poller.await.unwrap();

        assert_eq!(*player.client().log.lock().unwrap(), vec!["poll", "play"]);
    }

    #[tokio::test]
    async fn failed_command_is_returned_and_announced() {
        let (handle, bus) = handle(ScriptedApi::new(None));
        let mut rx = bus.subscribe();

        let result = handle.execute(AdapterCommand::Pause).await;

        assert!(result.is_err());
        let events = drain(&mut rx);
        assert!(matches!(
            events.as_slice(),
            [BusEvent::CommandFailed { command, .. }] if command == "pause"
        ));
        assert_eq!(handle.state().state, None);
    }

    #[tokio::test]
    async fn successful_command_publishes_optimistic_state() {
        let (handle, bus) = handle(ScriptedApi::new(None));
        let mut rx = bus.subscribe();

        handle.execute(AdapterCommand::TurnOn).await.unwrap();

        let events = drain(&mut rx);
        assert!(matches!(
            events.as_slice(),
            [BusEvent::StateChanged { player }] if player.state == Some(PlaybackState::Playing)
        ));
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let (handle, bus) = handle(ScriptedApi::new(Some(playing(0.0))));
        let shutdown = handle.shutdown.clone();
        let mut rx = bus.subscribe();

        let task = tokio::spawn(handle.with_poll_interval(Duration::from_millis(10)).run());
        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("poll loop should exit")
            .unwrap();

        let events = drain(&mut rx);
        assert!(matches!(
            events.last(),
            Some(BusEvent::AdapterStopped { adapter }) if adapter == "Den"
        ));
    }
}
