//! Beefweb Bridge
//!
//! Exposes a beefweb-enabled player (DeaDBeeF, foobar2000) as a generic
//! media player entity.
//!
//! This library provides:
//! - A typed beefweb HTTP client
//! - The media player entity: state polling with graceful fallback, and
//!   play/pause/stop/seek/volume/mute commands
//! - A poll driver publishing changes on an event bus
//! - An HTTP API with Server-Sent Events for real-time updates

pub mod adapters;
pub mod api;
pub mod bus;
pub mod config;
