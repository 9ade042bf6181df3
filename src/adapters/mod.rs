//! Beefweb player adapter: HTTP client, media player entity and poll driver

pub mod api_spec;
pub mod beefweb;
pub mod handle;
pub mod player;
pub mod traits;

pub use handle::{PlayerHandle, SharedPlayer};
pub use player::{BeefwebPlayer, PlayerError};
pub use traits::{AdapterCommand, MediaPlayer, PlayerApi};
