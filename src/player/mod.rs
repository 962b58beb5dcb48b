//! External player boundary.
//!
//! Decoding, bitrate adaptation and DRM are the external player's job. The
//! application only hands it a manifest URL plus at most one clear-key
//! credential, lists the tracks it reports, and relays its events.

pub mod controls;
pub mod ipc;
pub mod process;
pub mod status;
pub mod tracks;

pub use controls::Volume;
pub use process::ProcessPlayer;
pub use status::PlayerStatus;
pub use tracks::{TextTrack, TrackOption, VariantTrack};

use thiserror::Error;

use crate::api::types::Channel;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlayerError {
    #[error("Failed to launch player: {0}")]
    Launch(String),
    #[error("{0}")]
    Playback(String),
    /// Playback needs an explicit user action to start. Desktop processes
    /// never block autoplay.
    #[allow(dead_code)]
    #[error("Autoplay was blocked")]
    AutoplayBlocked,
    #[error("{0} is not supported by this player")]
    Unsupported(&'static str),
    #[error("No stream is loaded")]
    NotLoaded,
}

/// Asynchronous notifications from the player, relayed verbatim as status text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    Playing,
    Paused,
    Buffering,
    Ready,
    Ended,
    Error(String),
    /// The variant or text track lists changed.
    TracksChanged,
}

/// A player event stamped with the generation of the playback that raised it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedEvent {
    pub generation: u64,
    pub event: PlayerEvent,
}

/// One ClearKey credential: hex key ID and hex content key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearKey {
    pub key_id: String,
    pub key: String,
}

impl ClearKey {
    /// Parse `"<kid>:<key>"`. Anything after a second colon is ignored.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.trim().split(':');
        let key_id = parts.next()?.trim();
        let key = parts.next()?.trim();
        if key_id.is_empty() || key.is_empty() {
            return None;
        }
        Some(Self {
            key_id: key_id.to_string(),
            key: key.to_string(),
        })
    }
}

/// Everything the player needs to start a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackRequest {
    pub title: String,
    pub manifest_url: String,
    pub clear_key: Option<ClearKey>,
}

impl PlaybackRequest {
    /// Build a request for a channel; a malformed key is dropped with a warning.
    pub fn for_channel(channel: &Channel) -> Self {
        let clear_key = channel.key.as_deref().and_then(|raw| {
            let parsed = ClearKey::parse(raw);
            if parsed.is_none() {
                log::warn!(
                    "Ignoring malformed clear key for channel {} ({})",
                    channel.name,
                    channel.id
                );
            }
            parsed
        });

        Self {
            title: channel.name.clone(),
            manifest_url: channel.mpd.clone(),
            clear_key,
        }
    }
}

/// A single player instance per view.
///
/// `load` is only called on a destroyed (or never loaded) player; the
/// browser controller enforces that ordering.
#[allow(async_fn_in_trait)]
pub trait ExternalPlayer {
    /// Configure the clear key (if any) and start loading the manifest.
    async fn load(&mut self, request: &PlaybackRequest) -> Result<(), PlayerError>;

    /// Tear down the current instance. Resolves once teardown is complete.
    async fn destroy(&mut self);

    fn is_loaded(&self) -> bool;

    /// Counter bumped by every `load` and every new playback. Events tagged
    /// with any other value belong to a torn-down instance.
    fn generation(&self) -> u64;

    /// Start or resume playback. `AutoplayBlocked` means the user has to
    /// start it; any other error is a real failure.
    async fn play(&mut self) -> Result<(), PlayerError>;

    fn set_paused(&mut self, paused: bool) -> Result<(), PlayerError>;

    fn set_volume(&mut self, volume: &Volume) -> Result<(), PlayerError>;

    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), PlayerError>;

    fn variant_tracks(&self) -> Vec<VariantTrack>;

    fn text_tracks(&self) -> Vec<TextTrack>;

    /// `None` re-enables adaptive selection; `Some(id)` pins a variant.
    fn select_variant(&mut self, id: Option<u32>) -> Result<(), PlayerError>;

    /// `None` hides subtitles; `Some(id)` shows that track.
    fn select_text(&mut self, id: Option<u32>) -> Result<(), PlayerError>;
}
