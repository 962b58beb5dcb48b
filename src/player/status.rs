//! Status line for the player view.
//!
//! Driven by user actions (load, play) and by the asynchronous events the
//! external player emits.

use super::PlayerEvent;

/// All the states the status line can show.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlayerStatus {
    /// No channel open.
    #[default]
    Idle,
    /// Manifest handed to the player, nothing decoded yet.
    Loading,
    /// Loaded but playback has not started (autoplay refused or not attempted).
    AwaitingPlay,
    Playing,
    Paused,
    Buffering,
    /// Enough data buffered to play through.
    Ready,
    Ended,
    /// The manifest could not be loaded.
    LoadFailed(String),
    /// The player failed after loading, with its own message.
    Failed(String),
}

impl PlayerStatus {
    pub fn label(&self) -> String {
        match self {
            PlayerStatus::Idle => String::new(),
            PlayerStatus::Loading => "Loading stream...".to_string(),
            PlayerStatus::AwaitingPlay => "Click play to start".to_string(),
            PlayerStatus::Playing => "Playing".to_string(),
            PlayerStatus::Paused => "Paused".to_string(),
            PlayerStatus::Buffering => "Buffering...".to_string(),
            PlayerStatus::Ready => "Ready".to_string(),
            PlayerStatus::Ended => "Stream ended".to_string(),
            PlayerStatus::LoadFailed(msg) => format!("Failed to load stream: {}", msg),
            PlayerStatus::Failed(msg) => format!("Playback failed: {}", msg),
        }
    }

    /// Status after the player reports `event`.
    pub fn on_event(&self, event: &PlayerEvent) -> PlayerStatus {
        match event {
            PlayerEvent::Playing => PlayerStatus::Playing,
            PlayerEvent::Paused => PlayerStatus::Paused,
            PlayerEvent::Buffering => PlayerStatus::Buffering,
            // A ready signal while already playing is not a state change.
            PlayerEvent::Ready if *self == PlayerStatus::Playing => PlayerStatus::Playing,
            PlayerEvent::Ready => PlayerStatus::Ready,
            PlayerEvent::Ended => PlayerStatus::Ended,
            PlayerEvent::Error(msg) => PlayerStatus::Failed(msg.clone()),
            PlayerEvent::TracksChanged => self.clone(),
        }
    }

    /// True while the play/pause control should show "pause".
    pub fn is_playing(&self) -> bool {
        matches!(self, PlayerStatus::Playing | PlayerStatus::Buffering)
    }
}
