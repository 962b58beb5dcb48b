//! Browser view: package catalog, channel list and the player panel.
//!
//! All player access goes through this controller, which keeps at most one
//! live playback session: any active instance is destroyed (and its teardown
//! awaited) before the next channel is loaded.

use thiserror::Error;

use crate::api::types::{Channel, Package, SubscriptionPeriod, User};
use crate::api::LicenseTransport;
use crate::bridge::{BridgeStore, SessionRecord};
use crate::commands::{self, CommandError};
use crate::player::tracks::{quality_options, subtitle_options};
use crate::player::{
    ExternalPlayer, PlaybackRequest, PlayerError, PlayerEvent, PlayerStatus, TaggedEvent,
    TrackOption, Volume,
};
use crate::state::AppState;

pub const VIEW_NAME: &str = "Packages";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BrowserError {
    #[error("No package #{0}")]
    NoSuchPackage(usize),
    #[error("No channel #{0}")]
    NoSuchChannel(usize),
    #[error("Open a package first")]
    NoPackageOpen,
    #[error("Nothing is playing")]
    NothingPlaying,
    #[error(transparent)]
    Player(#[from] PlayerError),
}

/// What is on screen apart from the player panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Packages,
    Channels(usize),
}

pub struct BrowserController<P> {
    player: P,
    record: Option<SessionRecord>,
    packages: Vec<Package>,
    catalog_error: Option<CommandError>,
    screen: Screen,
    now_playing: Option<Channel>,
    status: PlayerStatus,
    volume: Volume,
    fullscreen: bool,
    quality: Vec<TrackOption>,
    subtitles: Vec<TrackOption>,
}

impl<P: ExternalPlayer> BrowserController<P> {
    pub fn new(player: P) -> Self {
        Self {
            player,
            record: None,
            packages: Vec::new(),
            catalog_error: None,
            screen: Screen::Packages,
            now_playing: None,
            status: PlayerStatus::Idle,
            volume: Volume::default(),
            fullscreen: false,
            quality: Vec::new(),
            subtitles: Vec::new(),
        }
    }

    /// View start-up: read the bridge record, then load the catalog.
    pub async fn start<T: LicenseTransport>(&mut self, state: &AppState<T>) {
        self.record = match state.bridge.load() {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Failed to read session record: {}", e);
                None
            }
        };
        if self.record.is_none() {
            log::info!("No session record, user info hidden");
        }
        self.refresh(state).await;
    }

    /// Re-fetch the catalog. A failure leaves an error with a retry offer.
    pub async fn refresh<T: LicenseTransport>(&mut self, state: &AppState<T>) {
        match commands::get_packages(state).await {
            Ok(packages) => {
                self.packages = packages;
                self.catalog_error = None;
            }
            Err(e) => {
                self.packages.clear();
                self.catalog_error = Some(e);
            }
        }
        self.screen = Screen::Packages;
    }

    pub fn user(&self) -> Option<&User> {
        self.record.as_ref().and_then(|r| r.user.as_ref())
    }

    pub fn subscription(&self) -> Option<&SubscriptionPeriod> {
        self.record.as_ref().and_then(|r| r.subscription.as_ref())
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn catalog_error(&self) -> Option<&CommandError> {
        self.catalog_error.as_ref()
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn current_package(&self) -> Option<&Package> {
        match self.screen {
            Screen::Channels(index) => self.packages.get(index),
            Screen::Packages => None,
        }
    }

    pub fn now_playing(&self) -> Option<&Channel> {
        self.now_playing.as_ref()
    }

    pub fn status(&self) -> &PlayerStatus {
        &self.status
    }

    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Quality select entries; empty hides the control.
    pub fn quality_options(&self) -> &[TrackOption] {
        &self.quality
    }

    /// Subtitle select entries; empty hides the control.
    pub fn subtitle_options(&self) -> &[TrackOption] {
        &self.subtitles
    }

    #[cfg(test)]
    pub fn player(&self) -> &P {
        &self.player
    }

    #[cfg(test)]
    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    /// Show the channels of a package (zero-based index).
    pub fn open_package(&mut self, index: usize) -> Result<&Package, BrowserError> {
        if index >= self.packages.len() {
            return Err(BrowserError::NoSuchPackage(index));
        }
        self.screen = Screen::Channels(index);
        Ok(&self.packages[index])
    }

    pub fn back(&mut self) {
        self.screen = Screen::Packages;
    }

    /// Start a channel of the open package (zero-based index).
    pub async fn play_channel(&mut self, index: usize) -> Result<(), BrowserError> {
        let channel = self
            .current_package()
            .ok_or(BrowserError::NoPackageOpen)?
            .channels
            .get(index)
            .cloned()
            .ok_or(BrowserError::NoSuchChannel(index))?;

        self.teardown().await;

        log::info!("Playing channel: {}", channel.name);
        let request = PlaybackRequest::for_channel(&channel);
        self.now_playing = Some(channel);
        self.status = PlayerStatus::Loading;

        if let Err(e) = self.player.set_volume(&self.volume) {
            log::debug!("Initial volume not applied: {}", e);
        }
        if let Err(e) = self.player.set_fullscreen(self.fullscreen) {
            log::debug!("Fullscreen not applied: {}", e);
        }
        if let Err(e) = self.player.load(&request).await {
            log::error!("Failed to load stream: {}", e);
            self.status = PlayerStatus::LoadFailed(e.to_string());
            return Err(e.into());
        }

        self.refresh_tracks();

        match self.player.play().await {
            Ok(()) => self.status = PlayerStatus::Playing,
            Err(PlayerError::AutoplayBlocked) => {
                log::info!("Autoplay blocked, waiting for play");
                self.status = PlayerStatus::AwaitingPlay;
            }
            Err(e) => {
                log::error!("Failed to start playback: {}", e);
                self.status = PlayerStatus::Failed(e.to_string());
                return Err(e.into());
            }
        }
        Ok(())
    }

    pub async fn toggle_play(&mut self) -> Result<(), BrowserError> {
        self.require_playing()?;
        if self.status.is_playing() {
            self.player.set_paused(true)?;
            self.status = PlayerStatus::Paused;
        } else {
            if let Err(e) = self.player.play().await {
                if e != PlayerError::AutoplayBlocked {
                    self.status = PlayerStatus::Failed(e.to_string());
                }
                return Err(e.into());
            }
            self.status = PlayerStatus::Playing;
        }
        Ok(())
    }

    pub fn toggle_fullscreen(&mut self) -> Result<(), BrowserError> {
        self.require_playing()?;
        self.player.set_fullscreen(!self.fullscreen)?;
        self.fullscreen = !self.fullscreen;
        Ok(())
    }

    /// Move the volume slider; 0 mutes.
    pub fn set_volume(&mut self, level: u8) -> Result<(), BrowserError> {
        self.volume.set_level(level);
        self.apply_volume()
    }

    pub fn toggle_mute(&mut self) -> Result<(), BrowserError> {
        self.volume.toggle_mute();
        self.apply_volume()
    }

    /// `None` is Auto Quality.
    pub fn select_quality(&mut self, id: Option<u32>) -> Result<(), BrowserError> {
        self.require_playing()?;
        self.player.select_variant(id)?;
        Ok(())
    }

    /// `None` is No Subtitles.
    pub fn select_subtitle(&mut self, id: Option<u32>) -> Result<(), BrowserError> {
        self.require_playing()?;
        self.player.select_text(id)?;
        Ok(())
    }

    /// Close the player panel; fullscreen is reset with it.
    pub async fn close_player(&mut self) {
        self.teardown().await;
        self.fullscreen = false;
    }

    /// Relay a player event to the status line. Events from an earlier
    /// playback, or with no channel open, are dropped.
    pub fn on_player_event(&mut self, tagged: &TaggedEvent) {
        if self.now_playing.is_none() || tagged.generation != self.player.generation() {
            log::debug!("Dropping stale player event: {:?}", tagged);
            return;
        }
        match &tagged.event {
            PlayerEvent::TracksChanged => self.refresh_tracks(),
            PlayerEvent::Error(msg) => log::error!("Player error: {}", msg),
            _ => {}
        }
        self.status = self.status.on_event(&tagged.event);
    }

    /// Close the player, delete the bridge record and reset the session.
    /// Never fails; cleanup errors are logged.
    pub async fn logout<T>(&mut self, state: &AppState<T>) {
        self.close_player().await;
        if let Err(e) = state.bridge.clear() {
            log::warn!("Failed to clear session record: {}", e);
        }
        commands::logout(state).await;
        self.record = None;
        self.packages.clear();
        self.screen = Screen::Packages;
    }

    async fn teardown(&mut self) {
        if self.player.is_loaded() {
            self.player.destroy().await;
        }
        self.now_playing = None;
        self.status = PlayerStatus::Idle;
        self.quality.clear();
        self.subtitles.clear();
    }

    fn refresh_tracks(&mut self) {
        self.quality = quality_options(&self.player.variant_tracks());
        self.subtitles = subtitle_options(&self.player.text_tracks());
    }

    fn apply_volume(&mut self) -> Result<(), BrowserError> {
        if self.now_playing.is_some() {
            self.player.set_volume(&self.volume)?;
        }
        Ok(())
    }

    fn require_playing(&self) -> Result<(), BrowserError> {
        if self.now_playing.is_none() {
            return Err(BrowserError::NothingPlaying);
        }
        Ok(())
    }
}
