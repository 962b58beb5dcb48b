//! `ExternalPlayer` backed by a desktop player process (mpv or ffplay).
//!
//! The child is spawned on `play` and owned by a watcher task that reports
//! its exit on the event channel. `destroy` signals the watcher, which kills
//! the child, and waits for it to finish. mpv is also driven over its JSON
//! IPC socket (pause, volume, fullscreen, track selection); ffplay only takes
//! settings at launch.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde_json::{json, Value};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::ipc::{self, Tracks};
use super::{
    ExternalPlayer, PlaybackRequest, PlayerError, PlayerEvent, TaggedEvent, TextTrack,
    VariantTrack, Volume,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerKind {
    Mpv,
    Ffplay,
}

impl PlayerKind {
    /// Anything that is not ffplay is driven with mpv flags.
    pub fn from_program(program: &str) -> Self {
        let stem = Path::new(program)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(program)
            .to_lowercase();
        if stem.contains("ffplay") {
            PlayerKind::Ffplay
        } else {
            PlayerKind::Mpv
        }
    }
}

/// Settings applied when the process starts.
#[derive(Debug, Clone, Default)]
pub struct Launch {
    pub volume: Volume,
    pub fullscreen: bool,
    /// mpv only.
    pub ipc_socket: Option<PathBuf>,
}

/// Command line for one playback.
pub fn build_args(kind: PlayerKind, request: &PlaybackRequest, launch: &Launch) -> Vec<String> {
    let volume = &launch.volume;
    let mut args = Vec::new();

    match kind {
        PlayerKind::Mpv => {
            args.push(request.manifest_url.clone());
            args.push(format!("--title={}", request.title));
            args.push("--force-window=immediate".to_string());
            if let Some(clear_key) = &request.clear_key {
                args.push(format!("--demuxer-lavf-o=cenc_decryption_key={}", clear_key.key));
            }
            args.push(format!("--volume={}", volume.level()));
            if volume.is_muted() {
                args.push("--mute=yes".to_string());
            }
            if launch.fullscreen {
                args.push("--fs".to_string());
            }
            if let Some(socket) = &launch.ipc_socket {
                args.push(format!("--input-ipc-server={}", socket.display()));
            }
        }
        PlayerKind::Ffplay => {
            // ffplay demuxer options must precede the input
            if let Some(clear_key) = &request.clear_key {
                args.push("-cenc_decryption_key".to_string());
                args.push(clear_key.key.clone());
            }
            args.push("-window_title".to_string());
            args.push(request.title.clone());
            args.push("-autoexit".to_string());
            args.push("-volume".to_string());
            let level = if volume.is_muted() { 0 } else { volume.level() };
            args.push(level.to_string());
            if launch.fullscreen {
                args.push("-fs".to_string());
            }
            args.push(request.manifest_url.clone());
        }
    }

    args
}

/// Event sender for one playback; stamps every event with its generation.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<TaggedEvent>,
}

impl EventSink {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<TaggedEvent>) -> Self {
        Self { generation, tx }
    }

    pub fn send(&self, event: PlayerEvent) {
        // Receiver gone means the view has shut down.
        let _ = self.tx.send(TaggedEvent {
            generation: self.generation,
            event,
        });
    }
}

struct MpvControl {
    commands: mpsc::UnboundedSender<String>,
    tracks: watch::Receiver<Tracks>,
    session: JoinHandle<()>,
    socket: PathBuf,
}

impl MpvControl {
    fn start(socket: PathBuf, events: EventSink) -> Self {
        let (commands, queue) = mpsc::unbounded_channel();
        let (tracks_tx, tracks) = watch::channel(Tracks::default());
        let session = tokio::spawn(ipc::run_session(socket.clone(), queue, tracks_tx, events));
        Self {
            commands,
            tracks,
            session,
            socket,
        }
    }

    fn set(&self, name: &str, value: Value) -> Result<(), PlayerError> {
        self.commands
            .send(ipc::set_property(name, value))
            .map_err(|_| PlayerError::Playback("Lost control of the player".to_string()))
    }

    async fn close(self) {
        self.session.abort();
        let _ = self.session.await;
        if cfg!(unix) {
            if let Err(e) = tokio::fs::remove_file(&self.socket).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::debug!("Failed to remove {}: {}", self.socket.display(), e);
                }
            }
        }
    }
}

struct ActiveProcess {
    kill_tx: oneshot::Sender<()>,
    watcher: JoinHandle<()>,
    control: Option<MpvControl>,
}

pub struct ProcessPlayer {
    program: String,
    kind: PlayerKind,
    events: mpsc::UnboundedSender<TaggedEvent>,
    generation: u64,
    request: Option<PlaybackRequest>,
    process: Option<ActiveProcess>,
    volume: Volume,
    fullscreen: bool,
}

impl ProcessPlayer {
    pub fn new(program: &str, events: mpsc::UnboundedSender<TaggedEvent>) -> Self {
        Self {
            program: program.to_string(),
            kind: PlayerKind::from_program(program),
            events,
            generation: 0,
            request: None,
            process: None,
            volume: Volume::default(),
            fullscreen: false,
        }
    }

    fn spawn(&self, request: &PlaybackRequest, launch: &Launch) -> Result<Child, PlayerError> {
        let args = build_args(self.kind, request, launch);
        log::info!("Launching {} for {}", self.program, request.title);
        log::debug!("Manifest: {}", request.manifest_url);

        Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PlayerError::Launch(format!("{}: {}", self.program, e)))
    }

    fn is_running(&self) -> bool {
        self.process
            .as_ref()
            .is_some_and(|p| !p.watcher.is_finished())
    }

    fn control(&self) -> Option<&MpvControl> {
        self.process.as_ref().and_then(|p| p.control.as_ref())
    }

    async fn stop_process(&mut self) {
        if let Some(process) = self.process.take() {
            // The watcher may already have exited; a closed channel is fine.
            let _ = process.kill_tx.send(());
            if let Err(e) = process.watcher.await {
                log::warn!("Player watcher task failed: {}", e);
            }
            if let Some(control) = process.control {
                control.close().await;
            }
        }
    }
}

async fn watch_child(mut child: Child, mut kill_rx: oneshot::Receiver<()>, events: EventSink) {
    let exited = tokio::select! {
        status = child.wait() => Some(status),
        _ = &mut kill_rx => None,
    };

    let event = match exited {
        Some(Ok(status)) if status.success() => PlayerEvent::Ended,
        Some(Ok(status)) => PlayerEvent::Error(format!("player exited with {}", status)),
        Some(Err(e)) => PlayerEvent::Error(e.to_string()),
        None => {
            if let Err(e) = child.kill().await {
                log::warn!("Failed to stop player process: {}", e);
            }
            return;
        }
    };

    events.send(event);
}

impl ExternalPlayer for ProcessPlayer {
    async fn load(&mut self, request: &PlaybackRequest) -> Result<(), PlayerError> {
        self.stop_process().await;
        self.generation += 1;
        if request.manifest_url.trim().is_empty() {
            return Err(PlayerError::Playback(format!("{} has no stream URL", request.title)));
        }
        if let Some(clear_key) = &request.clear_key {
            log::debug!("Clear key {} configured for {}", clear_key.key_id, request.title);
        }
        self.request = Some(request.clone());
        Ok(())
    }

    async fn destroy(&mut self) {
        self.stop_process().await;
        self.request = None;
    }

    fn is_loaded(&self) -> bool {
        self.request.is_some()
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    async fn play(&mut self) -> Result<(), PlayerError> {
        let request = self.request.clone().ok_or(PlayerError::NotLoaded)?;
        if self.is_running() {
            return match self.control() {
                Some(control) => control.set("pause", json!(false)),
                None => Ok(()),
            };
        }
        self.stop_process().await;
        self.generation += 1;

        let sink = EventSink::new(self.generation, self.events.clone());
        let launch = Launch {
            volume: self.volume,
            fullscreen: self.fullscreen,
            ipc_socket: (self.kind == PlayerKind::Mpv).then(ipc::socket_path),
        };
        let child = self.spawn(&request, &launch)?;
        let (kill_tx, kill_rx) = oneshot::channel();
        let watcher = tokio::spawn(watch_child(child, kill_rx, sink.clone()));
        let control = launch
            .ipc_socket
            .map(|socket| MpvControl::start(socket, sink.clone()));
        self.process = Some(ActiveProcess {
            kill_tx,
            watcher,
            control,
        });

        sink.send(PlayerEvent::Playing);
        Ok(())
    }

    fn set_paused(&mut self, paused: bool) -> Result<(), PlayerError> {
        match self.control() {
            Some(control) => control.set("pause", json!(paused)),
            None if paused && self.is_running() => Err(PlayerError::Unsupported("Pausing")),
            None => Ok(()),
        }
    }

    fn set_volume(&mut self, volume: &Volume) -> Result<(), PlayerError> {
        self.volume = *volume;
        match self.control() {
            Some(control) => {
                control.set("volume", json!(volume.level()))?;
                control.set("mute", json!(volume.is_muted()))
            }
            // Without IPC the level applies at the next launch.
            None => Ok(()),
        }
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<(), PlayerError> {
        match self.control() {
            Some(control) => control.set("fullscreen", json!(fullscreen))?,
            None if self.is_running() => {
                return Err(PlayerError::Unsupported("Switching fullscreen during playback"))
            }
            None => {}
        }
        self.fullscreen = fullscreen;
        Ok(())
    }

    fn variant_tracks(&self) -> Vec<VariantTrack> {
        self.control()
            .map(|c| c.tracks.borrow().variants.clone())
            .unwrap_or_default()
    }

    fn text_tracks(&self) -> Vec<TextTrack> {
        self.control()
            .map(|c| c.tracks.borrow().texts.clone())
            .unwrap_or_default()
    }

    fn select_variant(&mut self, id: Option<u32>) -> Result<(), PlayerError> {
        match (self.control(), id) {
            (Some(control), Some(id)) => control.set("vid", json!(id)),
            (Some(control), None) => control.set("vid", json!("auto")),
            (None, None) => Ok(()),
            (None, Some(_)) => Err(PlayerError::Unsupported("Quality selection")),
        }
    }

    fn select_text(&mut self, id: Option<u32>) -> Result<(), PlayerError> {
        match (self.control(), id) {
            (Some(control), Some(id)) => control.set("sid", json!(id)),
            (Some(control), None) => control.set("sid", json!("no")),
            (None, None) => Ok(()),
            (None, Some(_)) => Err(PlayerError::Unsupported("Subtitle selection")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::ClearKey;

    fn request(with_key: bool) -> PlaybackRequest {
        PlaybackRequest {
            title: "Arena".to_string(),
            manifest_url: "https://cdn.example/arena.mpd".to_string(),
            clear_key: with_key.then(|| ClearKey {
                key_id: "kid".to_string(),
                key: "00112233".to_string(),
            }),
        }
    }

    fn launch(level: u8) -> Launch {
        Launch {
            volume: Volume::new(level),
            ..Launch::default()
        }
    }

    #[test]
    fn test_kind_from_program() {
        assert_eq!(PlayerKind::from_program("mpv"), PlayerKind::Mpv);
        assert_eq!(PlayerKind::from_program("/usr/bin/ffplay"), PlayerKind::Ffplay);
        assert_eq!(PlayerKind::from_program("C:\\ffmpeg\\bin\\FFPLAY.exe"), PlayerKind::Ffplay);
        assert_eq!(PlayerKind::from_program("vlc"), PlayerKind::Mpv);
    }

    #[test]
    fn test_mpv_args() {
        let args = build_args(PlayerKind::Mpv, &request(true), &launch(60));
        assert_eq!(args[0], "https://cdn.example/arena.mpd");
        assert!(args.contains(&"--title=Arena".to_string()));
        assert!(args.contains(&"--demuxer-lavf-o=cenc_decryption_key=00112233".to_string()));
        assert!(args.contains(&"--volume=60".to_string()));
        assert!(!args.contains(&"--mute=yes".to_string()));
        assert!(!args.contains(&"--fs".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--input-ipc-server")));
    }

    #[test]
    fn test_mpv_args_without_key_muted() {
        let args = build_args(PlayerKind::Mpv, &request(false), &launch(0));
        assert!(!args.iter().any(|a| a.contains("cenc_decryption_key")));
        assert!(args.contains(&"--mute=yes".to_string()));
    }

    #[test]
    fn test_mpv_args_fullscreen_and_ipc() {
        let launch = Launch {
            fullscreen: true,
            ipc_socket: Some(PathBuf::from("/tmp/player.sock")),
            ..Launch::default()
        };
        let args = build_args(PlayerKind::Mpv, &request(false), &launch);
        assert!(args.contains(&"--fs".to_string()));
        assert!(args.contains(&"--input-ipc-server=/tmp/player.sock".to_string()));
    }

    #[test]
    fn test_ffplay_args() {
        let args = build_args(PlayerKind::Ffplay, &request(true), &launch(30));
        assert_eq!(&args[0..2], &["-cenc_decryption_key".to_string(), "00112233".to_string()]);
        assert_eq!(args.last().map(String::as_str), Some("https://cdn.example/arena.mpd"));
        let volume_at = args.iter().position(|a| a == "-volume").unwrap();
        assert_eq!(args[volume_at + 1], "30");
        assert!(!args.contains(&"-fs".to_string()));

        let fullscreen = Launch {
            fullscreen: true,
            ..Launch::default()
        };
        let args = build_args(PlayerKind::Ffplay, &request(false), &fullscreen);
        assert!(args.contains(&"-fs".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://cdn.example/arena.mpd"));
    }

    #[tokio::test]
    async fn test_play_requires_load() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut player = ProcessPlayer::new("mpv", tx);
        assert!(!player.is_loaded());
        assert_eq!(player.play().await, Err(PlayerError::NotLoaded));
    }

    #[tokio::test]
    async fn test_empty_manifest_rejected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut player = ProcessPlayer::new("mpv", tx);
        let mut bad = request(false);
        bad.manifest_url = " ".to_string();
        assert!(matches!(player.load(&bad).await, Err(PlayerError::Playback(_))));
        assert!(!player.is_loaded());
    }

    #[tokio::test]
    async fn test_missing_program_is_launch_error() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut player = ProcessPlayer::new("streamsauce-no-such-player", tx);
        player.load(&request(false)).await.unwrap();
        assert!(matches!(player.play().await, Err(PlayerError::Launch(_))));
        player.destroy().await;
        assert!(!player.is_loaded());
    }

    #[tokio::test]
    async fn test_generation_advances_per_load() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut player = ProcessPlayer::new("ffplay", tx);
        assert_eq!(player.generation(), 0);
        player.load(&request(false)).await.unwrap();
        assert_eq!(player.generation(), 1);
        player.destroy().await;
        player.load(&request(true)).await.unwrap();
        assert_eq!(player.generation(), 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_is_reported() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut player = ProcessPlayer::new("true", tx);
        player.load(&request(false)).await.unwrap();
        player.play().await.unwrap();
        let generation = player.generation();

        let first = rx.recv().await.unwrap();
        assert_eq!(first, TaggedEvent { generation, event: PlayerEvent::Playing });
        let second = rx.recv().await.unwrap();
        assert_eq!(second, TaggedEvent { generation, event: PlayerEvent::Ended });
        player.destroy().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_exit_is_error() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut player = ProcessPlayer::new("false", tx);
        player.load(&request(false)).await.unwrap();
        player.play().await.unwrap();

        assert_eq!(rx.recv().await.map(|e| e.event), Some(PlayerEvent::Playing));
        assert!(matches!(rx.recv().await.map(|e| e.event), Some(PlayerEvent::Error(_))));
        player.destroy().await;
    }

    #[test]
    fn test_controls_without_a_process() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut player = ProcessPlayer::new("mpv", tx);
        assert!(player.variant_tracks().is_empty());
        assert!(player.text_tracks().is_empty());
        assert!(player.select_variant(None).is_ok());
        assert!(player.select_variant(Some(1)).is_err());
        assert!(player.select_text(None).is_ok());
        assert!(player.set_paused(false).is_ok());
        assert!(player.set_paused(true).is_ok());

        // Stored for the next launch.
        assert!(player.set_fullscreen(true).is_ok());
        assert!(player.fullscreen);
        assert!(player.set_volume(&Volume::new(20)).is_ok());
        assert_eq!(player.volume.level(), 20);
    }
}
