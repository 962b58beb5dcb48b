//! mpv JSON IPC.
//!
//! Commands, replies and events are newline-delimited JSON on the socket mpv
//! opens for `--input-ipc-server` (a Unix socket, or a named pipe on
//! Windows). Each playback gets one session task: it connects, observes the
//! properties the status line and track menus need, and forwards commands
//! queued by the player.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, watch};

use super::process::EventSink;
use super::{PlayerEvent, TextTrack, VariantTrack};

/// mpv creates the socket shortly after start; give it five seconds.
const CONNECT_ATTEMPTS: u32 = 50;
const CONNECT_RETRY: Duration = Duration::from_millis(100);

const OBSERVED: [&str; 3] = ["pause", "paused-for-cache", "track-list"];

static NEXT_SOCKET: AtomicU64 = AtomicU64::new(1);

/// Track lists as last reported by mpv.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tracks {
    pub variants: Vec<VariantTrack>,
    pub texts: Vec<TextTrack>,
}

/// Fresh socket path, unique within this process.
pub fn socket_path() -> PathBuf {
    let name = format!(
        "streamsauce-mpv-{}-{}",
        std::process::id(),
        NEXT_SOCKET.fetch_add(1, Ordering::Relaxed)
    );
    if cfg!(windows) {
        PathBuf::from(format!(r"\\.\pipe\{}", name))
    } else {
        std::env::temp_dir().join(format!("{}.sock", name))
    }
}

pub fn set_property(name: &str, value: Value) -> String {
    json!({ "command": ["set_property", name, value] }).to_string()
}

fn observe_property(id: usize, name: &str) -> String {
    json!({ "command": ["observe_property", id, name] }).to_string()
}

/// One decoded line from mpv.
#[derive(Debug, Clone, PartialEq)]
pub enum IpcMessage {
    Property { name: String, data: Value },
    Event(String),
    /// Command reply; `error` is `"success"` when the command applied.
    Reply { error: String },
}

#[derive(Deserialize)]
struct RawMessage {
    event: Option<String>,
    name: Option<String>,
    #[serde(default)]
    data: Value,
    error: Option<String>,
}

pub fn parse_message(line: &str) -> Option<IpcMessage> {
    let raw: RawMessage = serde_json::from_str(line).ok()?;
    match (raw.event, raw.name, raw.error) {
        (Some(event), Some(name), _) if event == "property-change" => Some(IpcMessage::Property {
            name,
            data: raw.data,
        }),
        (Some(event), _, _) => Some(IpcMessage::Event(event)),
        (None, _, Some(error)) => Some(IpcMessage::Reply { error }),
        _ => None,
    }
}

#[derive(Deserialize)]
struct MpvTrack {
    id: u32,
    #[serde(rename = "type")]
    kind: String,
    lang: Option<String>,
    #[serde(rename = "demux-w")]
    width: Option<u32>,
    #[serde(rename = "demux-h")]
    height: Option<u32>,
    #[serde(rename = "hls-bitrate")]
    hls_bitrate: Option<u64>,
    #[serde(rename = "demux-bitrate")]
    demux_bitrate: Option<u64>,
}

/// Split mpv's `track-list` into video variants and subtitle tracks.
/// Audio tracks are not offered.
pub fn parse_track_list(data: &Value) -> Tracks {
    let entries: Vec<MpvTrack> = match serde_json::from_value(data.clone()) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Unreadable mpv track list: {}", e);
            return Tracks::default();
        }
    };

    let mut tracks = Tracks::default();
    for track in entries {
        match track.kind.as_str() {
            "video" => tracks.variants.push(VariantTrack {
                id: track.id,
                bandwidth: track.hls_bitrate.or(track.demux_bitrate).unwrap_or(0),
                width: track.width,
                height: track.height,
            }),
            "sub" => tracks.texts.push(TextTrack {
                id: track.id,
                language: track.lang,
            }),
            _ => {}
        }
    }
    tracks
}

/// Status event carried by a message, if any.
pub fn status_event(message: &IpcMessage) -> Option<PlayerEvent> {
    match message {
        IpcMessage::Property { name, data } => match (name.as_str(), data.as_bool()) {
            ("pause", Some(true)) => Some(PlayerEvent::Paused),
            ("pause", Some(false)) => Some(PlayerEvent::Playing),
            ("paused-for-cache", Some(true)) => Some(PlayerEvent::Buffering),
            ("paused-for-cache", Some(false)) => Some(PlayerEvent::Playing),
            _ => None,
        },
        IpcMessage::Event(event) if event == "file-loaded" => Some(PlayerEvent::Ready),
        _ => None,
    }
}

/// Drive one IPC session until mpv closes the socket, the command queue is
/// dropped, or the task is aborted.
pub async fn run_session(
    socket: PathBuf,
    mut commands: mpsc::UnboundedReceiver<String>,
    tracks: watch::Sender<Tracks>,
    events: EventSink,
) {
    let stream = match connect_with_retry(&socket).await {
        Ok(stream) => stream,
        Err(e) => {
            log::warn!("mpv IPC unavailable at {}: {}", socket.display(), e);
            return;
        }
    };
    log::debug!("mpv IPC connected: {}", socket.display());

    let (reader, mut writer) = tokio::io::split(stream);
    let mut lines = BufReader::new(reader).lines();

    for (i, name) in OBSERVED.iter().enumerate() {
        if let Err(e) = write_line(&mut writer, &observe_property(i + 1, name)).await {
            log::warn!("Failed to observe mpv property {}: {}", name, e);
            return;
        }
    }

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => handle_line(&line, &tracks, &events),
                Ok(None) => break,
                Err(e) => {
                    log::warn!("mpv IPC read failed: {}", e);
                    break;
                }
            },
            command = commands.recv() => match command {
                Some(command) => {
                    if let Err(e) = write_line(&mut writer, &command).await {
                        log::warn!("mpv IPC write failed: {}", e);
                        break;
                    }
                }
                None => break,
            },
        }
    }

    log::debug!("mpv IPC session closed: {}", socket.display());
}

fn handle_line(line: &str, tracks: &watch::Sender<Tracks>, events: &EventSink) {
    let Some(message) = parse_message(line) else {
        log::debug!("Ignoring mpv line: {}", line);
        return;
    };

    match &message {
        IpcMessage::Property { name, data } if name == "track-list" => {
            tracks.send_replace(parse_track_list(data));
            events.send(PlayerEvent::TracksChanged);
        }
        IpcMessage::Reply { error } if error != "success" => {
            log::warn!("mpv rejected a command: {}", error);
        }
        _ => {}
    }

    if let Some(event) = status_event(&message) {
        events.send(event);
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> io::Result<()> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

async fn connect_with_retry(socket: &Path) -> io::Result<impl AsyncRead + AsyncWrite> {
    let mut attempt = 1;
    loop {
        match connect(socket).await {
            Ok(stream) => return Ok(stream),
            Err(e) if attempt >= CONNECT_ATTEMPTS => return Err(e),
            Err(_) => {
                attempt += 1;
                tokio::time::sleep(CONNECT_RETRY).await;
            }
        }
    }
}

#[cfg(unix)]
async fn connect(socket: &Path) -> io::Result<tokio::net::UnixStream> {
    tokio::net::UnixStream::connect(socket).await
}

#[cfg(windows)]
async fn connect(socket: &Path) -> io::Result<tokio::net::windows::named_pipe::NamedPipeClient> {
    tokio::net::windows::named_pipe::ClientOptions::new().open(socket)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::TaggedEvent;

    #[test]
    fn test_set_property_line() {
        let line = set_property("pause", json!(true));
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value, json!({ "command": ["set_property", "pause", true] }));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_parse_messages() {
        assert_eq!(
            parse_message(r#"{"event":"property-change","id":1,"name":"pause","data":false}"#),
            Some(IpcMessage::Property {
                name: "pause".to_string(),
                data: json!(false)
            })
        );
        assert_eq!(
            parse_message(r#"{"event":"file-loaded"}"#),
            Some(IpcMessage::Event("file-loaded".to_string()))
        );
        assert_eq!(
            parse_message(r#"{"request_id":0,"error":"success","data":null}"#),
            Some(IpcMessage::Reply {
                error: "success".to_string()
            })
        );
        assert_eq!(parse_message("not json"), None);
        assert_eq!(parse_message("{}"), None);
    }

    #[test]
    fn test_parse_track_list() {
        let data = json!([
            {"id": 1, "type": "video", "demux-w": 1920, "demux-h": 1080, "hls-bitrate": 5000000, "selected": true},
            {"id": 2, "type": "video", "demux-w": 640, "demux-h": 360, "demux-bitrate": 800000},
            {"id": 1, "type": "audio", "lang": "en"},
            {"id": 1, "type": "sub", "lang": "es"},
            {"id": 2, "type": "sub"}
        ]);
        let tracks = parse_track_list(&data);

        assert_eq!(
            tracks.variants,
            vec![
                VariantTrack { id: 1, bandwidth: 5_000_000, width: Some(1920), height: Some(1080) },
                VariantTrack { id: 2, bandwidth: 800_000, width: Some(640), height: Some(360) },
            ]
        );
        assert_eq!(
            tracks.texts,
            vec![
                TextTrack { id: 1, language: Some("es".to_string()) },
                TextTrack { id: 2, language: None },
            ]
        );
        assert_eq!(parse_track_list(&json!("garbage")), Tracks::default());
    }

    #[test]
    fn test_status_events() {
        let property = |name: &str, data: Value| IpcMessage::Property {
            name: name.to_string(),
            data,
        };
        assert_eq!(status_event(&property("pause", json!(true))), Some(PlayerEvent::Paused));
        assert_eq!(status_event(&property("pause", json!(false))), Some(PlayerEvent::Playing));
        assert_eq!(
            status_event(&property("paused-for-cache", json!(true))),
            Some(PlayerEvent::Buffering)
        );
        assert_eq!(status_event(&property("track-list", json!([]))), None);
        assert_eq!(
            status_event(&IpcMessage::Event("file-loaded".to_string())),
            Some(PlayerEvent::Ready)
        );
        assert_eq!(status_event(&IpcMessage::Event("seek".to_string())), None);
    }

    #[test]
    fn test_socket_paths_are_unique() {
        assert_ne!(socket_path(), socket_path());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_session_observes_and_forwards() {
        use tokio::net::UnixListener;

        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("mpv.sock");
        let listener = UnixListener::bind(&socket).unwrap();

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (tracks_tx, mut tracks_rx) = watch::channel(Tracks::default());
        let session = tokio::spawn(run_session(
            socket.clone(),
            commands_rx,
            tracks_tx,
            EventSink::new(7, events_tx),
        ));

        let (stream, _) = listener.accept().await.unwrap();
        let (reader, mut writer) = tokio::io::split(stream);
        let mut lines = BufReader::new(reader).lines();

        for name in OBSERVED {
            let line = lines.next_line().await.unwrap().unwrap();
            assert!(line.contains("observe_property") && line.contains(name), "{}", line);
        }

        writer
            .write_all(
                concat!(
                    r#"{"event":"property-change","id":3,"name":"track-list","data":[{"id":4,"type":"sub","lang":"fr"}]}"#,
                    "\n",
                    r#"{"event":"property-change","id":2,"name":"paused-for-cache","data":true}"#,
                    "\n"
                )
                .as_bytes(),
            )
            .await
            .unwrap();

        assert_eq!(
            events_rx.recv().await,
            Some(TaggedEvent { generation: 7, event: PlayerEvent::TracksChanged })
        );
        assert_eq!(
            events_rx.recv().await,
            Some(TaggedEvent { generation: 7, event: PlayerEvent::Buffering })
        );
        tracks_rx.changed().await.unwrap();
        assert_eq!(tracks_rx.borrow().texts[0].language.as_deref(), Some("fr"));

        commands_tx.send(set_property("sid", json!(4))).unwrap();
        let forwarded = lines.next_line().await.unwrap().unwrap();
        assert_eq!(forwarded, set_property("sid", json!(4)));

        drop(writer);
        drop(lines);
        session.await.unwrap();
    }
}
