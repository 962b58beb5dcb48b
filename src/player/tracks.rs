//! Track descriptors reported by the player and the select options built from them.

/// A video variant (bitrate/resolution rendition).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantTrack {
    pub id: u32,
    /// Bits per second.
    pub bandwidth: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// A subtitle / caption track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextTrack {
    pub id: u32,
    pub language: Option<String>,
}

/// One entry of a select control. `id: None` is the Auto / Off entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackOption {
    pub id: Option<u32>,
    pub label: String,
}

pub const AUTO_QUALITY: &str = "Auto Quality";
pub const NO_SUBTITLES: &str = "No Subtitles";

/// `"1920x1080 (5000k)"`, or `"800k"` when the resolution is unknown.
pub fn quality_label(track: &VariantTrack) -> String {
    let kbps = (track.bandwidth as f64 / 1000.0).round() as u64;
    match (track.width, track.height) {
        (Some(w), Some(h)) if h > 0 => format!("{}x{} ({}k)", w, h, kbps),
        _ => format!("{}k", kbps),
    }
}

/// Quality choices, highest bandwidth first, led by Auto.
///
/// Empty when there is nothing to choose between (zero or one variant).
pub fn quality_options(tracks: &[VariantTrack]) -> Vec<TrackOption> {
    if tracks.len() <= 1 {
        return Vec::new();
    }

    let mut sorted: Vec<&VariantTrack> = tracks.iter().collect();
    sorted.sort_by(|a, b| b.bandwidth.cmp(&a.bandwidth));

    let mut options = vec![TrackOption {
        id: None,
        label: AUTO_QUALITY.to_string(),
    }];
    options.extend(sorted.into_iter().map(|t| TrackOption {
        id: Some(t.id),
        label: quality_label(t),
    }));
    options
}

/// Subtitle choices, led by Off. Empty when the stream has no text tracks.
pub fn subtitle_options(tracks: &[TextTrack]) -> Vec<TrackOption> {
    if tracks.is_empty() {
        return Vec::new();
    }

    let mut options = vec![TrackOption {
        id: None,
        label: NO_SUBTITLES.to_string(),
    }];
    options.extend(tracks.iter().map(|t| TrackOption {
        id: Some(t.id),
        label: t
            .language
            .as_deref()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Subtitle {}", t.id)),
    }));
    options
}
