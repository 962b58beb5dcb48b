//! Application branding: title, logo and the five-color theme.
//!
//! The baseline is the StreamSauce palette. A hoster's branding from the
//! validation payload is merged over it on login.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::types::HosterBranding;

pub const DEFAULT_TITLE: &str = "StreamSauce";

/// Palettes shorter than this are still applied, but logged.
pub const MIN_PALETTE_COLORS: usize = 3;

/// The five theme color tokens, in palette order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeColors {
    pub primary: String,
    pub secondary: String,
    pub background: String,
    pub dark: String,
    pub gray: String,
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self {
            primary: "#ed254e".to_string(),
            secondary: "#f9dc5c".to_string(),
            background: "#f4fffd".to_string(),
            dark: "#011936".to_string(),
            gray: "#465362".to_string(),
        }
    }
}

/// Live branding and theme state of the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub title: String,
    pub logo: Option<String>,
    pub dark_mode: bool,
    pub colors: ThemeColors,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            logo: None,
            dark_mode: false,
            colors: ThemeColors::default(),
        }
    }
}

impl AppConfig {
    /// Window title for a view, e.g. `"Acme - Packages"`.
    pub fn view_title(&self, view: &str) -> String {
        format!("{} - {}", self.title, view)
    }

    pub fn theme_name(&self) -> &'static str {
        if self.dark_mode {
            "dark"
        } else {
            "light"
        }
    }
}

/// Merge hoster branding over a baseline config.
///
/// Without a hoster the baseline is returned as-is. `dark_mode` always
/// carries over from the baseline. Palette problems never fail the merge.
pub fn merge(baseline: &AppConfig, hoster: Option<&HosterBranding>) -> AppConfig {
    let Some(hoster) = hoster else {
        return baseline.clone();
    };

    AppConfig {
        title: hoster.name.clone(),
        logo: hoster.logo.clone(),
        dark_mode: baseline.dark_mode,
        colors: merge_palette(&baseline.colors, &hoster.color_palette),
    }
}

/// Apply a JSON palette positionally, falling back per field.
fn merge_palette(baseline: &ThemeColors, palette: &str) -> ThemeColors {
    let entries = match serde_json::from_str::<Value>(palette) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) => {
            log::warn!("Color palette is not a JSON array, keeping default colors");
            return baseline.clone();
        }
        Err(e) => {
            log::warn!("Error parsing color palette: {}", e);
            return baseline.clone();
        }
    };

    if entries.len() < MIN_PALETTE_COLORS {
        log::warn!(
            "Color palette has {} of {} expected colors, filling the rest from defaults",
            entries.len(),
            MIN_PALETTE_COLORS
        );
    }

    let pick = |index: usize, fallback: &str| -> String {
        match entries.get(index).and_then(Value::as_str).map(str::trim) {
            Some(color) if is_hex_color(color) => color.to_string(),
            Some(color) => {
                log::warn!("Ignoring malformed palette color {:?} at {}", color, index);
                fallback.to_string()
            }
            None => fallback.to_string(),
        }
    };

    ThemeColors {
        primary: pick(0, &baseline.primary),
        secondary: pick(1, &baseline.secondary),
        background: pick(2, &baseline.background),
        dark: pick(3, &baseline.dark),
        gray: pick(4, &baseline.gray),
    }
}

/// `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`.
pub fn is_hex_color(color: &str) -> bool {
    match color.strip_prefix('#') {
        Some(digits) => {
            matches!(digits.len(), 3 | 4 | 6 | 8) && digits.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

/// Parse a hex color into RGB, expanding the short forms. Alpha is dropped.
pub fn hex_to_rgb(color: &str) -> Option<(u8, u8, u8)> {
    if !is_hex_color(color) {
        return None;
    }
    let digits = &color[1..];
    let expanded: String = match digits.len() {
        3 | 4 => digits.chars().take(3).flat_map(|c| [c, c]).collect(),
        _ => digits[..6].to_string(),
    };
    let bytes = hex::decode(expanded).ok()?;
    Some((bytes[0], bytes[1], bytes[2]))
}
