//! Terminal rendering of the two views.
//!
//! Screens are built as strings so the shell can print them and tests can
//! inspect them. Theme colors are mapped to the nearest 256-color entry.

use console::{style, Style, Term};

use super::browser::{BrowserController, Screen};
use super::login::SubmitOutcome;
use crate::branding::{hex_to_rgb, AppConfig};
use crate::player::ExternalPlayer;

pub const LOGIN_HELP: &str = "Enter your subscription key, or :quit";

pub const BROWSER_HELP: &str = "\
  <n>          open package / play channel n
  b            back to packages
  r            refresh packages
  p            play / pause
  v <0-100>    volume
  m            mute / unmute
  f            fullscreen
  q <n|auto>   quality
  s <n|off>    subtitles
  x            close player
  d            toggle dark mode
  logout       log out
  :quit        exit";

/// Nearest xterm-256 color-cube index for an RGB triple.
pub fn rgb_to_ansi256(r: u8, g: u8, b: u8) -> u8 {
    let level = |c: u8| -> u8 {
        if c < 48 {
            0
        } else if c < 115 {
            1
        } else {
            (c - 35) / 40
        }
    };
    16 + 36 * level(r) + 6 * level(g) + level(b)
}

fn color(hex: &str) -> Style {
    match hex_to_rgb(hex) {
        Some((r, g, b)) => Style::new().color256(rgb_to_ansi256(r, g, b)),
        None => Style::new(),
    }
}

fn accent(config: &AppConfig) -> Style {
    color(&config.colors.primary).bold()
}

fn muted(config: &AppConfig) -> Style {
    if config.dark_mode {
        color(&config.colors.background)
    } else {
        color(&config.colors.gray)
    }
}

/// Set the terminal title to `"<title> - <view>"`.
pub fn set_window_title(term: &Term, config: &AppConfig, view: &str) {
    term.set_title(config.view_title(view));
}

fn header(config: &AppConfig, view: &str) -> String {
    let mut out = format!("{}", accent(config).apply_to(config.view_title(view)));
    if let Some(logo) = &config.logo {
        out.push_str(&format!("  {}", muted(config).apply_to(logo)));
    }
    if config.dark_mode {
        out.push_str(&format!("  {}", muted(config).apply_to(format!("[{}]", config.theme_name()))));
    }
    out
}

pub fn login_screen(config: &AppConfig, last: Option<&SubmitOutcome>) -> String {
    let mut lines = vec![header(config, super::login::VIEW_NAME), String::new()];
    match last {
        Some(SubmitOutcome::Failed(e)) => lines.push(format!("{}", style(e).red())),
        Some(SubmitOutcome::Busy) => lines.push("Validating...".to_string()),
        _ => {}
    }
    lines.push(format!("{}", muted(config).apply_to(LOGIN_HELP)));
    lines.join("\n")
}

pub fn browser_screen<P: ExternalPlayer>(browser: &BrowserController<P>, config: &AppConfig) -> String {
    let mut lines = vec![header(config, super::browser::VIEW_NAME)];

    if let Some(user) = browser.user() {
        let mut badge = format!("{} {}", style(user.initial()).reverse(), user.display_name());
        if let Some(sub) = browser.subscription() {
            badge.push_str(&format!(
                "  {}",
                muted(config).apply_to(format!("{} to {}", sub.started_label(), sub.end_label()))
            ));
        }
        lines.push(badge);
    }
    lines.push(String::new());

    if let Some(err) = browser.catalog_error() {
        lines.push(format!("{}", style(err).red()));
        lines.push("Press r to retry".to_string());
    } else {
        match browser.screen() {
            Screen::Packages => {
                if browser.packages().is_empty() {
                    lines.push("No packages available".to_string());
                }
                for (i, package) in browser.packages().iter().enumerate() {
                    lines.push(format!(
                        "{:>3}. {} {}",
                        i + 1,
                        package.name,
                        muted(config).apply_to(format!("({} channels)", package.channels.len()))
                    ));
                }
            }
            Screen::Channels(_) => {
                if let Some(package) = browser.current_package() {
                    lines.push(format!("{}", style(&package.name).bold()));
                    for (i, channel) in package.channels.iter().enumerate() {
                        let marker = match browser.now_playing() {
                            Some(now) if now.id == channel.id => "▶",
                            _ => " ",
                        };
                        lines.push(format!("{} {:>3}. {}", marker, i + 1, channel.name));
                    }
                }
            }
        }
    }

    if let Some(channel) = browser.now_playing() {
        lines.push(String::new());
        lines.push(format!("{} {}", accent(config).apply_to("Now playing:"), channel.name));
        let status = browser.status().label();
        if !status.is_empty() {
            lines.push(status);
        }
        let volume = browser.volume();
        let mut controls = format!("{} {}", volume.icon(), volume.level());
        if browser.is_fullscreen() {
            controls.push_str("  [fullscreen]");
        }
        lines.push(controls);
        if !browser.quality_options().is_empty() {
            let labels: Vec<String> = browser
                .quality_options()
                .iter()
                .enumerate()
                .map(|(i, o)| if o.id.is_none() { o.label.clone() } else { format!("{}={}", i, o.label) })
                .collect();
            lines.push(format!("Quality: {}", labels.join(", ")));
        }
        if !browser.subtitle_options().is_empty() {
            let labels: Vec<String> = browser
                .subtitle_options()
                .iter()
                .enumerate()
                .map(|(i, o)| if o.id.is_none() { o.label.clone() } else { format!("{}={}", i, o.label) })
                .collect();
            lines.push(format!("Subtitles: {}", labels.join(", ")));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_ansi256() {
        assert_eq!(rgb_to_ansi256(0, 0, 0), 16);
        assert_eq!(rgb_to_ansi256(255, 255, 255), 231);
        assert_eq!(rgb_to_ansi256(255, 0, 0), 196);
    }

    #[test]
    fn test_login_screen_shows_error_and_title() {
        let config = AppConfig::default();
        let failed = SubmitOutcome::Failed(crate::commands::CommandError::EmptyKey);
        let screen = console::strip_ansi_codes(&login_screen(&config, Some(&failed))).to_string();
        assert!(screen.starts_with("StreamSauce - Login"));
        assert!(screen.contains("Please enter a valid subscription key"));
    }

    #[test]
    fn test_header_marks_dark_mode() {
        let config = AppConfig {
            dark_mode: true,
            ..AppConfig::default()
        };
        let screen = console::strip_ansi_codes(&login_screen(&config, None)).to_string();
        assert!(screen.contains("[dark]"));
    }
}
