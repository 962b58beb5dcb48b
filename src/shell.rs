//! Interactive terminal shell hosting the login and browser views.
//!
//! One user action is processed at a time. The browser view also wakes on
//! player events and on config changes published by the session store.

use std::io;

use console::Term;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;

use crate::api::LicenseTransport;
use crate::commands;
use crate::config::Settings;
use crate::player::{ExternalPlayer, ProcessPlayer, TaggedEvent};
use crate::state::AppState;
use crate::views::render;
use crate::views::{BrowserController, LoginController, SubmitOutcome, View};

/// A parsed browser-view input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserCommand {
    /// One-based list position: a package on the package list, a channel on
    /// the channel list.
    Select(usize),
    Back,
    Refresh,
    PlayPause,
    Volume(u8),
    Mute,
    Fullscreen,
    /// Position in the quality option list; `None` is Auto.
    Quality(Option<usize>),
    /// Position in the subtitle option list; `None` is Off.
    Subtitle(Option<usize>),
    Close,
    DarkMode,
    Logout,
    Help,
    Quit,
}

pub fn parse_browser_command(line: &str) -> Result<BrowserCommand, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err("Type h for help".to_string());
    };
    let arg = words.next();

    let position = |arg: Option<&str>, off: &str| -> Result<Option<usize>, String> {
        match arg {
            Some(a) if a.eq_ignore_ascii_case(off) => Ok(None),
            Some(a) => a
                .parse::<usize>()
                .map(Some)
                .map_err(|_| format!("Expected a number or '{}'", off)),
            None => Err(format!("Expected a number or '{}'", off)),
        }
    };

    let command = match head {
        "b" => BrowserCommand::Back,
        "r" => BrowserCommand::Refresh,
        "p" => BrowserCommand::PlayPause,
        "m" => BrowserCommand::Mute,
        "f" => BrowserCommand::Fullscreen,
        "x" => BrowserCommand::Close,
        "d" => BrowserCommand::DarkMode,
        "h" | "help" => BrowserCommand::Help,
        "logout" => BrowserCommand::Logout,
        ":quit" | ":q" => BrowserCommand::Quit,
        "v" => {
            let level = arg
                .and_then(|a| a.parse::<u8>().ok())
                .filter(|l| *l <= 100)
                .ok_or_else(|| "Volume must be 0-100".to_string())?;
            BrowserCommand::Volume(level)
        }
        "q" => BrowserCommand::Quality(position(arg, "auto")?),
        "s" => BrowserCommand::Subtitle(position(arg, "off")?),
        other => match other.parse::<usize>() {
            Ok(n) if n > 0 => BrowserCommand::Select(n),
            _ => return Err(format!("Unknown command: {}", other)),
        },
    };
    Ok(command)
}

enum BrowserExit {
    Logout,
    Quit,
}

type Input = Lines<BufReader<Stdin>>;

/// Run the shell until the user quits or stdin closes.
pub async fn run<T: LicenseTransport>(
    state: AppState<T>,
    settings: &Settings,
    mut preset_key: Option<String>,
    mut resume: bool,
) -> io::Result<()> {
    let term = Term::stdout();
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    let mut view = View::Login;
    loop {
        view = match view {
            View::Login => {
                let logged_in =
                    login_view(&state, &term, &mut input, preset_key.take(), resume).await?;
                resume = false;
                if !logged_in {
                    break;
                }
                View::Browser
            }
            View::Browser => {
                let player = ProcessPlayer::new(&settings.player, events_tx.clone());
                match browser_view(&state, &term, &mut input, &mut events_rx, player).await? {
                    BrowserExit::Logout => View::Login,
                    BrowserExit::Quit => break,
                }
            }
        };
    }

    log::info!("Shell exiting");
    Ok(())
}

fn prompt(term: &Term) -> io::Result<()> {
    term.write_str("> ")?;
    term.flush()
}

/// Returns `true` once logged in, `false` when the user quits.
async fn login_view<T: LicenseTransport>(
    state: &AppState<T>,
    term: &Term,
    input: &mut Input,
    preset_key: Option<String>,
    resume: bool,
) -> io::Result<bool> {
    let login = LoginController::new();
    let mut last: Option<SubmitOutcome> = None;

    if resume {
        if let Some(outcome) = login.resume(state).await {
            if matches!(outcome, SubmitOutcome::LoggedIn(_)) {
                return Ok(true);
            }
            last = Some(outcome);
        }
    }
    if let Some(key) = preset_key {
        let outcome = login.submit(state, &key).await;
        if matches!(outcome, SubmitOutcome::LoggedIn(_)) {
            return Ok(true);
        }
        last = Some(outcome);
    }

    loop {
        let config = commands::get_app_config(state).await;
        render::set_window_title(term, &config, View::Login.name());
        term.write_line(&render::login_screen(&config, last.as_ref()))?;
        prompt(term)?;

        let Some(line) = input.next_line().await? else {
            return Ok(false);
        };
        match line.trim() {
            ":quit" | ":q" => return Ok(false),
            ":dark" => {
                commands::toggle_dark_mode(state).await;
                last = None;
            }
            key => {
                let outcome = login.submit(state, key).await;
                if matches!(outcome, SubmitOutcome::LoggedIn(_)) {
                    return Ok(true);
                }
                last = Some(outcome);
            }
        }
    }
}

async fn browser_view<T: LicenseTransport, P: ExternalPlayer>(
    state: &AppState<T>,
    term: &Term,
    input: &mut Input,
    events: &mut mpsc::UnboundedReceiver<TaggedEvent>,
    player: P,
) -> io::Result<BrowserExit> {
    // Events from a previous view's player are stale.
    while events.try_recv().is_ok() {}

    let mut config_rx = state.session.subscribe();
    let mut browser = BrowserController::new(player);
    browser.start(state).await;
    let mut notice: Option<String> = None;

    loop {
        let config = config_rx.borrow_and_update().clone();
        render::set_window_title(term, &config, View::Browser.name());
        term.write_line(&render::browser_screen(&browser, &config))?;
        if let Some(msg) = notice.take() {
            term.write_line(&msg)?;
        }
        prompt(term)?;

        tokio::select! {
            line = input.next_line() => {
                let Some(line) = line? else {
                    browser.close_player().await;
                    return Ok(BrowserExit::Quit);
                };
                let command = match parse_browser_command(&line) {
                    Ok(command) => command,
                    Err(msg) => {
                        notice = Some(msg);
                        continue;
                    }
                };
                match handle_command(state, &mut browser, command).await {
                    Ok(Some(exit)) => return Ok(exit),
                    Ok(None) => {}
                    Err(msg) => notice = Some(msg),
                }
            }
            Some(event) = events.recv() => {
                term.write_line("")?;
                browser.on_player_event(&event);
            }
            Ok(()) = config_rx.changed() => {
                term.write_line("")?;
            }
        }
    }
}

async fn handle_command<T: LicenseTransport, P: ExternalPlayer>(
    state: &AppState<T>,
    browser: &mut BrowserController<P>,
    command: BrowserCommand,
) -> Result<Option<BrowserExit>, String> {
    let result = match command {
        BrowserCommand::Select(n) => {
            let index = n - 1;
            if browser.current_package().is_some() {
                browser.play_channel(index).await
            } else {
                browser.open_package(index).map(|_| ())
            }
        }
        BrowserCommand::Back => {
            browser.back();
            Ok(())
        }
        BrowserCommand::Refresh => {
            browser.refresh(state).await;
            Ok(())
        }
        BrowserCommand::PlayPause => browser.toggle_play().await,
        BrowserCommand::Volume(level) => browser.set_volume(level),
        BrowserCommand::Mute => browser.toggle_mute(),
        BrowserCommand::Fullscreen => browser.toggle_fullscreen(),
        BrowserCommand::Quality(pick) => {
            let id = pick_option(browser.quality_options(), pick)?;
            browser.select_quality(id)
        }
        BrowserCommand::Subtitle(pick) => {
            let id = pick_option(browser.subtitle_options(), pick)?;
            browser.select_subtitle(id)
        }
        BrowserCommand::Close => {
            browser.close_player().await;
            Ok(())
        }
        BrowserCommand::DarkMode => {
            commands::toggle_dark_mode(state).await;
            Ok(())
        }
        BrowserCommand::Logout => {
            browser.logout(state).await;
            return Ok(Some(BrowserExit::Logout));
        }
        BrowserCommand::Help => return Err(render::BROWSER_HELP.to_string()),
        BrowserCommand::Quit => {
            browser.close_player().await;
            return Ok(Some(BrowserExit::Quit));
        }
    };
    result.map(|()| None).map_err(|e| e.to_string())
}

/// Map a list position to a track id. `None` (Auto / Off) is always valid.
fn pick_option(
    options: &[crate::player::TrackOption],
    pick: Option<usize>,
) -> Result<Option<u32>, String> {
    match pick {
        None => Ok(None),
        Some(n) => options
            .get(n)
            .and_then(|o| o.id)
            .map(Some)
            .ok_or_else(|| format!("No option {}", n)),
    }
}
