//! The two views of the application.
//!
//! Each view has its own controller and shares nothing in memory with the
//! other: the login view writes the session record, the browser view reads
//! it at start-up. Both call into the same `AppState` commands.

pub mod browser;
pub mod login;
pub mod render;


pub use browser::BrowserController;
pub use login::{LoginController, SubmitOutcome};

/// Which view the shell is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Browser,
}

impl View {
    pub fn name(&self) -> &'static str {
        match self {
            View::Login => login::VIEW_NAME,
            View::Browser => browser::VIEW_NAME,
        }
    }
}
