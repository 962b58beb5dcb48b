//! Controller commands invoked by the views.
//!
//! Each command maps module errors to a short user-facing message. Detail
//! (decryption failures, HTTP status) goes to the log only.

use serde::Serialize;
use thiserror::Error;

use crate::api::types::{Package, SubscriptionPeriod, SubscriptionStatus, User, ValidationResult};
use crate::api::{LicenseError, LicenseTransport};
use crate::branding::AppConfig;
use crate::state::AppState;

pub const MSG_EMPTY_KEY: &str = "Please enter a valid subscription key";
pub const MSG_CONNECTION: &str = "Failed to validate subscription. Please check your connection.";
pub const MSG_EXPIRED: &str = "Your subscription has expired";
pub const MSG_NOT_STARTED: &str = "Your subscription has not started yet";
pub const MSG_INVALID_KEY: &str = "Invalid subscription key";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("{}", MSG_EMPTY_KEY)]
    EmptyKey,
    #[error("{}", MSG_CONNECTION)]
    Connection,
    /// The server answered but the subscription cannot be used.
    #[error("{0}")]
    Rejected(String),
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Failed to load packages")]
    CatalogUnavailable,
}

/// Successful login as returned to the login view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    pub user: Option<User>,
    pub subscription: Option<SubscriptionPeriod>,
    pub app_config: AppConfig,
}

/// Message shown for a decoded result with `valid == false`.
pub fn rejection_message(result: &ValidationResult) -> String {
    match result.status {
        SubscriptionStatus::Expired => MSG_EXPIRED.to_string(),
        SubscriptionStatus::NotStarted => MSG_NOT_STARTED.to_string(),
        _ => result
            .error
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(MSG_INVALID_KEY)
            .to_string(),
    }
}

/// Validate a subscription key and, on success, commit the session.
pub async fn validate_subscription<T: LicenseTransport>(
    state: &AppState<T>,
    key: &str,
) -> Result<LoginOutcome, CommandError> {
    log::info!("Validating subscription key...");

    let envelope = state.license.validate_key(key).await.map_err(|e| match e {
        LicenseError::EmptyInput => CommandError::EmptyKey,
        other => {
            log::error!("Subscription validation error: {}", other);
            CommandError::Connection
        }
    })?;

    let result = state.license.open_validation(&envelope).map_err(|e| {
        log::error!("Subscription validation error: {}", e);
        CommandError::Connection
    })?;

    if !result.valid {
        let message = rejection_message(&result);
        log::info!("Subscription rejected ({:?}): {}", result.status, message);
        return Err(CommandError::Rejected(message));
    }

    let app_config = state.session.login(&result).await.map_err(|e| {
        log::error!("Session commit failed: {}", e);
        CommandError::Rejected(MSG_INVALID_KEY.to_string())
    })?;

    Ok(LoginOutcome {
        user: result.user,
        subscription: result.subscription,
        app_config,
    })
}

/// Fetch the package catalog for the authenticated session.
pub async fn get_packages<T: LicenseTransport>(
    state: &AppState<T>,
) -> Result<Vec<Package>, CommandError> {
    let authenticated = state.session.is_authenticated().await;

    let envelope = state
        .license
        .fetch_catalog(authenticated)
        .await
        .map_err(|e| match e {
            LicenseError::NotAuthenticated => CommandError::NotAuthenticated,
            other => {
                log::error!("Error getting packages: {}", other);
                CommandError::CatalogUnavailable
            }
        })?;

    let packages = state.license.open_catalog(&envelope).map_err(|e| {
        log::error!("Error getting packages: {}", e);
        CommandError::CatalogUnavailable
    })?;

    log::info!("Loaded {} package(s)", packages.len());
    Ok(packages)
}

/// Flip dark mode; returns the new value.
pub async fn toggle_dark_mode<T>(state: &AppState<T>) -> bool {
    state.session.toggle_dark_mode().await
}

pub async fn get_app_config<T>(state: &AppState<T>) -> AppConfig {
    state.session.read_config().await
}

/// Reset the session. Bridge and player cleanup belong to the browser view.
pub async fn logout<T>(state: &AppState<T>) {
    log::info!("Logging out");
    state.session.logout().await;
    log::info!("Logout complete");
}
