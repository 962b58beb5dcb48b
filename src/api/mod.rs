//! API client module for StreamSauce Desktop.
//!
//! Provides the HTTP client, the licensing endpoint calls that return
//! encrypted envelopes, and request/response types matching the licensing server.

pub mod client;
pub mod license;
pub mod types;

pub use client::ApiClient;
pub use license::{LicenseClient, LicenseError, LicenseTransport};
