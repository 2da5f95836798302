//! API module for HTTP endpoints
//!
//! This module provides the JSON REST API used by the logging pages and
//! NFC/QR shortcuts.

pub mod http;
pub mod rest;
pub mod state;

pub use http::create_router;
pub use state::AppState;
