//! Utility functions and helpers
//!
//! Time/identity formatting and atomic file rewrites.

pub mod atomic;
pub mod time;

pub use atomic::{atomic_write_with, cleanup_temp_files};
pub use time::{date_key, identity_key, parse_timestamp, today};
