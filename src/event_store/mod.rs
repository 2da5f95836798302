//! Event Store Module for the bake log
//!
//! This module provides the append-only storage layer:
//! - `BakeStore`: Locked façade over the data directory
//! - `resolve`: Bake file naming and current-file resolution
//! - `replay`: Tolerant replay and current-session reconciliation
//! - `images`: Photo file naming and layout
//!
//! # Layout
//!
//! ```text
//! data/
//! ├── bake_2025-10-07.jsonl            one JSON event per line
//! ├── bake_2025-10-09_07-15-30.jsonl
//! ├── trash/bake_2025-09-30.jsonl      deleted bakes
//! └── images/bake_2025-10-09_07-15-30/1728457000123.jpg
//! ```
//!
//! # Write Path
//!
//! ```text
//! ┌─────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │ Session │───►│ resolve current  │───►│ append one line │
//! │ layer   │    │ (write lock)     │    │ + sync          │
//! └─────────┘    └──────────────────┘    └─────────────────┘
//! ```

pub mod images;
pub mod replay;
pub mod resolve;
mod store;

pub use replay::{reconcile, replay, CurrentView};
pub use resolve::{bake_file_name, identity_from_file_name};
pub use store::{BakeStore, BakeStoreConfig, StoreError, StoreResult, TRASH_DIR};
