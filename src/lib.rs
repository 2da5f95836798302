//! Sourdough Log
//!
//! A sourdough baking event logger. Every milestone of a bake (starter
//! out, folds, shaping, oven, completion) is appended as one JSON line to
//! a per-bake file, and bakes are rebuilt by replaying those files.
//!
//! # Features
//!
//! - **Append-only storage**: One JSONL file per bake, nothing is rewritten
//!   except an explicit single-event delete
//! - **Automatic bake boundaries**: The current bake ends with `loaf-complete`;
//!   the next event opens a new file
//! - **Fold counting**: Consecutive folds are numbered 1, 2, 3...
//! - **Kitchen sensor**: Optional Home Assistant thermostat reading on every
//!   event, plus periodic auto-logging
//! - **Photos**: Notes can carry an image stored next to the bake
//!
//! # Modules
//!
//! - `types`: Events, assessments and bake views
//! - `event_store`: Bake file resolution, replay and the locked store
//! - `validation`: Input checks at the request boundary
//! - `sensor`: Ambient temperature sources
//! - `session`: Bake operations used by the HTTP layer
//! - `api`: Axum router and handlers
//! - `config`: Environment configuration
//! - `utils`: Time keys and atomic file writes
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sourdough_log::{BakeSession, BakeStore, BakeStoreConfig, EventKind, LogFields, NoSensor};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = BakeStore::open(BakeStoreConfig::new("./data"))?;
//! let session = BakeSession::new(Arc::new(store), Arc::new(NoSensor));
//!
//! session.start(Some(72.0)).await?;
//! session.log(EventKind::Fold, LogFields::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod event_store;
pub mod sensor;
pub mod session;
pub mod types;
pub mod utils;
pub mod validation;

// Re-export commonly used items at crate root
pub use config::Config;
pub use event_store::{BakeStore, BakeStoreConfig, StoreError};
pub use sensor::{HomeAssistantSensor, NoSensor, TemperatureSource};
pub use session::{BakeSession, LogFields, NoteInput, SessionError, TempTarget};
pub use types::{Assessment, Bake, BakeSummary, Browning, Event, EventKind, ProofLevel};
pub use validation::ValidationError;
