//! Data types for the sourdough logger
//!
//! This module contains the event, assessment and bake structures shared by
//! the store, the session layer and the HTTP API.

mod assessment;
mod bake;
mod event;

pub use assessment::{Assessment, Browning, ProofLevel};
pub use bake::{Bake, BakeSummary};
pub use event::{Event, EventKind, UnknownEventKind, ASSESSMENT_KEY};
