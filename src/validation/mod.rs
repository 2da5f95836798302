//! Request validation for bake events
//!
//! The store performs no kind or range checks; everything is validated here
//! before an event is built and appended.

mod event;

pub use event::{
    parse_milestone, parse_temperature, validate_assessment, validate_event, validate_image_type,
    validate_note, validate_temperature, ValidationError, MAX_TEMP_F, MIN_TEMP_F,
};
