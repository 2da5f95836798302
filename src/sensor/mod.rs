//! Ambient temperature sources
//!
//! The session layer only needs "a Fahrenheit value, or an error, soon".
//! A failing sensor never fails the operation that asked for a reading.

mod home_assistant;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

pub use home_assistant::HomeAssistantSensor;

/// Boxed future returned by `TemperatureSource::fahrenheit`
pub type ReadingFuture<'a> = Pin<Box<dyn Future<Output = Result<f64, SensorError>> + Send + 'a>>;

/// Something that can report the kitchen temperature
pub trait TemperatureSource: Send + Sync {
    /// Whether the source is configured at all
    fn is_enabled(&self) -> bool;

    /// Current reading in °F
    fn fahrenheit(&self) -> ReadingFuture<'_>;
}

/// Errors from a temperature source
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("temperature sensor is not configured")]
    Disabled,

    #[error("sensor request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sensor returned status {0}")]
    Status(u16),

    #[error("sensor state {0:?} is not a temperature")]
    Unparseable(String),
}

/// Source used when no sensor is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSensor;

impl TemperatureSource for NoSensor {
    fn is_enabled(&self) -> bool {
        false
    }

    fn fahrenheit(&self) -> ReadingFuture<'_> {
        Box::pin(async { Err(SensorError::Disabled) })
    }
}
