//! Bake session operations
//!
//! `BakeSession` is what the HTTP layer talks to. It validates input,
//! builds events (fold counts, sensor readings) and hands them to the
//! store. Sensor failures are logged and never fail an operation.

mod autolog;

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use rayon::prelude::*;
use thiserror::Error;

use crate::event_store::{BakeStore, StoreError, StoreResult};
use crate::sensor::TemperatureSource;
use crate::types::{Assessment, Bake, BakeSummary, Event, EventKind};
use crate::utils::parse_timestamp;
use crate::validation::{
    validate_assessment, validate_event, validate_image_type, validate_note,
    validate_temperature, ValidationError,
};

pub use autolog::spawn_auto_logger;

/// Errors returned by session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Optional payload of a milestone event
#[derive(Debug, Clone, Default)]
pub struct LogFields {
    pub ambient_temp_f: Option<f64>,
    pub dough_temp_f: Option<f64>,
    pub note: Option<String>,
    /// Only accepted on `loaf-complete`
    pub assessment: Option<Assessment>,
}

/// What a standalone temperature reading measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TempTarget {
    #[default]
    Kitchen,
    Dough,
    Oven,
}

impl TempTarget {
    /// Map the `type` query value; anything unrecognized is the kitchen
    pub fn from_query(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("dough") || v.eq_ignore_ascii_case("loaf") => {
                TempTarget::Dough
            }
            Some(v) if v.eq_ignore_ascii_case("oven") => TempTarget::Oven,
            _ => TempTarget::Kitchen,
        }
    }
}

/// An uploaded photo
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// A free-form note, optionally with a dough reading and a photo
#[derive(Debug, Clone, Default)]
pub struct NoteInput {
    pub text: Option<String>,
    pub dough_temp_f: Option<f64>,
    pub image: Option<ImageUpload>,
}

/// Fold number for the next fold, given the bake's last event
///
/// Consecutive folds count up; anything in between starts over at 1.
pub fn next_fold_count(last: Option<&Event>) -> u32 {
    last.filter(|event| event.kind == EventKind::Fold)
        .and_then(|event| event.fold_count)
        .map_or(1, |count| count + 1)
}

/// Session operations over a store and an ambient temperature source
pub struct BakeSession {
    store: Arc<BakeStore>,
    sensor: Arc<dyn TemperatureSource>,
}

impl BakeSession {
    pub fn new(store: Arc<BakeStore>, sensor: Arc<dyn TemperatureSource>) -> Self {
        Self { store, sensor }
    }

    pub fn store(&self) -> &BakeStore {
        &self.store
    }

    pub fn sensor_enabled(&self) -> bool {
        self.sensor.is_enabled()
    }

    /// Open a new bake with a `starter-out` event
    ///
    /// Fails with `StoreError::SessionOpen` while another bake is in progress.
    pub async fn start(&self, ambient_temp_f: Option<f64>) -> SessionResult<Event> {
        let mut event = Event::new(EventKind::StarterOut);
        if let Some(temp) = ambient_temp_f {
            event = event.with_ambient_temp(validate_temperature(temp)?);
        }
        let event = self.fill_ambient(event).await;
        validate_event(&event)?;

        let (bake, event) = self
            .with_store(move |store| store.start_session(&event).map(|bake| (bake, event)))
            .await?;
        tracing::info!(bake = %bake, "started bake");
        Ok(event)
    }

    /// Log a milestone event to the current bake
    pub async fn log(&self, kind: EventKind, fields: LogFields) -> SessionResult<Event> {
        if !kind.is_milestone() {
            return Err(ValidationError::ReservedKind(kind).into());
        }

        let mut event = Event::new(kind);
        if let Some(temp) = fields.ambient_temp_f {
            event = event.with_ambient_temp(validate_temperature(temp)?);
        }
        if let Some(temp) = fields.dough_temp_f {
            event = event.with_dough_temp(validate_temperature(temp)?);
        }
        if let Some(note) = validate_note(fields.note.as_deref(), true)? {
            event = event.with_note(note);
        }
        if let Some(assessment) = &fields.assessment {
            validate_assessment(assessment)?;
            event = event.with_assessment(assessment);
        }

        let event = self.fill_ambient(event).await;
        validate_event(&event)?;

        let event = self
            .with_store(move |store| {
                if kind == EventKind::Fold {
                    store.append_with(|last| event.with_fold_count(next_fold_count(last)))
                } else {
                    store.append_event(&event).map(|_| event)
                }
            })
            .await?;

        tracing::info!(kind = %event.kind, fold = ?event.fold_count, "logged event");
        Ok(event)
    }

    /// Log a standalone temperature reading
    pub async fn log_temperature(&self, value: f64, target: TempTarget) -> SessionResult<Event> {
        let temp = validate_temperature(value)?;
        let event = Event::new(EventKind::Temperature);
        let event = match target {
            TempTarget::Kitchen => event.with_ambient_temp(temp),
            TempTarget::Dough => event.with_dough_temp(temp),
            TempTarget::Oven => event.with_oven_temp(temp),
        };

        let event = self
            .with_store(move |store| store.append_event(&event).map(|_| event))
            .await?;
        tracing::info!(?target, temp, "logged temperature");
        Ok(event)
    }

    /// Log a note, saving its photo under the same bake
    pub async fn log_note(&self, input: NoteInput) -> SessionResult<Event> {
        let text = validate_note(input.text.as_deref(), input.image.is_some())?;
        if let Some(image) = &input.image {
            validate_image_type(&image.content_type)?;
        }

        let mut event = Event::new(EventKind::Note);
        if let Some(text) = text {
            event = event.with_note(text);
        }
        if let Some(temp) = input.dough_temp_f {
            event = event.with_dough_temp(validate_temperature(temp)?);
        }
        let event = self.fill_ambient(event).await;
        validate_event(&event)?;

        let event = self
            .with_store(move |store| match input.image {
                Some(image) => {
                    store.append_note_with_image(event, &image.bytes, &image.content_type)
                }
                None => store.append_event(&event).map(|_| event),
            })
            .await?;
        tracing::info!(image = ?event.image_ref, "logged note");
        Ok(event)
    }

    /// The bake in progress (empty but assessed right after completion)
    pub fn current_bake(&self) -> SessionResult<Bake> {
        Ok(self.store.read_current_bake()?)
    }

    /// The bake in progress, or the most recent bake when none is open
    pub fn current_or_recent(&self) -> SessionResult<Bake> {
        let current = self.store.read_current_bake()?;
        if !current.is_empty() && !current.is_completed() {
            return Ok(current);
        }

        match self.store.list_bakes()?.first() {
            Some(identity) => Ok(self.store.read_bake(identity)?),
            None => Ok(current),
        }
    }

    pub fn has_current_bake(&self) -> SessionResult<bool> {
        Ok(self.store.has_current_bake()?)
    }

    pub fn bake(&self, identity: &str) -> SessionResult<Bake> {
        Ok(self.store.read_bake(identity)?)
    }

    pub fn list_bakes(&self) -> SessionResult<Vec<String>> {
        Ok(self.store.list_bakes()?)
    }

    /// History rows for every non-empty bake, most recent first
    ///
    /// Files are replayed in parallel.
    pub fn summaries(&self) -> SessionResult<Vec<BakeSummary>> {
        let identities = self.store.list_bakes()?;
        let bakes = identities
            .par_iter()
            .map(|identity| {
                self.store
                    .read_bake(identity)
                    .map(|bake| BakeSummary::from_bake(identity, &bake))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bakes.into_iter().flatten().collect())
    }

    pub fn delete_bake(&self, identity: &str) -> SessionResult<()> {
        self.store.delete_bake(identity)?;
        Ok(())
    }

    /// Remove one event of the current bake, guarded by its timestamp
    pub fn delete_event(&self, index: usize, timestamp: &str) -> SessionResult<Event> {
        let timestamp = parse_event_timestamp(timestamp)?;
        Ok(self.store.delete_event(index, &timestamp)?)
    }

    /// One auto-log tick: record the kitchen temperature if a bake is open
    ///
    /// Returns `None` when there is nothing to log.
    pub async fn auto_log_tick(&self) -> SessionResult<Option<Event>> {
        if !self.sensor.is_enabled() || !self.with_store(BakeStore::has_current_bake).await? {
            return Ok(None);
        }
        let Some(temp) = self.ambient_reading().await else {
            return Ok(None);
        };

        // The bake may have completed while the sensor was read.
        let event = Event::new(EventKind::Temperature).with_ambient_temp(temp);
        let logged = self
            .with_store(move |store| {
                let bake = store.append_if_open(&event)?;
                Ok(bake.map(|_| event))
            })
            .await?;
        if logged.is_none() {
            tracing::debug!(temp, "bake closed during sensor read; dropping reading");
        }
        Ok(logged)
    }

    /// Run a store operation on the blocking pool
    ///
    /// Store calls take the directory lock and fsync, so async operations
    /// keep them off the runtime's worker threads.
    async fn with_store<T, F>(&self, op: F) -> SessionResult<T>
    where
        F: FnOnce(&BakeStore) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || op(&store)).await?;
        Ok(result?)
    }

    /// Fill in the kitchen temperature from the sensor when the caller gave none
    async fn fill_ambient(&self, event: Event) -> Event {
        if event.kind == EventKind::Temperature || event.ambient_temp_f.is_some() {
            return event;
        }
        match self.ambient_reading().await {
            Some(temp) => event.with_ambient_temp(temp),
            None => event,
        }
    }

    async fn ambient_reading(&self) -> Option<f64> {
        if !self.sensor.is_enabled() {
            return None;
        }
        match self.sensor.fahrenheit().await {
            Ok(temp) if temp > 0.0 && validate_temperature(temp).is_ok() => {
                tracing::debug!(temp, "read kitchen temperature");
                Some(temp)
            }
            Ok(temp) => {
                tracing::warn!(temp, "ignoring implausible sensor reading");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read kitchen temperature");
                None
            }
        }
    }
}

fn parse_event_timestamp(value: &str) -> Result<DateTime<FixedOffset>, ValidationError> {
    // Query decoding turns the '+' of a UTC offset into a space.
    let value = value.trim().replace(' ', "+");
    parse_timestamp(&value).map_err(|_| ValidationError::InvalidTimestamp(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_store::BakeStoreConfig;
    use crate::sensor::{NoSensor, ReadingFuture, SensorError};
    use crate::types::{Browning, ProofLevel};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    struct FixedSensor(f64);

    impl TemperatureSource for FixedSensor {
        fn is_enabled(&self) -> bool {
            true
        }

        fn fahrenheit(&self) -> ReadingFuture<'_> {
            let temp = self.0;
            Box::pin(async move { Ok(temp) })
        }
    }

    struct BrokenSensor;

    impl TemperatureSource for BrokenSensor {
        fn is_enabled(&self) -> bool {
            true
        }

        fn fahrenheit(&self) -> ReadingFuture<'_> {
            Box::pin(async { Err(SensorError::Status(503)) })
        }
    }

    /// Finishes the open bake from inside the next reading once armed
    struct CompletingSensor {
        store: Arc<BakeStore>,
        armed: AtomicBool,
    }

    impl TemperatureSource for CompletingSensor {
        fn is_enabled(&self) -> bool {
            true
        }

        fn fahrenheit(&self) -> ReadingFuture<'_> {
            Box::pin(async move {
                if self.armed.swap(false, Ordering::SeqCst) {
                    let done = Event::new(EventKind::LoafComplete).with_assessment(&assessment(7));
                    self.store.append_event(&done).unwrap();
                }
                Ok(68.0)
            })
        }
    }

    fn create_session(sensor: Arc<dyn TemperatureSource>) -> (BakeSession, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = BakeStore::open(BakeStoreConfig::new(temp_dir.path())).unwrap();
        (BakeSession::new(Arc::new(store), sensor), temp_dir)
    }

    fn assessment(score: u8) -> Assessment {
        Assessment {
            proof_level: ProofLevel::Good,
            crumb_quality: 8,
            browning: Browning::Good,
            score,
            notes: Some("open crumb".to_string()),
        }
    }

    #[test]
    fn test_next_fold_count() {
        let fold = |n| Event::new(EventKind::Fold).with_fold_count(n);
        assert_eq!(next_fold_count(None), 1);
        assert_eq!(next_fold_count(Some(&fold(1))), 2);
        assert_eq!(next_fold_count(Some(&fold(3))), 4);
        assert_eq!(next_fold_count(Some(&Event::new(EventKind::Fold))), 1);
        assert_eq!(next_fold_count(Some(&Event::new(EventKind::Note))), 1);
    }

    #[test]
    fn test_temp_target_from_query() {
        assert_eq!(TempTarget::from_query(None), TempTarget::Kitchen);
        assert_eq!(TempTarget::from_query(Some("kitchen")), TempTarget::Kitchen);
        assert_eq!(TempTarget::from_query(Some("loaf")), TempTarget::Dough);
        assert_eq!(TempTarget::from_query(Some("Dough")), TempTarget::Dough);
        assert_eq!(TempTarget::from_query(Some("oven")), TempTarget::Oven);
        assert_eq!(TempTarget::from_query(Some("garage")), TempTarget::Kitchen);
    }

    #[tokio::test]
    async fn test_start_rejects_open_bake() {
        let (session, _temp) = create_session(Arc::new(NoSensor));
        session.start(Some(72.0)).await.unwrap();

        let err = session.start(None).await.unwrap_err();
        assert!(matches!(err, SessionError::Store(StoreError::SessionOpen(_))));
    }

    #[tokio::test]
    async fn test_folds_count_up_and_reset() {
        let (session, _temp) = create_session(Arc::new(NoSensor));
        session.start(None).await.unwrap();

        for expected in 1..=3 {
            let fold = session.log(EventKind::Fold, LogFields::default()).await.unwrap();
            assert_eq!(fold.fold_count, Some(expected));
        }
        session
            .log_note(NoteInput {
                text: Some("puffy".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let fold = session.log(EventKind::Fold, LogFields::default()).await.unwrap();
        assert_eq!(fold.fold_count, Some(1));
    }

    #[tokio::test]
    async fn test_log_rejects_reserved_kinds() {
        let (session, _temp) = create_session(Arc::new(NoSensor));
        let err = session
            .log(EventKind::Temperature, LogFields::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Validation(ValidationError::ReservedKind(EventKind::Temperature))
        ));
    }

    #[tokio::test]
    async fn test_assessment_only_on_completion() {
        let (session, _temp) = create_session(Arc::new(NoSensor));
        session.start(None).await.unwrap();

        let fields = LogFields {
            assessment: Some(assessment(9)),
            ..Default::default()
        };
        let err = session.log(EventKind::OvenOut, fields.clone()).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Validation(ValidationError::AssessmentOnNonTerminal(_))
        ));

        session.log(EventKind::LoafComplete, fields).await.unwrap();
        let current = session.current_bake().unwrap();
        assert!(current.events.is_empty());
        assert_eq!(current.assessment.map(|a| a.score), Some(9));
    }

    #[tokio::test]
    async fn test_sensor_fills_ambient() {
        let (session, _temp) = create_session(Arc::new(FixedSensor(70.5)));
        let start = session.start(None).await.unwrap();
        assert_eq!(start.ambient_temp_f, Some(70.5));

        let explicit = session
            .log(
                EventKind::Fed,
                LogFields {
                    ambient_temp_f: Some(68.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(explicit.ambient_temp_f, Some(68.0));

        let reading = session.log_temperature(78.0, TempTarget::Dough).await.unwrap();
        assert_eq!(reading.ambient_temp_f, None);
        assert_eq!(reading.dough_temp_f, Some(78.0));
    }

    #[tokio::test]
    async fn test_broken_sensor_does_not_fail_logging() {
        let (session, _temp) = create_session(Arc::new(BrokenSensor));
        let event = session.start(None).await.unwrap();
        assert_eq!(event.ambient_temp_f, None);
    }

    #[tokio::test]
    async fn test_implausible_sensor_reading_is_ignored() {
        let (session, _temp) = create_session(Arc::new(FixedSensor(0.0)));
        let event = session.start(None).await.unwrap();
        assert_eq!(event.ambient_temp_f, None);
    }

    #[tokio::test]
    async fn test_oven_reading_uses_its_own_field() {
        let (session, _temp) = create_session(Arc::new(NoSensor));
        let event = session.log_temperature(475.0, TempTarget::Oven).await.unwrap();
        assert_eq!(event.oven_temp_f, Some(475.0));
        assert_eq!(event.ambient_temp_f, None);

        let err = session.log_temperature(700.0, TempTarget::Oven).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Validation(ValidationError::TemperatureOutOfRange(_))
        ));
    }

    #[tokio::test]
    async fn test_note_with_image() {
        let (session, temp) = create_session(Arc::new(NoSensor));
        session.start(None).await.unwrap();

        let event = session
            .log_note(NoteInput {
                text: None,
                dough_temp_f: Some(77.0),
                image: Some(ImageUpload {
                    bytes: vec![0xFF, 0xD8, 0xFF],
                    content_type: "image/jpeg".to_string(),
                }),
            })
            .await
            .unwrap();

        let filename = event.image_ref.clone().unwrap();
        assert!(filename.ends_with(".jpg"));

        let bake = session.current_bake().unwrap();
        let identity = bake.filename.trim_start_matches("bake_");
        let path = session.store().image_path(identity, &filename).unwrap();
        assert!(path.starts_with(temp.path()));
        assert_eq!(std::fs::read(path).unwrap(), vec![0xFF, 0xD8, 0xFF]);
    }

    #[tokio::test]
    async fn test_note_rejects_non_image_upload() {
        let (session, _temp) = create_session(Arc::new(NoSensor));
        let err = session
            .log_note(NoteInput {
                text: Some("see attached".to_string()),
                dough_temp_f: None,
                image: Some(ImageUpload {
                    bytes: b"%PDF".to_vec(),
                    content_type: "application/pdf".to_string(),
                }),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Validation(ValidationError::NotAnImage(_))
        ));
        assert!(session.list_bakes().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_current_or_recent_falls_back_to_last_bake() {
        let (session, _temp) = create_session(Arc::new(NoSensor));
        assert!(session.current_or_recent().unwrap().is_empty());

        session.start(None).await.unwrap();
        session
            .log(
                EventKind::LoafComplete,
                LogFields {
                    assessment: Some(assessment(7)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let recent = session.current_or_recent().unwrap();
        assert_eq!(recent.events.len(), 2);
        assert!(recent.is_completed());
        assert_eq!(recent.assessment.map(|a| a.score), Some(7));
    }

    #[tokio::test]
    async fn test_summaries() {
        let (session, _temp) = create_session(Arc::new(NoSensor));
        session.start(None).await.unwrap();
        session.log(EventKind::Mixed, LogFields::default()).await.unwrap();

        let summaries = session.summaries().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].event_count, 2);
        assert!(!summaries[0].completed);
    }

    #[tokio::test]
    async fn test_delete_event_by_timestamp() {
        let (session, _temp) = create_session(Arc::new(NoSensor));
        session.start(None).await.unwrap();
        let mixed = session.log(EventKind::Mixed, LogFields::default()).await.unwrap();

        let removed = session
            .delete_event(1, &mixed.timestamp.to_rfc3339())
            .unwrap();
        assert_eq!(removed.kind, EventKind::Mixed);
        assert_eq!(session.current_bake().unwrap().events.len(), 1);

        let err = session.delete_event(0, "not a time").unwrap_err();
        assert!(matches!(
            err,
            SessionError::Validation(ValidationError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_parse_event_timestamp_restores_plus() {
        let parsed = parse_event_timestamp("2025-10-07T19:06:05.123 02:00").unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), 2 * 3600);
    }

    #[tokio::test]
    async fn test_auto_log_tick() {
        let (session, _temp) = create_session(Arc::new(FixedSensor(69.0)));
        assert!(session.auto_log_tick().await.unwrap().is_none());

        session.start(None).await.unwrap();
        let logged = session.auto_log_tick().await.unwrap().unwrap();
        assert_eq!(logged.kind, EventKind::Temperature);
        assert_eq!(logged.ambient_temp_f, Some(69.0));

        let (disabled, _temp) = create_session(Arc::new(NoSensor));
        disabled.start(None).await.unwrap();
        assert!(disabled.auto_log_tick().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_auto_log_tick_after_completion_during_reading() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(BakeStore::open(BakeStoreConfig::new(temp_dir.path())).unwrap());
        let sensor = Arc::new(CompletingSensor {
            store: Arc::clone(&store),
            armed: AtomicBool::new(false),
        });
        let session = BakeSession::new(Arc::clone(&store), sensor.clone());

        session.start(None).await.unwrap();
        sensor.armed.store(true, Ordering::SeqCst);

        assert!(session.auto_log_tick().await.unwrap().is_none());
        assert_eq!(session.list_bakes().unwrap().len(), 1);
        assert!(!session.has_current_bake().unwrap());
        assert_eq!(session.current_bake().unwrap().assessment.map(|a| a.score), Some(7));

        // The next bake can still be started
        session.start(None).await.unwrap();
        assert_eq!(session.list_bakes().unwrap().len(), 2);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_store_calls_leave_runtime_free() {
        let (session, _temp) = create_session(Arc::new(NoSensor));
        let session = Arc::new(session);

        let guard = session.store().write_guard();
        let starting = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.start(None).await }
        });

        // The only runtime thread keeps running timers while start waits on the lock
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!starting.is_finished());

        drop(guard);
        let event = starting.await.unwrap().unwrap();
        assert_eq!(event.kind, EventKind::StarterOut);
        assert!(session.has_current_bake().unwrap());
    }
}
