//! Replay a fixed track of positions

use geoclock_api::{Coordinate, PositionSample};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::{PositionEvent, PositionProvider, PositionResult, PositionSubscription};

/// Accuracy assumed when a track line omits it
pub const DEFAULT_REPLAY_ACCURACY_METERS: f64 = 10.0;

/// Shortest spacing between replayed points; tokio intervals cannot be zero
pub const MIN_REPLAY_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("Failed to read track: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse track: {0}")]
    Csv(#[from] csv::Error),

    #[error("Line {line}: {message}")]
    InvalidLine { line: u64, message: String },
}

/// One point of a recorded track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    pub location: Coordinate,
    pub accuracy_meters: f64,
}

/// Parse a track of `lat,lon[,accuracy]` lines; `#` starts a comment line
pub fn parse_track(input: &str) -> Result<Vec<TrackPoint>, TrackError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(input.as_bytes());

    let mut points = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let invalid = |message: String| TrackError::InvalidLine { line, message };

        if record.len() < 2 || record.len() > 3 {
            return Err(invalid(format!(
                "expected lat,lon[,accuracy], got {} fields",
                record.len()
            )));
        }

        let number = |idx: usize, name: &str| -> Result<f64, TrackError> {
            record[idx]
                .parse::<f64>()
                .map_err(|_| invalid(format!("{name} '{}' is not a number", &record[idx])))
        };

        let latitude = number(0, "latitude")?;
        let longitude = number(1, "longitude")?;
        let accuracy_meters = if record.len() == 3 {
            number(2, "accuracy")?
        } else {
            DEFAULT_REPLAY_ACCURACY_METERS
        };

        let location =
            Coordinate::new(latitude, longitude).map_err(|e| invalid(e.to_string()))?;
        points.push(TrackPoint {
            location,
            accuracy_meters,
        });
    }

    Ok(points)
}

/// Load a track file
pub fn load_track(path: impl AsRef<Path>) -> Result<Vec<TrackPoint>, TrackError> {
    let content = std::fs::read_to_string(path)?;
    parse_track(&content)
}

/// Emits each track point in turn, one per interval, stamped with the
/// wall-clock time of emission. The stream ends after the last point.
/// Intervals shorter than [`MIN_REPLAY_INTERVAL`] are raised to it.
///
/// `watch` spawns a task and must be called inside a Tokio runtime.
pub struct ReplayPositionProvider {
    points: Vec<TrackPoint>,
    interval: Duration,
}

impl ReplayPositionProvider {
    pub fn new(points: Vec<TrackPoint>, interval: Duration) -> Self {
        Self {
            points,
            interval: interval.max(MIN_REPLAY_INTERVAL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl PositionProvider for ReplayPositionProvider {
    fn watch(&self) -> PositionResult<PositionSubscription> {
        let (tx, subscription) = PositionSubscription::channel();
        let points = self.points.clone();
        let interval = self.interval;
        let subscription_id = subscription.id();

        info!(
            subscription_id,
            points = points.len(),
            interval_ms = interval.as_millis() as u64,
            "Replaying position track"
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            for point in points {
                tokio::select! {
                    _ = tx.closed() => {
                        debug!(subscription_id, "Replay cancelled");
                        return;
                    }
                    _ = ticker.tick() => {}
                }

                let sample = PositionSample::device(
                    point.location,
                    point.accuracy_meters,
                    geoclock_util::now(),
                );
                if tx.send(PositionEvent::Sample(sample)).is_err() {
                    return;
                }
            }
            debug!(subscription_id, "Replay finished");
        });

        Ok(subscription)
    }
}
