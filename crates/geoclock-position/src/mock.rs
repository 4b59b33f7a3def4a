//! Mock position provider for testing

use geoclock_api::{Coordinate, PositionSample};
use std::sync::{Arc, Mutex};

use crate::{
    PositionError, PositionEvent, PositionProvider, PositionResult, PositionSender,
    PositionSubscription,
};

/// Position provider driven by hand from tests
///
/// Every pushed event is fanned out to all open subscriptions. Closed
/// subscriptions are pruned on the next push.
pub struct MockPositionProvider {
    subscribers: Arc<Mutex<Vec<PositionSender>>>,

    /// Configure `watch` to fail up front
    pub fail_watch: Arc<Mutex<Option<PositionError>>>,
}

impl MockPositionProvider {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
            fail_watch: Arc::new(Mutex::new(None)),
        }
    }

    /// Deliver an event to every open subscription
    pub fn push(&self, event: PositionEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Deliver a device fix stamped `captured_at`
    pub fn push_fix(
        &self,
        location: Coordinate,
        accuracy_meters: f64,
        captured_at: chrono::DateTime<chrono::Local>,
    ) {
        self.push(PositionEvent::Sample(PositionSample::device(
            location,
            accuracy_meters,
            captured_at,
        )));
    }

    pub fn push_error(&self, error: PositionError) {
        self.push(PositionEvent::Error(error));
    }

    /// Number of subscriptions that have not been stopped or dropped
    pub fn active_subscriptions(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap()
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }
}

impl Default for MockPositionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionProvider for MockPositionProvider {
    fn watch(&self) -> PositionResult<PositionSubscription> {
        if let Some(error) = self.fail_watch.lock().unwrap().clone() {
            return Err(error);
        }

        let (tx, subscription) = PositionSubscription::channel();
        self.subscribers.lock().unwrap().push(tx);
        Ok(subscription)
    }
}
