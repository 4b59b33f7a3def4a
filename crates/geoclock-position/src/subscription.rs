//! Owned position subscription

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

use crate::PositionEvent;

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Producer half handed to a provider when a watch starts
pub type PositionSender = mpsc::UnboundedSender<PositionEvent>;

/// A running position watch
///
/// Dropping the subscription closes the channel; providers observe this
/// through [`PositionSender::is_closed`] or `closed().await` and stop
/// producing. [`stop`](Self::stop) does the same explicitly.
#[derive(Debug)]
pub struct PositionSubscription {
    id: u64,
    events: mpsc::UnboundedReceiver<PositionEvent>,
}

impl PositionSubscription {
    /// Create a subscription and the sender its provider writes to
    pub fn channel() -> (PositionSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed);
        debug!(subscription_id = id, "Position subscription opened");
        (tx, Self { id, events: rx })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next event; `None` once the provider has finished
    pub async fn next(&mut self) -> Option<PositionEvent> {
        self.events.recv().await
    }

    /// Take an already-delivered event without waiting
    pub fn try_next(&mut self) -> Option<PositionEvent> {
        self.events.try_recv().ok()
    }

    /// Tear down the watch
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for PositionSubscription {
    fn drop(&mut self) {
        self.events.close();
        debug!(subscription_id = self.id, "Position subscription closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoclock_api::{Coordinate, PositionSample};

    fn sample() -> PositionEvent {
        PositionEvent::Sample(PositionSample::device(
            Coordinate::new(51.5, -0.12).unwrap(),
            8.0,
            chrono::Local::now(),
        ))
    }

    #[tokio::test]
    async fn delivers_events_in_order() {
        let (tx, mut sub) = PositionSubscription::channel();
        tx.send(sample()).unwrap();
        tx.send(PositionEvent::Error(crate::PositionError::Timeout))
            .unwrap();
        drop(tx);

        assert!(matches!(sub.next().await, Some(PositionEvent::Sample(_))));
        assert!(matches!(
            sub.next().await,
            Some(PositionEvent::Error(crate::PositionError::Timeout))
        ));
        assert!(sub.next().await.is_none());
    }

    #[test]
    fn stop_closes_producer_side() {
        let (tx, sub) = PositionSubscription::channel();
        assert!(!tx.is_closed());

        sub.stop();
        assert!(tx.is_closed());
        assert!(tx.send(sample()).is_err());
    }

    #[test]
    fn ids_are_unique() {
        let (_a_tx, a) = PositionSubscription::channel();
        let (_b_tx, b) = PositionSubscription::channel();
        assert_ne!(a.id(), b.id());
    }
}
