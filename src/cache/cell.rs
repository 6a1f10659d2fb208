//! Observable cell - latest value plus change notification
//!
//! Built on `tokio::sync::watch`: writing never waits on subscribers, a
//! slow subscriber only ever sees the newest value, and a fresh subscriber
//! starts from the current value.

use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// Cache entry holding the last known value of one piece of audio state
pub struct StateCell<T> {
    tx: Arc<watch::Sender<T>>,
}

impl<T> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T> StateCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a cell holding its seed value
    pub fn new(seed: T) -> Self {
        let (tx, _rx) = watch::channel(seed);
        Self { tx: Arc::new(tx) }
    }

    /// Last known value
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Overwrite the value and wake every subscriber
    ///
    /// Never blocks and never fails, whether or not anyone is subscribed.
    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Subscribe to this cell
    pub fn subscribe(&self) -> CellHandle<T> {
        CellHandle {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of live subscriber handles
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Whether both values refer to the same underlying cell
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tx, &other.tx)
    }
}

/// Subscriber view of a [`StateCell`]
///
/// Supports reading the current value and waiting for future changes.
/// Once the owning cache is torn down, [`changed`](Self::changed) returns `None`.
#[derive(Clone)]
pub struct CellHandle<T> {
    rx: watch::Receiver<T>,
}

impl<T> CellHandle<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Current value of the cell
    pub fn current(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Wait for the next update and return it
    ///
    /// Returns `None` when the cell has been discarded (facade shutdown).
    pub async fn changed(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Whether an update arrived that hasn't been observed through `changed`
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Whether both handles observe the same cell
    pub fn same_cell(&self, other: &Self) -> bool {
        self.rx.same_channel(&other.rx)
    }

    /// Stream yielding the current value immediately, then every update
    pub fn into_stream(self) -> WatchStream<T> {
        WatchStream::new(self.rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_stream::StreamExt;

    #[test]
    fn test_get_and_set() {
        let cell = StateCell::new(7);
        assert_eq!(cell.get(), 7);
        cell.set(10);
        assert_eq!(cell.get(), 10);
    }

    #[test]
    fn test_set_without_subscribers_is_kept() {
        let cell = StateCell::new(false);
        assert_eq!(cell.subscriber_count(), 0);
        cell.set(true);
        assert!(cell.get());
    }

    #[tokio::test]
    async fn test_handle_sees_current_then_updates() {
        let cell = StateCell::new(7);
        let mut handle = cell.subscribe();
        assert_eq!(handle.current(), 7);
        assert!(!handle.has_changed());

        cell.set(10);
        assert!(handle.has_changed());
        let next = tokio::time::timeout(Duration::from_secs(1), handle.changed())
            .await
            .unwrap();
        assert_eq!(next, Some(10));
        assert!(!handle.has_changed());
    }

    #[tokio::test]
    async fn test_stream_replays_latest() {
        let cell = StateCell::new(3);
        cell.set(4);

        let mut stream = cell.subscribe().into_stream();
        assert_eq!(stream.next().await, Some(4));

        cell.set(5);
        let next = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap();
        assert_eq!(next, Some(5));
    }

    #[tokio::test]
    async fn test_changed_returns_none_after_cell_dropped() {
        let cell = StateCell::new(1);
        let mut handle = cell.subscribe();
        drop(cell);
        assert_eq!(handle.changed().await, None);
        // Last value stays readable
        assert_eq!(handle.current(), 1);
    }

    #[test]
    fn test_identity() {
        let cell = StateCell::new(0);
        let clone = cell.clone();
        let other = StateCell::new(0);
        assert!(cell.ptr_eq(&clone));
        assert!(!cell.ptr_eq(&other));
        assert!(cell.subscribe().same_cell(&clone.subscribe()));
        assert!(!cell.subscribe().same_cell(&other.subscribe()));
    }
}
