//! ChangeSource trait and the in-process broadcaster

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::broadcast;
use super::types::ChangeEvent;
use crate::error::SourceError;

/// Channel the source pushes events into
pub type EventSender = mpsc::UnboundedSender<ChangeEvent>;

/// Asynchronous feed of audio state changes
///
/// Note: All methods take &self to support Arc<dyn ChangeSource>.
/// Implementations use interior mutability for the subscription slot.
pub trait ChangeSource: Send + Sync {
    /// Source name for logs (e.g., "local", "broadcast")
    fn name(&self) -> &str;

    /// Begin delivering events into `sink`
    ///
    /// Fails with [`SourceError::AlreadySubscribed`] if a subscription is active.
    fn subscribe(&self, sink: EventSender) -> Result<(), SourceError>;

    /// Stop delivering events. No-op without a prior subscribe.
    fn unsubscribe(&self);

    /// Whether a subscription is currently active
    fn is_subscribed(&self) -> bool;
}

/// In-process change source
///
/// Holds at most one subscriber. Events emitted while nobody is subscribed
/// are dropped, the same way an unregistered broadcast receiver misses them.
pub struct LocalChangeSource {
    name: String,
    sink: Mutex<Option<EventSender>>,
}

impl LocalChangeSource {
    /// Create an unsubscribed source
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sink: Mutex::new(None),
        }
    }

    /// Deliver an event to the subscriber
    ///
    /// Returns false if the event was dropped (no subscriber, or the
    /// receiving side already went away).
    pub fn emit(&self, event: ChangeEvent) -> bool {
        let sink = self.sink.lock();
        match sink.as_ref() {
            Some(tx) => match tx.send(event) {
                Ok(()) => true,
                Err(mpsc::error::SendError(event)) => {
                    trace!(source = %self.name, kind = event.kind(), "Receiver gone, event dropped");
                    false
                }
            },
            None => {
                trace!(source = %self.name, kind = event.kind(), "No subscriber, event dropped");
                false
            }
        }
    }

    /// Decode a raw platform broadcast and deliver it
    pub fn emit_broadcast(&self, action: &str, extras: &Map<String, Value>) -> bool {
        self.emit(broadcast::decode(action, extras))
    }
}

impl Default for LocalChangeSource {
    fn default() -> Self {
        Self::new("local")
    }
}

impl ChangeSource for LocalChangeSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn subscribe(&self, sink: EventSender) -> Result<(), SourceError> {
        let mut slot = self.sink.lock();
        if slot.is_some() {
            return Err(SourceError::AlreadySubscribed);
        }
        *slot = Some(sink);
        debug!(source = %self.name, "Change source subscribed");
        Ok(())
    }

    fn unsubscribe(&self) {
        if self.sink.lock().take().is_some() {
            debug!(source = %self.name, "Change source unsubscribed");
        }
    }

    fn is_subscribed(&self) -> bool {
        self.sink.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelKey;

    fn volume_event(new: i32) -> ChangeEvent {
        ChangeEvent::VolumeChanged {
            channel: ChannelKey::MUSIC,
            new,
            old: 0,
        }
    }

    #[test]
    fn test_emit_without_subscriber_is_dropped() {
        let source = LocalChangeSource::default();
        assert!(!source.emit(volume_event(3)));
    }

    #[test]
    fn test_subscribe_and_emit() {
        let source = LocalChangeSource::default();
        let (tx, mut rx) = mpsc::unbounded_channel();

        source.subscribe(tx).unwrap();
        assert!(source.is_subscribed());
        assert!(source.emit(volume_event(5)));

        assert_eq!(rx.try_recv().unwrap(), volume_event(5));
    }

    #[test]
    fn test_double_subscribe_rejected() {
        let source = LocalChangeSource::default();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();

        source.subscribe(tx1).unwrap();
        assert_eq!(source.subscribe(tx2), Err(SourceError::AlreadySubscribed));
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let source = LocalChangeSource::default();
        let (tx, mut rx) = mpsc::unbounded_channel();

        source.subscribe(tx).unwrap();
        source.unsubscribe();
        assert!(!source.is_subscribed());
        assert!(!source.emit(volume_event(1)));

        // Sender was dropped with the subscription
        assert!(rx.try_recv().is_err());

        // Unsubscribing again is harmless, and a fresh subscribe works
        source.unsubscribe();
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(source.subscribe(tx).is_ok());
    }

    #[test]
    fn test_emit_after_receiver_dropped() {
        let source = LocalChangeSource::default();
        let (tx, rx) = mpsc::unbounded_channel();
        source.subscribe(tx).unwrap();
        drop(rx);
        assert!(!source.emit(volume_event(2)));
    }
}
