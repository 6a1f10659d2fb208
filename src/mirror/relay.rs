//! Relay - applies change events to the state cache
//!
//! Events are consumed from the subscription channel by a dedicated task,
//! so a burst of events never runs on the thread that delivered them.
//! Applying an event only swaps a cell value; subscribers are woken but
//! never awaited.

use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::cache::StateCache;
use crate::events::ChangeEvent;

/// Apply one event to the cache
///
/// Returns true if a cell was updated. Events for cells that don't exist
/// yet, and unrecognized events, are dropped.
pub(crate) fn apply(cache: &StateCache, event: ChangeEvent) -> bool {
    match event {
        ChangeEvent::VolumeChanged { channel, new, old } => {
            trace!(%channel, old, new, "Relaying volume change");
            cache.update_volume(channel, new)
        }
        ChangeEvent::MuteChanged { channel, muted } => {
            trace!(%channel, muted, "Relaying mute change");
            cache.update_mute(channel, muted)
        }
        ChangeEvent::RingerModeChanged { mode } => {
            trace!(%mode, "Relaying ringer mode change");
            cache.update_ringer_mode(mode)
        }
        ChangeEvent::Unrecognized { action } => {
            trace!(%action, "Ignoring unrecognized event");
            false
        }
    }
}

/// Spawn the relay loop
///
/// The loop ends when every sender is dropped (the source unsubscribed)
/// or when the returned handle is aborted.
pub(crate) fn spawn(
    runtime: &Handle,
    cache: Arc<StateCache>,
    mut events: mpsc::UnboundedReceiver<ChangeEvent>,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        debug!("Relay loop started");
        let mut relayed: u64 = 0;

        while let Some(event) = events.recv().await {
            if apply(&cache, event) {
                relayed += 1;
            }
        }

        debug!("Relay loop stopped ({} cache updates)", relayed);
    })
}
