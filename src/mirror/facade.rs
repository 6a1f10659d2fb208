//! VolumeMirror - explicit, owned replacement for a process-wide volume singleton
//!
//! Reads are served from the cache when a cell exists and go straight to
//! the surface otherwise. Writes always go to the surface; the cache only
//! moves when the matching change event comes back through the relay.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::relay;
use crate::cache::{CacheStats, CellHandle, StateCache};
use crate::channel::{AdjustDirection, ChannelKey, RingerMode, VolumeFlags};
use crate::error::{SurfaceError, VolumeError};
use crate::events::{ChangeEvent, ChangeSource};
use crate::surface::ControlSurface;

/// Everything that lives between `initialize` and `shutdown`
struct Session {
    surface: Arc<dyn ControlSurface>,
    source: Arc<dyn ChangeSource>,
    cache: Arc<StateCache>,
    relay: JoinHandle<()>,
}

/// Cached view of per-channel volume, mute flags and the ringer mode
///
/// Share it behind an `Arc`. Every method takes `&self` and may be called
/// from any thread; `shutdown` may race with in-flight calls, which then
/// either finish against the old state or fail with
/// [`VolumeError::NotInitialized`].
pub struct VolumeMirror {
    session: RwLock<Option<Arc<Session>>>,
}

impl VolumeMirror {
    /// Create an uninitialized mirror
    pub fn new() -> Self {
        Self {
            session: RwLock::new(None),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Bind a surface and start listening for change events
    ///
    /// The relay runs as a task on the current Tokio runtime; outside one
    /// this fails with [`VolumeError::NoRuntime`] and leaves `source`
    /// untouched. Fails with [`VolumeError::AlreadyInitialized`] if already
    /// initialized, or if `source` is already subscribed elsewhere.
    pub fn initialize(
        &self,
        surface: Arc<dyn ControlSurface>,
        source: Arc<dyn ChangeSource>,
    ) -> Result<(), VolumeError> {
        let mut slot = self.session.write();
        if slot.is_some() {
            return Err(VolumeError::AlreadyInitialized);
        }

        let runtime = Handle::try_current().map_err(|_| VolumeError::NoRuntime)?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        source.subscribe(events_tx)?;

        let cache = Arc::new(StateCache::new(Arc::clone(&surface)));
        let relay = relay::spawn(&runtime, Arc::clone(&cache), events_rx);

        info!(
            "🔊 Volume mirror initialized (surface: {}, source: {})",
            surface.name(),
            source.name()
        );

        *slot = Some(Arc::new(Session {
            surface,
            source,
            cache,
            relay,
        }));
        Ok(())
    }

    /// Stop listening and discard every cached value
    ///
    /// Calling it when not initialized does nothing. The mirror can be
    /// initialized again afterwards.
    pub fn shutdown(&self) {
        let session = self.session.write().take();
        match session {
            Some(session) => {
                session.source.unsubscribe();
                session.relay.abort();
                let stats = session.cache.stats();
                info!(
                    "🛑 Volume mirror shut down ({} volume cells, {} mute cells discarded)",
                    stats.volume_cells, stats.mute_cells
                );
            }
            None => debug!("Shutdown requested on an uninitialized volume mirror"),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.session.read().is_some()
    }

    fn session(&self) -> Result<Arc<Session>, VolumeError> {
        self.session
            .read()
            .clone()
            .ok_or(VolumeError::NotInitialized)
    }

    // =========================================================================
    // Relay
    // =========================================================================

    /// Apply a change event to the cache
    ///
    /// This is what the relay task does for every event the source
    /// delivers. Returns true if a cached cell changed. Events arriving
    /// while not initialized are dropped.
    pub fn relay(&self, event: ChangeEvent) -> bool {
        match self.session() {
            Ok(session) => relay::apply(&session.cache, event),
            Err(_) => {
                trace!(kind = event.kind(), "Not initialized, event dropped");
                false
            }
        }
    }

    // =========================================================================
    // Volume
    // =========================================================================

    /// Current volume of `channel`
    ///
    /// Served from the cache when the channel has a cell, otherwise read
    /// from the surface without creating one.
    pub fn read_volume(&self, channel: ChannelKey) -> Result<i32, VolumeError> {
        let session = self.session()?;
        if let Some(value) = session.cache.current_volume(channel) {
            return Ok(value);
        }
        session
            .surface
            .read_volume(channel)
            .map_err(|e| surface_failure("read_volume", channel, e))
    }

    /// Subscribe to the volume of `channel`, seeding its cell if needed
    pub fn subscribe_volume(&self, channel: ChannelKey) -> Result<CellHandle<i32>, VolumeError> {
        let session = self.session()?;
        let cell = session
            .cache
            .volume_cell(channel)
            .map_err(|e| surface_failure("seed volume", channel, e))?;
        Ok(cell.subscribe())
    }

    /// Ask the surface to set the volume of `channel`
    ///
    /// Out-of-range values saturate at the surface. The cache is not
    /// touched here; a rejected write is logged and otherwise ignored.
    pub fn set_volume(
        &self,
        channel: ChannelKey,
        value: i32,
        flags: VolumeFlags,
    ) -> Result<(), VolumeError> {
        let session = self.session()?;
        debug!(%channel, value, flags = flags.bits(), "Volume write");
        if let Err(e) = session.surface.write_volume(channel, value, flags) {
            warn!(%channel, value, error = %e, "Volume write not applied");
        }
        Ok(())
    }

    /// Ask the surface to move the volume of `channel` by one step
    pub fn adjust_volume(
        &self,
        channel: ChannelKey,
        direction: AdjustDirection,
        flags: VolumeFlags,
    ) -> Result<(), VolumeError> {
        let session = self.session()?;
        debug!(%channel, ?direction, "Volume adjust");
        if let Err(e) = session.surface.adjust_volume(channel, direction, flags) {
            warn!(%channel, ?direction, error = %e, "Volume adjust not applied");
        }
        Ok(())
    }

    /// Lowest volume index of `channel` (never cached)
    pub fn min_volume(&self, channel: ChannelKey) -> Result<i32, VolumeError> {
        let session = self.session()?;
        session
            .surface
            .read_min_volume(channel)
            .map_err(|e| surface_failure("read_min_volume", channel, e))
    }

    /// Highest volume index of `channel` (never cached)
    pub fn max_volume(&self, channel: ChannelKey) -> Result<i32, VolumeError> {
        let session = self.session()?;
        session
            .surface
            .read_max_volume(channel)
            .map_err(|e| surface_failure("read_max_volume", channel, e))
    }

    // =========================================================================
    // Mute
    // =========================================================================

    /// Whether `channel` is muted (cache first, surface otherwise)
    pub fn is_muted(&self, channel: ChannelKey) -> Result<bool, VolumeError> {
        let session = self.session()?;
        if let Some(muted) = session.cache.current_mute(channel) {
            return Ok(muted);
        }
        session
            .surface
            .read_mute(channel)
            .map_err(|e| surface_failure("read_mute", channel, e))
    }

    /// Subscribe to the mute flag of `channel`, seeding its cell if needed
    pub fn subscribe_mute(&self, channel: ChannelKey) -> Result<CellHandle<bool>, VolumeError> {
        let session = self.session()?;
        let cell = session
            .cache
            .mute_cell(channel)
            .map_err(|e| surface_failure("seed mute", channel, e))?;
        Ok(cell.subscribe())
    }

    /// Ask the surface to mute or unmute `channel`
    pub fn set_mute(&self, channel: ChannelKey, muted: bool) -> Result<(), VolumeError> {
        let session = self.session()?;
        debug!(%channel, muted, "Mute write");
        if let Err(e) = session.surface.write_mute(channel, muted, VolumeFlags::NONE) {
            warn!(%channel, muted, error = %e, "Mute write not applied");
        }
        Ok(())
    }

    /// Flip the mute flag of `channel`
    ///
    /// Uses the one-shot read, so no cell is created. Returns the
    /// requested state.
    pub fn toggle_mute(&self, channel: ChannelKey) -> Result<bool, VolumeError> {
        let requested = !self.is_muted(channel)?;
        self.set_mute(channel, requested)?;
        Ok(requested)
    }

    // =========================================================================
    // Ringer mode
    // =========================================================================

    /// Current ringer mode (cache first, surface otherwise)
    pub fn ringer_mode(&self) -> Result<RingerMode, VolumeError> {
        let session = self.session()?;
        if let Some(mode) = session.cache.current_ringer_mode() {
            return Ok(mode);
        }
        session.surface.read_ringer_mode().map_err(|e| {
            warn!(error = %e, "Ringer mode read failed");
            VolumeError::from(e)
        })
    }

    /// Subscribe to the ringer mode, seeding its cell if needed
    pub fn subscribe_ringer_mode(&self) -> Result<CellHandle<RingerMode>, VolumeError> {
        let session = self.session()?;
        let cell = session.cache.ringer_cell().map_err(|e| {
            warn!(error = %e, "Ringer mode seed failed");
            VolumeError::from(e)
        })?;
        Ok(cell.subscribe())
    }

    /// Ask the surface to change the ringer mode
    ///
    /// Unlike volume writes, a permission refusal is returned to the
    /// caller as [`VolumeError::PermissionDenied`].
    pub fn set_ringer_mode(&self, mode: RingerMode) -> Result<(), VolumeError> {
        let session = self.session()?;
        debug!(%mode, "Ringer mode write");
        match session.surface.write_ringer_mode(mode) {
            Ok(()) => Ok(()),
            Err(SurfaceError::PermissionDenied { .. }) => {
                warn!(%mode, "Ringer mode change refused: no notification policy access");
                Err(VolumeError::PermissionDenied)
            }
            Err(e) => {
                warn!(%mode, error = %e, "Ringer mode write not applied");
                Ok(())
            }
        }
    }

    pub fn is_silent_mode(&self) -> Result<bool, VolumeError> {
        Ok(self.ringer_mode()? == RingerMode::Silent)
    }

    pub fn is_vibrate_mode(&self) -> Result<bool, VolumeError> {
        Ok(self.ringer_mode()? == RingerMode::Vibrate)
    }

    pub fn is_normal_mode(&self) -> Result<bool, VolumeError> {
        Ok(self.ringer_mode()? == RingerMode::Normal)
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// How many cells the cache currently holds
    pub fn cache_stats(&self) -> Result<CacheStats, VolumeError> {
        Ok(self.session()?.cache.stats())
    }

    /// Channels that currently have a volume cell
    pub fn cached_volume_channels(&self) -> Result<Vec<ChannelKey>, VolumeError> {
        Ok(self.session()?.cache.volume_channels())
    }
}

impl Default for VolumeMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for VolumeMirror {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn surface_failure(op: &str, channel: ChannelKey, err: SurfaceError) -> VolumeError {
    warn!(%channel, error = %err, "{} failed", op);
    VolumeError::Surface(err)
}
