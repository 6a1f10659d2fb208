//! StateCache - concurrent per-channel cells seeded from the control surface
//!
//! Cells are created on first access only, so memory stays bounded by the
//! channels somebody actually looked at. Updates for channels without a
//! cell are dropped.

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::{debug, trace};

use super::cell::StateCell;
use crate::channel::{ChannelKey, RingerMode};
use crate::error::SurfaceError;
use crate::surface::ControlSurface;

/// Concurrent map of channel -> cell
///
/// DashMap shards its locks, so operations on different channels don't
/// contend. Creation only holds the shard lock long enough to insert an
/// empty slot; the seed is read afterwards through the slot's `OnceCell`,
/// so racing creators still see a single seed read and the same cell.
/// A slot whose seed has not completed counts as absent.
pub struct CellMap<T> {
    cells: DashMap<ChannelKey, Arc<OnceCell<StateCell<T>>>>,
}

impl<T> CellMap<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            cells: DashMap::new(),
        }
    }

    /// Return the cell for `key`, creating and seeding it if absent
    ///
    /// `seed` runs at most once per key at a time, outside the shard lock.
    /// If it fails no cell is stored and a later call seeds again.
    pub fn get_or_create<F>(&self, key: ChannelKey, seed: F) -> Result<StateCell<T>, SurfaceError>
    where
        F: FnOnce() -> Result<T, SurfaceError>,
    {
        let slot = self.slot(key);
        slot.get_or_try_init(|| seed().map(StateCell::new)).cloned()
    }

    /// Overwrite the cell for `key` if it exists
    ///
    /// Returns false (and stores nothing) when nobody created the cell yet.
    pub fn update(&self, key: ChannelKey, value: T) -> bool {
        match self.cell(key) {
            Some(cell) => {
                cell.set(value);
                true
            }
            None => false,
        }
    }

    /// Current value without seeding
    pub fn current(&self, key: ChannelKey) -> Option<T> {
        self.cell(key).map(|cell| cell.get())
    }

    pub fn contains(&self, key: ChannelKey) -> bool {
        self.cell(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.cells.iter().filter(|entry| entry.value().get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Channels that currently have a cell, sorted
    pub fn keys(&self) -> Vec<ChannelKey> {
        let mut keys: Vec<ChannelKey> = self
            .cells
            .iter()
            .filter(|entry| entry.value().get().is_some())
            .map(|entry| *entry.key())
            .collect();
        keys.sort();
        keys
    }

    /// Slot for `key`, inserted empty if missing. The shard guard is
    /// dropped before returning.
    fn slot(&self, key: ChannelKey) -> Arc<OnceCell<StateCell<T>>> {
        if let Some(slot) = self.cells.get(&key) {
            return Arc::clone(slot.value());
        }
        let slot = self.cells.entry(key).or_default();
        Arc::clone(slot.value())
    }

    /// Seeded cell for `key`, cloned out so no shard lock outlives the call
    fn cell(&self, key: ChannelKey) -> Option<StateCell<T>> {
        let slot = self.cells.get(&key).map(|entry| Arc::clone(entry.value()))?;
        slot.get().cloned()
    }
}

impl<T> Default for CellMap<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of how many cells exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub volume_cells: usize,
    pub mute_cells: usize,
    pub ringer_cell: bool,
}

/// Mirror of the audio state, seeded from a [`ControlSurface`]
pub struct StateCache {
    surface: Arc<dyn ControlSurface>,
    volumes: CellMap<i32>,
    mutes: CellMap<bool>,
    ringer: OnceCell<StateCell<RingerMode>>,
}

impl StateCache {
    /// Create an empty cache reading seeds from `surface`
    pub fn new(surface: Arc<dyn ControlSurface>) -> Self {
        Self {
            surface,
            volumes: CellMap::new(),
            mutes: CellMap::new(),
            ringer: OnceCell::new(),
        }
    }

    // =========================================================================
    // Volume
    // =========================================================================

    /// Volume cell for `channel`, seeded from the surface on first access
    pub fn volume_cell(&self, channel: ChannelKey) -> Result<StateCell<i32>, SurfaceError> {
        self.volumes.get_or_create(channel, || {
            let value = self.surface.read_volume(channel)?;
            debug!(%channel, value, "Seeded volume cell");
            Ok(value)
        })
    }

    /// Store a volume if the channel has a cell
    pub fn update_volume(&self, channel: ChannelKey, value: i32) -> bool {
        let applied = self.volumes.update(channel, value);
        if !applied {
            trace!(%channel, value, "No volume cell, update ignored");
        }
        applied
    }

    pub fn current_volume(&self, channel: ChannelKey) -> Option<i32> {
        self.volumes.current(channel)
    }

    // =========================================================================
    // Mute
    // =========================================================================

    /// Mute cell for `channel`, seeded from the surface on first access
    pub fn mute_cell(&self, channel: ChannelKey) -> Result<StateCell<bool>, SurfaceError> {
        self.mutes.get_or_create(channel, || {
            let muted = self.surface.read_mute(channel)?;
            debug!(%channel, muted, "Seeded mute cell");
            Ok(muted)
        })
    }

    /// Store a mute flag if the channel has a cell
    pub fn update_mute(&self, channel: ChannelKey, muted: bool) -> bool {
        let applied = self.mutes.update(channel, muted);
        if !applied {
            trace!(%channel, muted, "No mute cell, update ignored");
        }
        applied
    }

    pub fn current_mute(&self, channel: ChannelKey) -> Option<bool> {
        self.mutes.current(channel)
    }

    // =========================================================================
    // Ringer mode
    // =========================================================================

    /// The ringer-mode cell, seeded from the surface on first access
    pub fn ringer_cell(&self) -> Result<StateCell<RingerMode>, SurfaceError> {
        self.ringer
            .get_or_try_init(|| {
                let mode = self.surface.read_ringer_mode()?;
                debug!(%mode, "Seeded ringer mode cell");
                Ok(StateCell::new(mode))
            })
            .cloned()
    }

    /// Store the ringer mode if its cell exists
    pub fn update_ringer_mode(&self, mode: RingerMode) -> bool {
        match self.ringer.get() {
            Some(cell) => {
                cell.set(mode);
                true
            }
            None => {
                trace!(%mode, "No ringer cell, update ignored");
                false
            }
        }
    }

    pub fn current_ringer_mode(&self) -> Option<RingerMode> {
        self.ringer.get().map(StateCell::get)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    pub fn has_volume_cell(&self, channel: ChannelKey) -> bool {
        self.volumes.contains(channel)
    }

    /// Channels with a volume cell
    pub fn volume_channels(&self) -> Vec<ChannelKey> {
        self.volumes.keys()
    }

    /// Channels with a mute cell
    pub fn mute_channels(&self) -> Vec<ChannelKey> {
        self.mutes.keys()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            volume_cells: self.volumes.len(),
            mute_cells: self.mutes.len(),
            ringer_cell: self.ringer.get().is_some(),
        }
    }
}
