//! # volume-mirror
//!
//! Client-side cache of an audio subsystem's per-channel volume, mute flags
//! and global ringer mode.
//!
//! Observers read and subscribe through a [`VolumeMirror`] instead of
//! polling the subsystem. Cells are seeded lazily from the
//! [`ControlSurface`] on first subscription and kept fresh by
//! [`ChangeEvent`]s delivered by a [`ChangeSource`].
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use volume_mirror::{ChannelKey, LocalChangeSource, SimulatedSurface, ChannelState, VolumeMirror};
//!
//! let events = Arc::new(LocalChangeSource::default());
//! let surface = Arc::new(
//!     SimulatedSurface::new("sim", events.clone())
//!         .with_channel(ChannelKey::MUSIC, ChannelState::new(7, 0, 15)),
//! );
//!
//! let mirror = VolumeMirror::new();
//! mirror.initialize(surface.clone(), events)?;
//!
//! let mut music = mirror.subscribe_volume(ChannelKey::MUSIC)?;
//! surface.inject_volume(ChannelKey::MUSIC, 10)?;
//! assert_eq!(music.changed().await, Some(10));
//! ```
//!
//! Writes go straight to the surface. The cache only changes when the
//! corresponding event comes back, since other actors (hardware buttons,
//! other apps) change the same state independently.

pub mod cache;
pub mod channel;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod mirror;
pub mod surface;

pub use cache::{CacheStats, CellHandle, StateCache, StateCell};
pub use channel::{AdjustDirection, ChannelKey, RingerMode, VolumeFlags};
pub use config::MirrorConfig;
pub use error::{SourceError, SurfaceError, VolumeError};
pub use events::{ChangeEvent, ChangeSource, LocalChangeSource};
pub use mirror::VolumeMirror;
pub use surface::{ChannelState, ControlSurface, SimulatedSurface};
