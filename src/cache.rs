//! State cache - lazily seeded, event-driven mirror of the audio state
//!
//! Three mappings live here: volume by channel, mute by channel and the
//! single ringer-mode cell. Each entry is a [`StateCell`] that replays its
//! latest value to new subscribers and pushes every update after that.

mod cell;
mod store;

pub use cell::{CellHandle, StateCell};
pub use store::{CacheStats, CellMap, StateCache};
