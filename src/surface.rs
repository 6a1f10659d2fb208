//! Audio control surface - synchronous access to the live audio state
//!
//! The surface is the source of truth. The cache seeds from it and the
//! facade writes through it; it never writes to the cache directly.

mod simulated;

use crate::channel::{AdjustDirection, ChannelKey, RingerMode, VolumeFlags};
use crate::error::SurfaceError;

pub use simulated::{ChannelState, SimulatedSurface, SurfaceWrite};

/// Read/write handle on the audio subsystem
///
/// Note: All methods take &self (not &mut self) to support Arc<dyn ControlSurface>.
/// Reads are side-effect free. Volume writes outside `[min, max]` saturate
/// instead of failing.
pub trait ControlSurface: Send + Sync {
    /// Surface name for logs
    fn name(&self) -> &str;

    /// Current volume index of a channel
    fn read_volume(&self, channel: ChannelKey) -> Result<i32, SurfaceError>;

    /// Set a channel's volume index
    fn write_volume(
        &self,
        channel: ChannelKey,
        value: i32,
        flags: VolumeFlags,
    ) -> Result<(), SurfaceError>;

    /// Move a channel's volume one step up or down
    fn adjust_volume(
        &self,
        channel: ChannelKey,
        direction: AdjustDirection,
        flags: VolumeFlags,
    ) -> Result<(), SurfaceError>;

    /// Lowest volume index of a channel
    fn read_min_volume(&self, channel: ChannelKey) -> Result<i32, SurfaceError>;

    /// Highest volume index of a channel
    fn read_max_volume(&self, channel: ChannelKey) -> Result<i32, SurfaceError>;

    /// Whether a channel is muted
    fn read_mute(&self, channel: ChannelKey) -> Result<bool, SurfaceError>;

    /// Mute or unmute a channel
    fn write_mute(
        &self,
        channel: ChannelKey,
        muted: bool,
        flags: VolumeFlags,
    ) -> Result<(), SurfaceError>;

    /// Current global ringer mode
    fn read_ringer_mode(&self) -> Result<RingerMode, SurfaceError>;

    /// Change the global ringer mode
    ///
    /// Fails with [`SurfaceError::PermissionDenied`] without notification
    /// policy access.
    fn write_ringer_mode(&self, mode: RingerMode) -> Result<(), SurfaceError>;
}
