//! Simulated control surface - in-memory audio state for tests and the demo binary
//!
//! Behaves like the platform audio service: writes saturate to the channel
//! bounds, every effective change is announced as a broadcast through the
//! attached [`LocalChangeSource`], and ringer changes need notification
//! policy access.

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::ControlSurface;
use crate::channel::{AdjustDirection, ChannelKey, RingerMode, VolumeFlags};
use crate::error::SurfaceError;
use crate::events::{broadcast, ChangeEvent, LocalChangeSource};

/// Most recent write requests kept for inspection
pub const WRITE_LOG_CAPACITY: usize = 256;

/// Live state of one simulated channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelState {
    pub volume: i32,
    #[serde(default)]
    pub min: i32,
    #[serde(default = "default_max")]
    pub max: i32,
    #[serde(default)]
    pub muted: bool,
}

impl ChannelState {
    pub fn new(volume: i32, min: i32, max: i32) -> Self {
        Self {
            volume,
            min,
            max,
            muted: false,
        }
    }
}

fn default_max() -> i32 {
    15
}

/// A write request that reached the surface (kept for inspection)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceWrite {
    Volume {
        channel: ChannelKey,
        requested: i32,
        flags: VolumeFlags,
    },
    Adjust {
        channel: ChannelKey,
        direction: AdjustDirection,
    },
    Mute {
        channel: ChannelKey,
        muted: bool,
    },
    RingerMode {
        mode: RingerMode,
    },
}

/// In-memory [`ControlSurface`]
pub struct SimulatedSurface {
    name: String,
    channels: DashMap<ChannelKey, ChannelState>,
    ringer_mode: Mutex<RingerMode>,
    /// Notification policy access (needed to enter/leave silence)
    policy_access: AtomicBool,
    /// When false every call fails with `Unavailable`
    available: AtomicBool,
    events: Arc<LocalChangeSource>,
    read_delay: Mutex<Option<Duration>>,
    volume_reads: AtomicUsize,
    mute_reads: AtomicUsize,
    ringer_reads: AtomicUsize,
    writes: Mutex<VecDeque<SurfaceWrite>>,
}

impl SimulatedSurface {
    /// Create an empty surface announcing changes through `events`
    pub fn new(name: impl Into<String>, events: Arc<LocalChangeSource>) -> Self {
        Self {
            name: name.into(),
            channels: DashMap::new(),
            ringer_mode: Mutex::new(RingerMode::Normal),
            policy_access: AtomicBool::new(true),
            available: AtomicBool::new(true),
            events,
            read_delay: Mutex::new(None),
            volume_reads: AtomicUsize::new(0),
            mute_reads: AtomicUsize::new(0),
            ringer_reads: AtomicUsize::new(0),
            writes: Mutex::new(VecDeque::with_capacity(WRITE_LOG_CAPACITY)),
        }
    }

    /// Add a channel
    pub fn with_channel(self, channel: ChannelKey, state: ChannelState) -> Self {
        self.channels.insert(channel, state);
        self
    }

    /// Set the initial ringer mode
    pub fn with_ringer_mode(self, mode: RingerMode) -> Self {
        *self.ringer_mode.lock() = mode;
        self
    }

    /// Grant or revoke notification policy access
    pub fn with_policy_access(self, granted: bool) -> Self {
        self.policy_access.store(granted, Ordering::SeqCst);
        self
    }

    /// The change source this surface announces through
    pub fn events(&self) -> Arc<LocalChangeSource> {
        Arc::clone(&self.events)
    }

    pub fn set_policy_access(&self, granted: bool) {
        self.policy_access.store(granted, Ordering::SeqCst);
    }

    /// Make every call fail as if the audio service died
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Slow down reads (widens race windows in tests)
    pub fn set_read_delay(&self, delay: Option<Duration>) {
        *self.read_delay.lock() = delay;
    }

    /// Number of volume reads served so far
    pub fn volume_reads(&self) -> usize {
        self.volume_reads.load(Ordering::SeqCst)
    }

    /// Number of mute reads served so far
    pub fn mute_reads(&self) -> usize {
        self.mute_reads.load(Ordering::SeqCst)
    }

    /// Number of ringer mode reads served so far
    pub fn ringer_reads(&self) -> usize {
        self.ringer_reads.load(Ordering::SeqCst)
    }

    /// Last [`WRITE_LOG_CAPACITY`] write requests, oldest first
    pub fn writes(&self) -> Vec<SurfaceWrite> {
        self.writes.lock().iter().cloned().collect()
    }

    /// Channel state as currently held by the surface
    pub fn channel_state(&self, channel: ChannelKey) -> Option<ChannelState> {
        self.channels.get(&channel).map(|state| *state)
    }

    /// Known channels, sorted
    pub fn channels(&self) -> Vec<ChannelKey> {
        let mut keys: Vec<ChannelKey> = self.channels.iter().map(|e| *e.key()).collect();
        keys.sort();
        keys
    }

    // =========================================================================
    // External actors (hardware buttons, other apps)
    // =========================================================================

    /// Change a volume from outside this process
    pub fn inject_volume(&self, channel: ChannelKey, value: i32) -> Result<(), SurfaceError> {
        info!("🎚️  External volume change on {} -> {}", channel, value);
        self.store_volume(channel, value)
    }

    /// Change a mute flag from outside this process
    pub fn inject_mute(&self, channel: ChannelKey, muted: bool) -> Result<(), SurfaceError> {
        info!("🔇 External mute change on {} -> {}", channel, muted);
        self.store_mute(channel, muted)
    }

    /// Change the ringer mode from outside this process (no permission check)
    pub fn inject_ringer_mode(&self, mode: RingerMode) {
        info!("🔔 External ringer mode change -> {}", mode);
        self.store_ringer_mode(mode);
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn check_available(&self) -> Result<(), SurfaceError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SurfaceError::unavailable(format!("{} is offline", self.name)))
        }
    }

    fn pause_for_read(&self) {
        let delay = *self.read_delay.lock();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
    }

    fn state(&self, channel: ChannelKey) -> Result<ChannelState, SurfaceError> {
        self.channel_state(channel)
            .ok_or(SurfaceError::UnknownChannel { channel })
    }

    fn record(&self, write: SurfaceWrite) {
        let mut writes = self.writes.lock();
        if writes.len() == WRITE_LOG_CAPACITY {
            writes.pop_front();
        }
        writes.push_back(write);
    }

    /// Broadcast a change the way the platform does
    ///
    /// Called with the state guard held so announcements follow store order.
    fn announce(&self, event: ChangeEvent) {
        let (action, extras) = broadcast::encode(&event);
        self.events.emit_broadcast(&action, &extras);
    }

    /// Leaving or entering silence on ring/notification streams touches the
    /// ringer policy, which needs notification policy access.
    fn check_silence_policy(
        &self,
        channel: ChannelKey,
        old: i32,
        new: i32,
    ) -> Result<(), SurfaceError> {
        let policy_stream = channel == ChannelKey::RING || channel == ChannelKey::NOTIFICATION;
        let crosses_zero = (old == 0) != (new == 0);
        if policy_stream && crosses_zero && !self.policy_access.load(Ordering::SeqCst) {
            return Err(SurfaceError::PermissionDenied { op: "set_volume" });
        }
        Ok(())
    }

    fn store_volume(&self, channel: ChannelKey, requested: i32) -> Result<(), SurfaceError> {
        let mut state = self
            .channels
            .get_mut(&channel)
            .ok_or(SurfaceError::UnknownChannel { channel })?;
        let old = state.volume;
        let new = requested.clamp(state.min, state.max);
        state.volume = new;

        if old != new {
            debug!(surface = %self.name, %channel, old, new, "Volume changed");
            self.announce(ChangeEvent::VolumeChanged { channel, new, old });
        }
        Ok(())
    }

    fn store_mute(&self, channel: ChannelKey, muted: bool) -> Result<(), SurfaceError> {
        let mut state = self
            .channels
            .get_mut(&channel)
            .ok_or(SurfaceError::UnknownChannel { channel })?;
        let changed = state.muted != muted;
        state.muted = muted;

        if changed {
            debug!(surface = %self.name, %channel, muted, "Mute changed");
            self.announce(ChangeEvent::MuteChanged { channel, muted });
        }
        Ok(())
    }

    fn store_ringer_mode(&self, mode: RingerMode) {
        let mut current = self.ringer_mode.lock();
        let changed = *current != mode;
        *current = mode;

        if changed {
            debug!(surface = %self.name, %mode, "Ringer mode changed");
            self.announce(ChangeEvent::RingerModeChanged { mode });
        }
    }
}

impl ControlSurface for SimulatedSurface {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_volume(&self, channel: ChannelKey) -> Result<i32, SurfaceError> {
        self.check_available()?;
        self.volume_reads.fetch_add(1, Ordering::SeqCst);
        self.pause_for_read();
        Ok(self.state(channel)?.volume)
    }

    fn write_volume(
        &self,
        channel: ChannelKey,
        value: i32,
        flags: VolumeFlags,
    ) -> Result<(), SurfaceError> {
        self.check_available()?;
        self.record(SurfaceWrite::Volume {
            channel,
            requested: value,
            flags,
        });

        let state = self.state(channel)?;
        self.check_silence_policy(channel, state.volume, value.clamp(state.min, state.max))?;
        self.store_volume(channel, value)
    }

    fn adjust_volume(
        &self,
        channel: ChannelKey,
        direction: AdjustDirection,
        _flags: VolumeFlags,
    ) -> Result<(), SurfaceError> {
        self.check_available()?;
        self.record(SurfaceWrite::Adjust { channel, direction });

        let state = self.state(channel)?;
        let target = (state.volume + direction.step()).clamp(state.min, state.max);
        self.check_silence_policy(channel, state.volume, target)?;
        self.store_volume(channel, target)
    }

    fn read_min_volume(&self, channel: ChannelKey) -> Result<i32, SurfaceError> {
        self.check_available()?;
        Ok(self.state(channel)?.min)
    }

    fn read_max_volume(&self, channel: ChannelKey) -> Result<i32, SurfaceError> {
        self.check_available()?;
        Ok(self.state(channel)?.max)
    }

    fn read_mute(&self, channel: ChannelKey) -> Result<bool, SurfaceError> {
        self.check_available()?;
        self.mute_reads.fetch_add(1, Ordering::SeqCst);
        self.pause_for_read();
        Ok(self.state(channel)?.muted)
    }

    fn write_mute(
        &self,
        channel: ChannelKey,
        muted: bool,
        _flags: VolumeFlags,
    ) -> Result<(), SurfaceError> {
        self.check_available()?;
        self.record(SurfaceWrite::Mute { channel, muted });
        self.store_mute(channel, muted)
    }

    fn read_ringer_mode(&self) -> Result<RingerMode, SurfaceError> {
        self.check_available()?;
        self.ringer_reads.fetch_add(1, Ordering::SeqCst);
        self.pause_for_read();
        Ok(*self.ringer_mode.lock())
    }

    fn write_ringer_mode(&self, mode: RingerMode) -> Result<(), SurfaceError> {
        self.check_available()?;
        self.record(SurfaceWrite::RingerMode { mode });

        if !self.policy_access.load(Ordering::SeqCst) {
            return Err(SurfaceError::PermissionDenied {
                op: "set_ringer_mode",
            });
        }
        self.store_ringer_mode(mode);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ChangeSource;
    use tokio::sync::mpsc;

    fn make_surface() -> SimulatedSurface {
        SimulatedSurface::new("test", Arc::new(LocalChangeSource::default()))
            .with_channel(ChannelKey::MUSIC, ChannelState::new(7, 0, 15))
            .with_channel(ChannelKey::RING, ChannelState::new(5, 0, 7))
    }

    #[test]
    fn test_reads_and_counters() {
        let surface = make_surface();
        assert_eq!(surface.read_volume(ChannelKey::MUSIC).unwrap(), 7);
        assert_eq!(surface.read_max_volume(ChannelKey::MUSIC).unwrap(), 15);
        assert_eq!(surface.read_min_volume(ChannelKey::RING).unwrap(), 0);
        assert!(!surface.read_mute(ChannelKey::MUSIC).unwrap());
        assert_eq!(surface.volume_reads(), 1);
        assert_eq!(surface.mute_reads(), 1);
    }

    #[test]
    fn test_unknown_channel() {
        let surface = make_surface();
        assert_eq!(
            surface.read_volume(ChannelKey::ALARM),
            Err(SurfaceError::UnknownChannel {
                channel: ChannelKey::ALARM
            })
        );
    }

    #[test]
    fn test_write_saturates_and_emits() {
        let surface = make_surface();
        let (tx, mut rx) = mpsc::unbounded_channel();
        surface.events().subscribe(tx).unwrap();

        surface
            .write_volume(ChannelKey::MUSIC, 99, VolumeFlags::NONE)
            .unwrap();
        assert_eq!(surface.channel_state(ChannelKey::MUSIC).unwrap().volume, 15);
        assert_eq!(
            rx.try_recv().unwrap(),
            ChangeEvent::VolumeChanged {
                channel: ChannelKey::MUSIC,
                new: 15,
                old: 7
            }
        );

        surface
            .write_volume(ChannelKey::MUSIC, -4, VolumeFlags::NONE)
            .unwrap();
        assert_eq!(surface.channel_state(ChannelKey::MUSIC).unwrap().volume, 0);
    }

    #[test]
    fn test_unchanged_write_emits_nothing() {
        let surface = make_surface();
        let (tx, mut rx) = mpsc::unbounded_channel();
        surface.events().subscribe(tx).unwrap();

        surface
            .write_volume(ChannelKey::MUSIC, 7, VolumeFlags::NONE)
            .unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_adjust_steps_within_bounds() {
        let surface = make_surface();
        surface
            .adjust_volume(ChannelKey::RING, AdjustDirection::Raise, VolumeFlags::NONE)
            .unwrap();
        surface
            .adjust_volume(ChannelKey::RING, AdjustDirection::Raise, VolumeFlags::NONE)
            .unwrap();
        surface
            .adjust_volume(ChannelKey::RING, AdjustDirection::Raise, VolumeFlags::NONE)
            .unwrap();
        assert_eq!(surface.channel_state(ChannelKey::RING).unwrap().volume, 7);
    }

    #[test]
    fn test_ringer_write_requires_policy_access() {
        let surface = make_surface().with_policy_access(false);
        assert_eq!(
            surface.write_ringer_mode(RingerMode::Silent),
            Err(SurfaceError::PermissionDenied {
                op: "set_ringer_mode"
            })
        );
        assert_eq!(surface.read_ringer_mode().unwrap(), RingerMode::Normal);

        surface.set_policy_access(true);
        surface.write_ringer_mode(RingerMode::Silent).unwrap();
        assert_eq!(surface.read_ringer_mode().unwrap(), RingerMode::Silent);
    }

    #[test]
    fn test_silencing_ring_stream_requires_policy_access() {
        let surface = make_surface().with_policy_access(false);
        assert!(matches!(
            surface.write_volume(ChannelKey::RING, 0, VolumeFlags::NONE),
            Err(SurfaceError::PermissionDenied { .. })
        ));
        assert_eq!(surface.channel_state(ChannelKey::RING).unwrap().volume, 5);

        // Non-policy streams are unaffected
        surface
            .write_volume(ChannelKey::MUSIC, 0, VolumeFlags::NONE)
            .unwrap();
    }

    #[test]
    fn test_offline_surface_fails() {
        let surface = make_surface();
        surface.set_available(false);
        assert!(matches!(
            surface.read_volume(ChannelKey::MUSIC),
            Err(SurfaceError::Unavailable { .. })
        ));
        assert_eq!(surface.volume_reads(), 0);
    }

    #[test]
    fn test_writes_are_recorded() {
        let surface = make_surface();
        surface
            .write_mute(ChannelKey::MUSIC, true, VolumeFlags::NONE)
            .unwrap();
        assert_eq!(
            surface.writes(),
            vec![SurfaceWrite::Mute {
                channel: ChannelKey::MUSIC,
                muted: true
            }]
        );
    }

    #[test]
    fn test_write_log_is_capped() {
        let surface = make_surface();
        for value in 0..(WRITE_LOG_CAPACITY as i32 + 10) {
            surface
                .write_volume(ChannelKey::MUSIC, value, VolumeFlags::NONE)
                .unwrap();
        }

        let writes = surface.writes();
        assert_eq!(writes.len(), WRITE_LOG_CAPACITY);
        assert_eq!(
            writes.last(),
            Some(&SurfaceWrite::Volume {
                channel: ChannelKey::MUSIC,
                requested: WRITE_LOG_CAPACITY as i32 + 9,
                flags: VolumeFlags::NONE
            })
        );
        assert_eq!(
            writes.first(),
            Some(&SurfaceWrite::Volume {
                channel: ChannelKey::MUSIC,
                requested: 10,
                flags: VolumeFlags::NONE
            })
        );
    }

    #[test]
    fn test_concurrent_writes_announce_in_store_order() {
        let surface = Arc::new(make_surface());
        let (tx, mut rx) = mpsc::unbounded_channel();
        surface.events().subscribe(tx).unwrap();

        let writers: Vec<_> = (0..4)
            .map(|worker| {
                let surface = surface.clone();
                std::thread::spawn(move || {
                    for step in 0..200 {
                        let value = (worker * 200 + step) % 16;
                        surface
                            .write_volume(ChannelKey::MUSIC, value, VolumeFlags::NONE)
                            .unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        // Each announcement starts where the previous one left off
        let mut expected_old = 7;
        let mut last = 7;
        while let Ok(event) = rx.try_recv() {
            match event {
                ChangeEvent::VolumeChanged { new, old, .. } => {
                    assert_eq!(old, expected_old);
                    expected_old = new;
                    last = new;
                }
                other => panic!("unexpected event {:?}", other),
            }
        }
        assert_eq!(Some(last), surface.channel_state(ChannelKey::MUSIC).map(|s| s.volume));
    }

    #[test]
    fn test_external_changes_are_broadcast() {
        let surface = make_surface();
        let (tx, mut rx) = mpsc::unbounded_channel();
        surface.events().subscribe(tx).unwrap();

        surface.inject_mute(ChannelKey::RING, true).unwrap();
        surface.inject_ringer_mode(RingerMode::Vibrate);
        assert!(surface.inject_mute(ChannelKey::ALARM, true).is_err());

        assert_eq!(
            rx.try_recv().unwrap(),
            ChangeEvent::MuteChanged {
                channel: ChannelKey::RING,
                muted: true
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            ChangeEvent::RingerModeChanged {
                mode: RingerMode::Vibrate
            }
        );
        assert!(rx.try_recv().is_err());
        // External actors bypass the write log
        assert!(surface.writes().is_empty());
    }

    #[test]
    fn test_channel_state_yaml_defaults() {
        let state: ChannelState = serde_yaml::from_str("volume: 4").unwrap();
        assert_eq!(state, ChannelState::new(4, 0, 15));
    }
}
