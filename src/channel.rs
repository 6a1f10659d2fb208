//! Channel identifiers and the small value types shared by every layer
//!
//! Defines the key used by the state cache, the global ringer mode and the
//! flag set forwarded to the control surface on writes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logical audio channel (stream type)
///
/// Identifiers follow the platform stream numbering so that raw values
/// coming from a broadcast can be used as keys without translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "ChannelRepr", into = "ChannelRepr")]
pub struct ChannelKey(i32);

impl ChannelKey {
    /// Let the surface pick the stream
    pub const DEFAULT: ChannelKey = ChannelKey(-2);
    /// Phone calls
    pub const VOICE_CALL: ChannelKey = ChannelKey(0);
    /// System sounds
    pub const SYSTEM: ChannelKey = ChannelKey(1);
    /// Phone ring
    pub const RING: ChannelKey = ChannelKey(2);
    /// Music and media playback
    pub const MUSIC: ChannelKey = ChannelKey(3);
    /// Alarms
    pub const ALARM: ChannelKey = ChannelKey(4);
    /// Notifications
    pub const NOTIFICATION: ChannelKey = ChannelKey(5);
    /// DTMF tones
    pub const DTMF: ChannelKey = ChannelKey(8);
    /// Accessibility prompts
    pub const ACCESSIBILITY: ChannelKey = ChannelKey(10);

    /// Known channels with their short names (used for parsing)
    const NAMED: &'static [(&'static str, ChannelKey)] = &[
        ("default", ChannelKey::DEFAULT),
        ("voice_call", ChannelKey::VOICE_CALL),
        ("system", ChannelKey::SYSTEM),
        ("ring", ChannelKey::RING),
        ("music", ChannelKey::MUSIC),
        ("alarm", ChannelKey::ALARM),
        ("notification", ChannelKey::NOTIFICATION),
        ("dtmf", ChannelKey::DTMF),
        ("accessibility", ChannelKey::ACCESSIBILITY),
    ];

    /// Wrap a raw stream identifier
    pub const fn from_raw(raw: i32) -> Self {
        ChannelKey(raw)
    }

    /// Raw stream identifier
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Symbolic name, or the decimal value for identifiers we don't know
    pub fn name(self) -> String {
        match self {
            ChannelKey::MUSIC => "STREAM_MUSIC".to_string(),
            ChannelKey::ALARM => "STREAM_ALARM".to_string(),
            ChannelKey::ACCESSIBILITY => "STREAM_ACCESSIBILITY".to_string(),
            ChannelKey::SYSTEM => "STREAM_SYSTEM".to_string(),
            ChannelKey::DTMF => "STREAM_DTMF".to_string(),
            ChannelKey::NOTIFICATION => "STREAM_NOTIFICATION".to_string(),
            ChannelKey::RING => "STREAM_RING".to_string(),
            ChannelKey::VOICE_CALL => "STREAM_VOICE_CALL".to_string(),
            ChannelKey::DEFAULT => "USE_DEFAULT_STREAM_TYPE".to_string(),
            other => other.0.to_string(),
        }
    }

    /// Short lowercase name if this is a known channel
    pub fn short_name(self) -> Option<&'static str> {
        Self::NAMED
            .iter()
            .find(|(_, key)| *key == self)
            .map(|(name, _)| *name)
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ChannelKey {
    type Err = String;

    /// Accepts `music`, `STREAM_MUSIC` or a decimal identifier
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(raw) = trimmed.parse::<i32>() {
            return Ok(ChannelKey(raw));
        }

        let lower = trimmed.to_ascii_lowercase();
        let short = lower.strip_prefix("stream_").unwrap_or(&lower);
        if short == "use_default_stream_type" {
            return Ok(ChannelKey::DEFAULT);
        }

        Self::NAMED
            .iter()
            .find(|(name, _)| *name == short)
            .map(|(_, key)| *key)
            .ok_or_else(|| format!("unknown channel: {}", s))
    }
}

/// Serialized form: either a name or a raw number
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ChannelRepr {
    Raw(i32),
    Name(String),
}

impl TryFrom<ChannelRepr> for ChannelKey {
    type Error = String;

    fn try_from(repr: ChannelRepr) -> Result<Self, Self::Error> {
        match repr {
            ChannelRepr::Raw(raw) => Ok(ChannelKey(raw)),
            ChannelRepr::Name(name) => name.parse(),
        }
    }
}

impl From<ChannelKey> for ChannelRepr {
    fn from(key: ChannelKey) -> Self {
        match key.short_name() {
            Some(name) => ChannelRepr::Name(name.to_string()),
            None => ChannelRepr::Raw(key.0),
        }
    }
}

/// Global, device-wide ringer mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RingerMode {
    Silent,
    Vibrate,
    Normal,
}

impl RingerMode {
    /// Decode the platform integer (0 silent, 1 vibrate, 2 normal)
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(RingerMode::Silent),
            1 => Some(RingerMode::Vibrate),
            2 => Some(RingerMode::Normal),
            _ => None,
        }
    }

    /// Platform integer for this mode
    pub fn raw(self) -> i32 {
        match self {
            RingerMode::Silent => 0,
            RingerMode::Vibrate => 1,
            RingerMode::Normal => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RingerMode::Silent => "silent",
            RingerMode::Vibrate => "vibrate",
            RingerMode::Normal => "normal",
        }
    }
}

impl fmt::Display for RingerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RingerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "silent" => Ok(RingerMode::Silent),
            "vibrate" => Ok(RingerMode::Vibrate),
            "normal" => Ok(RingerMode::Normal),
            other => Err(format!("unknown ringer mode: {}", other)),
        }
    }
}

/// Flags forwarded untouched to the control surface on volume writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct VolumeFlags(u32);

impl VolumeFlags {
    pub const NONE: VolumeFlags = VolumeFlags(0);
    /// Show the system volume panel
    pub const SHOW_UI: VolumeFlags = VolumeFlags(1 << 0);
    /// Allow the write to change the ringer mode
    pub const ALLOW_RINGER_MODES: VolumeFlags = VolumeFlags(1 << 1);
    /// Play a feedback sound
    pub const PLAY_SOUND: VolumeFlags = VolumeFlags(1 << 2);
    /// Cancel pending sound/vibration
    pub const REMOVE_SOUND_AND_VIBRATE: VolumeFlags = VolumeFlags(1 << 3);
    /// Vibrate when entering vibrate mode
    pub const VIBRATE: VolumeFlags = VolumeFlags(1 << 4);

    pub const fn from_bits(bits: u32) -> Self {
        VolumeFlags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: VolumeFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for VolumeFlags {
    type Output = VolumeFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        VolumeFlags(self.0 | rhs.0)
    }
}

/// Step direction for relative volume adjustments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustDirection {
    Raise,
    Lower,
}

impl AdjustDirection {
    /// Signed step applied to the volume index
    pub fn step(self) -> i32 {
        match self {
            AdjustDirection::Raise => 1,
            AdjustDirection::Lower => -1,
        }
    }
}
