//! Change event type definitions

use crate::channel::{ChannelKey, RingerMode};

/// Notification pushed by the audio subsystem when its state changes
///
/// Events arrive asynchronously and arbitrarily interleaved. There is no
/// ordering guarantee relative to writes issued by this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A channel's volume index changed
    VolumeChanged {
        channel: ChannelKey,
        /// Value after the change
        new: i32,
        /// Value before the change (-1 when the platform didn't say)
        old: i32,
    },

    /// A channel was muted or unmuted
    MuteChanged { channel: ChannelKey, muted: bool },

    /// The global ringer mode changed
    RingerModeChanged { mode: RingerMode },

    /// Anything else delivered on the feed (ignored by the relay)
    Unrecognized { action: String },
}

impl ChangeEvent {
    /// Short kind label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::VolumeChanged { .. } => "volume",
            ChangeEvent::MuteChanged { .. } => "mute",
            ChangeEvent::RingerModeChanged { .. } => "ringer",
            ChangeEvent::Unrecognized { .. } => "unrecognized",
        }
    }

    /// Channel the event refers to, if it is channel-scoped
    pub fn channel(&self) -> Option<ChannelKey> {
        match self {
            ChangeEvent::VolumeChanged { channel, .. } | ChangeEvent::MuteChanged { channel, .. } => {
                Some(*channel)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_and_channel() {
        let event = ChangeEvent::VolumeChanged {
            channel: ChannelKey::MUSIC,
            new: 10,
            old: 7,
        };
        assert_eq!(event.kind(), "volume");
        assert_eq!(event.channel(), Some(ChannelKey::MUSIC));

        let event = ChangeEvent::RingerModeChanged {
            mode: RingerMode::Silent,
        };
        assert_eq!(event.kind(), "ringer");
        assert_eq!(event.channel(), None);
    }
}
