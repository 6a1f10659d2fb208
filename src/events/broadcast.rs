//! Decoding of platform-style broadcasts into [`ChangeEvent`]s
//!
//! A broadcast is an action string plus a JSON map of extras. Missing
//! integer extras default to -1 and a missing mute flag to false, which is
//! what the platform hands out for absent values.

use serde_json::{Map, Value};

use super::types::ChangeEvent;
use crate::channel::{ChannelKey, RingerMode};

pub const VOLUME_CHANGED_ACTION: &str = "android.media.VOLUME_CHANGED_ACTION";
pub const STREAM_MUTE_CHANGED_ACTION: &str = "android.media.STREAM_MUTE_CHANGED_ACTION";
pub const RINGER_MODE_CHANGED_ACTION: &str = "android.media.RINGER_MODE_CHANGED";

pub const EXTRA_VOLUME_STREAM_TYPE: &str = "android.media.EXTRA_VOLUME_STREAM_TYPE";
pub const EXTRA_VOLUME_STREAM_VALUE: &str = "android.media.EXTRA_VOLUME_STREAM_VALUE";
pub const EXTRA_PREV_VOLUME_STREAM_VALUE: &str = "android.media.EXTRA_PREV_VOLUME_STREAM_VALUE";
pub const EXTRA_STREAM_VOLUME_MUTED: &str = "android.media.EXTRA_STREAM_VOLUME_MUTED";
pub const EXTRA_RINGER_MODE: &str = "android.media.EXTRA_RINGER_MODE";

/// Translate a raw broadcast into a change event
///
/// Unknown actions, and ringer broadcasts carrying an unknown mode, come
/// back as [`ChangeEvent::Unrecognized`].
pub fn decode(action: &str, extras: &Map<String, Value>) -> ChangeEvent {
    match action {
        VOLUME_CHANGED_ACTION => ChangeEvent::VolumeChanged {
            channel: ChannelKey::from_raw(int_extra(extras, EXTRA_VOLUME_STREAM_TYPE)),
            new: int_extra(extras, EXTRA_VOLUME_STREAM_VALUE),
            old: int_extra(extras, EXTRA_PREV_VOLUME_STREAM_VALUE),
        },
        STREAM_MUTE_CHANGED_ACTION => ChangeEvent::MuteChanged {
            channel: ChannelKey::from_raw(int_extra(extras, EXTRA_VOLUME_STREAM_TYPE)),
            muted: extras
                .get(EXTRA_STREAM_VOLUME_MUTED)
                .and_then(Value::as_bool)
                .unwrap_or(false),
        },
        RINGER_MODE_CHANGED_ACTION => {
            match RingerMode::from_raw(int_extra(extras, EXTRA_RINGER_MODE)) {
                Some(mode) => ChangeEvent::RingerModeChanged { mode },
                None => ChangeEvent::Unrecognized {
                    action: action.to_string(),
                },
            }
        }
        other => ChangeEvent::Unrecognized {
            action: other.to_string(),
        },
    }
}

/// Encode an event into broadcast form
///
/// [`SimulatedSurface`](crate::SimulatedSurface) announces its changes this way.
pub fn encode(event: &ChangeEvent) -> (String, Map<String, Value>) {
    let mut extras = Map::new();
    let action = match event {
        ChangeEvent::VolumeChanged { channel, new, old } => {
            extras.insert(EXTRA_VOLUME_STREAM_TYPE.into(), channel.raw().into());
            extras.insert(EXTRA_VOLUME_STREAM_VALUE.into(), (*new).into());
            extras.insert(EXTRA_PREV_VOLUME_STREAM_VALUE.into(), (*old).into());
            VOLUME_CHANGED_ACTION
        }
        ChangeEvent::MuteChanged { channel, muted } => {
            extras.insert(EXTRA_VOLUME_STREAM_TYPE.into(), channel.raw().into());
            extras.insert(EXTRA_STREAM_VOLUME_MUTED.into(), (*muted).into());
            STREAM_MUTE_CHANGED_ACTION
        }
        ChangeEvent::RingerModeChanged { mode } => {
            extras.insert(EXTRA_RINGER_MODE.into(), mode.raw().into());
            RINGER_MODE_CHANGED_ACTION
        }
        ChangeEvent::Unrecognized { action } => action.as_str(),
    };
    (action.to_string(), extras)
}

fn int_extra(extras: &Map<String, Value>, key: &str) -> i32 {
    extras
        .get(key)
        .and_then(Value::as_i64)
        .and_then(|v| i32::try_from(v).ok())
        .unwrap_or(-1)
}
