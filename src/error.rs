//! Error types for volume-mirror.
//!
//! - [`VolumeError`]: returned by the facade to its callers
//! - [`SurfaceError`]: raised by a [`ControlSurface`](crate::ControlSurface) call
//! - [`SourceError`]: raised by a [`ChangeSource`](crate::ChangeSource) subscription
//!
//! Most surface failures never reach the caller: the facade logs them and
//! degrades to the cached value or to a no-op write.

use crate::channel::ChannelKey;

/// Errors surfaced by [`VolumeMirror`](crate::VolumeMirror)
#[derive(Debug, thiserror::Error)]
pub enum VolumeError {
    /// Operation attempted before `initialize` (or after `shutdown`).
    #[error("volume mirror not initialized")]
    NotInitialized,

    /// `initialize` called twice, or the change source was already subscribed.
    #[error("volume mirror already initialized")]
    AlreadyInitialized,

    /// `initialize` called outside a Tokio runtime, so the relay cannot run.
    #[error("volume mirror needs a Tokio runtime to relay change events")]
    NoRuntime,

    /// Ringer-mode write rejected for lack of notification policy access.
    #[error("permission denied: ringer mode change requires notification policy access")]
    PermissionDenied,

    /// A value was required and neither the cache nor the surface could supply it.
    #[error("control surface error: {0}")]
    Surface(#[from] SurfaceError),
}

/// Low-level failures of the audio control surface
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    /// The caller lacks the system permission for this operation.
    #[error("permission denied for {op}")]
    PermissionDenied {
        /// Operation that was rejected.
        op: &'static str,
    },

    /// The surface could not be reached or failed internally.
    #[error("control surface unavailable: {reason}")]
    Unavailable {
        /// Description of the failure.
        reason: String,
    },

    /// The surface has no such channel.
    #[error("unknown channel: {channel}")]
    UnknownChannel {
        /// The channel that was requested.
        channel: ChannelKey,
    },
}

impl SurfaceError {
    /// Creates an unavailable error with the given reason.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Failures of the change-notification subscription
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// `subscribe` called while a subscription is already active.
    #[error("change source already subscribed")]
    AlreadySubscribed,
}

impl From<SourceError> for VolumeError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::AlreadySubscribed => VolumeError::AlreadyInitialized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_error_display() {
        assert_eq!(
            VolumeError::NotInitialized.to_string(),
            "volume mirror not initialized"
        );
        assert!(VolumeError::PermissionDenied
            .to_string()
            .contains("permission denied"));
    }

    #[test]
    fn test_surface_error_display() {
        let err = SurfaceError::UnknownChannel {
            channel: ChannelKey::MUSIC,
        };
        assert_eq!(err.to_string(), "unknown channel: STREAM_MUSIC");

        let err = SurfaceError::unavailable("driver gone");
        assert_eq!(err.to_string(), "control surface unavailable: driver gone");
    }

    #[test]
    fn test_source_error_maps_to_already_initialized() {
        let err: VolumeError = SourceError::AlreadySubscribed.into();
        assert!(matches!(err, VolumeError::AlreadyInitialized));
    }

    #[test]
    fn test_surface_error_wraps() {
        let err: VolumeError = SurfaceError::unavailable("x").into();
        assert!(matches!(err, VolumeError::Surface(_)));
    }
}
