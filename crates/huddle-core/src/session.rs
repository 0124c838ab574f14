use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::devices::MediaDeviceInfo;
use crate::errors::SessionError;

/// Credentials and routing information for one attendee in one meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingConfig {
    pub meeting_id: String,
    pub attendee_id: String,
    pub join_token: String,
    #[serde(default)]
    pub media_region: Option<String>,
}

/// Opaque token for a live media capture acquired from the platform.
///
/// The facade only moves it from [`SessionDriver::request_capture`] to
/// [`SessionDriver::adopt_capture`]; it never inspects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureHandle(u64);

impl CaptureHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Constraints passed to the platform media-permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

/// Status code reported by the session when it stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStopCode {
    /// Normal stop without a specific cause.
    Ok,
    /// The meeting was ended for all attendees.
    MeetingEnded,
    /// The local attendee left the meeting.
    Left,
    /// The attendee joined the same meeting from another device.
    AudioJoinedFromAnotherDevice,
    /// Media transport dropped.
    AudioDisconnected,
    /// Connection quality degraded past the usable threshold.
    ConnectionHealthDegraded,
    AuthenticationRejected,
    CallAtCapacity,
    SignalingBadRequest,
    InternalServerError,
}

impl SessionStopCode {
    /// True when the stop was caused by a failure rather than a normal end.
    pub fn is_failure(&self) -> bool {
        !matches!(
            self,
            Self::Ok | Self::MeetingEnded | Self::Left | Self::AudioJoinedFromAnotherDevice
        )
    }

    /// True when the failure cannot be recovered within the current session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationRejected
                | Self::CallAtCapacity
                | Self::SignalingBadRequest
                | Self::InternalServerError
        )
    }
}

/// Events the session delivers to its lifecycle observer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Started,
    Stopped(SessionStopCode),
    ActiveSpeakersChanged(Vec<String>),
    /// A device was connected or disconnected; lists must be re-enumerated.
    DevicesChanged,
    /// Named event from the session's generic observer surface.
    Generic {
        name: String,
        payload: serde_json::Value,
    },
}

/// Control surface of the externally-owned audio/video session.
///
/// The facade treats this as a black box: media transport, device capture,
/// and signaling all live behind it.
#[async_trait]
pub trait SessionDriver: Send + Sync {
    async fn start(&self) -> Result<(), SessionError>;
    async fn stop(&self) -> Result<(), SessionError>;

    /// Release capture devices and media resources held by the session.
    async fn release_media(&self);

    async fn list_audio_inputs(&self) -> Result<Vec<MediaDeviceInfo>, SessionError>;
    async fn list_audio_outputs(&self) -> Result<Vec<MediaDeviceInfo>, SessionError>;
    async fn list_video_inputs(&self) -> Result<Vec<MediaDeviceInfo>, SessionError>;

    async fn choose_audio_input(&self, device_id: &str) -> Result<(), SessionError>;
    async fn choose_audio_output(&self, device_id: &str) -> Result<(), SessionError>;
    async fn choose_video_input(&self, device_id: &str) -> Result<(), SessionError>;
    async fn stop_video_input(&self) -> Result<(), SessionError>;

    /// Request media permissions from the platform and return a handle to
    /// the resulting capture.
    async fn request_capture(
        &self,
        constraints: MediaConstraints,
    ) -> Result<CaptureHandle, SessionError>;

    /// Hand a capture acquired during device-label acquisition to the
    /// session.
    async fn adopt_capture(&self, handle: CaptureHandle) -> Result<(), SessionError>;
}

/// Constructs sessions from meeting credentials.
///
/// Returns the session handle together with the receiver its lifecycle
/// events arrive on.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create(
        &self,
        config: &MeetingConfig,
    ) -> Result<(Arc<dyn SessionDriver>, UnboundedReceiver<SessionEvent>), SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_end_codes_are_not_failures() {
        for code in [
            SessionStopCode::Ok,
            SessionStopCode::MeetingEnded,
            SessionStopCode::Left,
            SessionStopCode::AudioJoinedFromAnotherDevice,
        ] {
            assert!(!code.is_failure(), "{code:?}");
            assert!(!code.is_terminal(), "{code:?}");
        }
    }

    #[test]
    fn transport_failures_are_recoverable() {
        for code in [
            SessionStopCode::AudioDisconnected,
            SessionStopCode::ConnectionHealthDegraded,
        ] {
            assert!(code.is_failure(), "{code:?}");
            assert!(!code.is_terminal(), "{code:?}");
        }
    }

    #[test]
    fn protocol_failures_are_terminal() {
        for code in [
            SessionStopCode::AuthenticationRejected,
            SessionStopCode::CallAtCapacity,
            SessionStopCode::SignalingBadRequest,
            SessionStopCode::InternalServerError,
        ] {
            assert!(code.is_failure(), "{code:?}");
            assert!(code.is_terminal(), "{code:?}");
        }
    }

    #[test]
    fn meeting_config_deserializes_without_region() {
        let config: MeetingConfig = serde_json::from_str(
            r#"{"meeting_id":"m1","attendee_id":"a1","join_token":"t1"}"#,
        )
        .unwrap();
        assert_eq!(config.meeting_id, "m1");
        assert_eq!(config.media_region, None);
    }
}
