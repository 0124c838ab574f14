use thiserror::Error;

/// Error reported by the wrapped session layer.
///
/// The session is externally owned; its failures reach the facade as an
/// opaque message.
#[derive(Debug, Clone, Error)]
#[error("session error: {0}")]
pub struct SessionError(pub String);

impl SessionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors returned by the meeting facade.
///
/// Device-selection and label-acquisition failures carry a fixed message;
/// the underlying session error is logged, not propagated.
#[derive(Debug, Error)]
pub enum MeetingError {
    #[error("failed to join meeting: {0}")]
    Join(String),
    #[error("failed to start meeting audio/video: {0}")]
    Start(String),
    #[error("no active meeting session")]
    NotJoined,
    #[error("failed to select audio input device")]
    AudioInputSelection,
    #[error("failed to select audio output device")]
    AudioOutputSelection,
    #[error("failed to select video input device")]
    VideoInputSelection,
    #[error("failed to acquire device labels")]
    DeviceLabelAcquisition,
    #[error("provisioning request failed: {0}")]
    Http(String),
    #[error("provisioning rejected: {0}")]
    Provision(String),
    #[error("invalid meeting url: {0}")]
    InvalidUrl(String),
}
