//! Huddle meeting facade.
//!
//! Pure Rust crate bridging an externally-owned audio/video session to UI
//! subscribers. Media transport, device capture, and signaling stay behind
//! the [`SessionDriver`] seam; this crate tracks meeting status, device
//! lists and selections, permission status, and active speakers, and
//! republishes changes per topic.

pub mod devices;
pub mod errors;
pub mod events;
pub mod manager;
pub mod preferences;
pub mod provision;
pub mod session;

pub use devices::{DeviceCatalog, MediaDeviceInfo};
pub use errors::{MeetingError, SessionError};
pub use events::{
    CustomLabelTrigger, DeviceLabelTrigger, DeviceLabels, MeetingStatus, Observer,
    PermissionStatus, Topic,
};
pub use manager::{JoinOptions, MeetingManager, SessionHandle};
pub use preferences::{JoinPreferences, PreferencesStore};
pub use provision::ProvisioningClient;
pub use session::{
    CaptureHandle, MediaConstraints, MeetingConfig, SessionDriver, SessionEvent, SessionFactory,
    SessionStopCode,
};
