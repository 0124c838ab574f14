use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::devices::{DeviceCatalog, MediaDeviceInfo};
use crate::errors::MeetingError;
use crate::events::{
    DeviceLabelTrigger, DeviceLabels, MeetingStatus, Observer, PermissionStatus, Topic,
};
use crate::preferences::JoinPreferences;
use crate::session::{
    MediaConstraints, MeetingConfig, SessionDriver, SessionEvent, SessionFactory, SessionStopCode,
};

/// Handle to the session as exposed to subscribers. `None` between meetings.
pub type SessionHandle = Option<Arc<dyn SessionDriver>>;

/// Options for a single `join` call.
#[derive(Debug, Clone, Default)]
pub struct JoinOptions {
    /// How device labels (media permissions) are acquired during the join.
    pub device_labels: DeviceLabelTrigger,
}

/// Per-topic subscriber registries of the facade.
///
/// Meeting status, active speakers, and device permission replay their
/// cached value to new subscribers; the rest are fire-only.
struct Topics {
    session: Topic<SessionHandle>,
    meeting_status: Topic<MeetingStatus>,
    active_speakers: Topic<Vec<String>>,
    device_permission: Topic<PermissionStatus>,
    selected_audio_input: Topic<Option<String>>,
    selected_audio_output: Topic<Option<String>>,
    selected_video_input: Topic<Option<String>>,
    label_trigger: Topic<DeviceLabelTrigger>,
    session_events: Topic<SessionEvent>,
}

impl Topics {
    fn new() -> Self {
        Self {
            session: Topic::new(),
            meeting_status: Topic::replaying(MeetingStatus::Loading),
            active_speakers: Topic::replaying(Vec::new()),
            device_permission: Topic::replaying(PermissionStatus::Unset),
            selected_audio_input: Topic::new(),
            selected_audio_output: Topic::new(),
            selected_video_input: Topic::new(),
            label_trigger: Topic::new(),
            session_events: Topic::new(),
        }
    }
}

/// State shared between facade methods and the session event loop.
struct Shared {
    driver: Mutex<Option<Arc<dyn SessionDriver>>>,
    devices: Mutex<DeviceCatalog>,
    joined_at: Mutex<Option<DateTime<Utc>>>,
    topics: Topics,
}

impl Shared {
    /// Reset to the initial state. The session and active-speaker topics
    /// are republished as cleared; status and permission caches reset
    /// without a publication so late subscribers replay initial values.
    async fn teardown(&self) {
        *self.driver.lock().await = None;
        self.devices.lock().await.clear();
        *self.joined_at.lock().await = None;
        self.topics.meeting_status.reset(MeetingStatus::Loading);
        self.topics.device_permission.reset(PermissionStatus::Unset);
        self.topics.session.publish(&None);
        self.topics.active_speakers.publish(&Vec::new());
    }

    /// Replace all three device lists wholesale from the session.
    /// A category that fails to enumerate keeps its previous list.
    async fn refresh_device_lists(&self, driver: &Arc<dyn SessionDriver>) {
        let mut catalog = self.devices.lock().await;
        match driver.list_audio_inputs().await {
            Ok(list) => catalog.replace_audio_inputs(list),
            Err(e) => tracing::warn!("audio input enumeration failed: {e}"),
        }
        match driver.list_audio_outputs().await {
            Ok(list) => catalog.replace_audio_outputs(list),
            Err(e) => tracing::warn!("audio output enumeration failed: {e}"),
        }
        match driver.list_video_inputs().await {
            Ok(list) => catalog.replace_video_inputs(list),
            Err(e) => tracing::warn!("video input enumeration failed: {e}"),
        }
    }
}

/// Bridges an externally-owned audio/video session to UI subscribers.
///
/// One instance per meeting: `join` constructs the session through the
/// factory, `leave` returns the facade to its initial state. All state the
/// facade caches is published on a per-topic basis; see the
/// `subscribe_to_*` methods.
pub struct MeetingManager {
    id: Uuid,
    factory: Arc<dyn SessionFactory>,
    preferences: JoinPreferences,
    shared: Arc<Shared>,
    event_task: Mutex<Option<JoinHandle<()>>>,
    label_trigger: Mutex<DeviceLabelTrigger>,
}

impl MeetingManager {
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        Self::with_preferences(factory, JoinPreferences::default())
    }

    pub fn with_preferences(factory: Arc<dyn SessionFactory>, preferences: JoinPreferences) -> Self {
        Self {
            id: Uuid::new_v4(),
            factory,
            preferences,
            shared: Arc::new(Shared {
                driver: Mutex::new(None),
                devices: Mutex::new(DeviceCatalog::new()),
                joined_at: Mutex::new(None),
                topics: Topics::new(),
            }),
            event_task: Mutex::new(None),
            label_trigger: Mutex::new(DeviceLabelTrigger::default()),
        }
    }

    // ── lifecycle ────────────────────────────────────────────────────────

    /// Construct the session, observe its lifecycle, acquire device labels
    /// per `options`, and select default devices.
    ///
    /// Device-label and device-selection failures are logged and do not
    /// abort the join.
    pub async fn join(
        &self,
        config: MeetingConfig,
        options: JoinOptions,
    ) -> Result<(), MeetingError> {
        self.shared
            .topics
            .meeting_status
            .publish(&MeetingStatus::Loading);

        let (driver, events) = match self.factory.create(&config).await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!(manager = %self.id, "session construction failed: {e}");
                self.shared
                    .topics
                    .meeting_status
                    .publish(&MeetingStatus::Failed);
                return Err(MeetingError::Join(e.to_string()));
            }
        };

        *self.shared.driver.lock().await = Some(driver.clone());
        self.shared.topics.session.publish(&Some(driver.clone()));

        // Lifecycle observation: one task per joined session.
        let task = tokio::spawn(Self::event_loop(self.shared.clone(), events));
        *self.event_task.lock().await = Some(task);

        *self.label_trigger.lock().await = options.device_labels.clone();
        if let Err(e) = self
            .acquire_device_labels(&driver, &options.device_labels)
            .await
        {
            tracing::warn!(manager = %self.id, "device label acquisition failed during join: {e}");
        }

        self.shared.refresh_device_lists(&driver).await;
        self.select_default_devices().await;

        *self.shared.joined_at.lock().await = Some(Utc::now());
        self.shared
            .topics
            .meeting_status
            .publish(&MeetingStatus::Succeeded);
        tracing::info!(manager = %self.id, meeting = %config.meeting_id, "joined meeting");
        Ok(())
    }

    /// Start meeting audio/video.
    pub async fn start(&self) -> Result<(), MeetingError> {
        let driver = self.current_driver().await.ok_or(MeetingError::NotJoined)?;
        driver.start().await.map_err(|e| {
            tracing::error!(manager = %self.id, "session start failed: {e}");
            MeetingError::Start(e.to_string())
        })
    }

    /// Leave the meeting and reset the facade to its initial state.
    ///
    /// Safe to call when the session has already stopped.
    pub async fn leave(&self) {
        if let Some(task) = self.event_task.lock().await.take() {
            task.abort();
        }
        let driver = self.shared.driver.lock().await.clone();
        if let Some(driver) = driver {
            if let Err(e) = driver.stop().await {
                tracing::warn!(manager = %self.id, "error stopping session: {e}");
            }
            driver.release_media().await;
        }
        *self.label_trigger.lock().await = DeviceLabelTrigger::default();
        self.shared.teardown().await;
        tracing::info!(manager = %self.id, "left meeting");
    }

    // ── device selection ─────────────────────────────────────────────────

    pub async fn select_audio_input_device(&self, device_id: &str) -> Result<(), MeetingError> {
        let driver = self.current_driver().await.ok_or(MeetingError::NotJoined)?;
        match driver.choose_audio_input(device_id).await {
            Ok(()) => {
                let selected = Some(device_id.to_string());
                self.shared
                    .devices
                    .lock()
                    .await
                    .set_selected_audio_input(selected.clone());
                self.shared.topics.selected_audio_input.publish(&selected);
                Ok(())
            }
            Err(e) => {
                tracing::error!(manager = %self.id, device = device_id, "audio input selection failed: {e}");
                Err(MeetingError::AudioInputSelection)
            }
        }
    }

    pub async fn select_audio_output_device(&self, device_id: &str) -> Result<(), MeetingError> {
        let driver = self.current_driver().await.ok_or(MeetingError::NotJoined)?;
        match driver.choose_audio_output(device_id).await {
            Ok(()) => {
                let selected = Some(device_id.to_string());
                self.shared
                    .devices
                    .lock()
                    .await
                    .set_selected_audio_output(selected.clone());
                self.shared.topics.selected_audio_output.publish(&selected);
                Ok(())
            }
            Err(e) => {
                tracing::error!(manager = %self.id, device = device_id, "audio output selection failed: {e}");
                Err(MeetingError::AudioOutputSelection)
            }
        }
    }

    pub async fn select_video_input_device(&self, device_id: &str) -> Result<(), MeetingError> {
        let driver = self.current_driver().await.ok_or(MeetingError::NotJoined)?;
        match driver.choose_video_input(device_id).await {
            Ok(()) => {
                let selected = Some(device_id.to_string());
                self.shared
                    .devices
                    .lock()
                    .await
                    .set_selected_video_input(selected.clone());
                self.shared.topics.selected_video_input.publish(&selected);
                Ok(())
            }
            Err(e) => {
                tracing::error!(manager = %self.id, device = device_id, "video input selection failed: {e}");
                Err(MeetingError::VideoInputSelection)
            }
        }
    }

    pub async fn unselect_video_input_device(&self) -> Result<(), MeetingError> {
        let driver = self.current_driver().await.ok_or(MeetingError::NotJoined)?;
        match driver.stop_video_input().await {
            Ok(()) => {
                self.shared
                    .devices
                    .lock()
                    .await
                    .set_selected_video_input(None);
                self.shared.topics.selected_video_input.publish(&None);
                Ok(())
            }
            Err(e) => {
                tracing::error!(manager = %self.id, "video input unselection failed: {e}");
                Err(MeetingError::VideoInputSelection)
            }
        }
    }

    // ── device labels ────────────────────────────────────────────────────

    /// Re-run device-label acquisition with a new trigger, notify
    /// trigger-change listeners, and refresh the device lists.
    ///
    /// Unlike during `join`, acquisition failures are returned to the
    /// caller.
    pub async fn invoke_device_provider(
        &self,
        trigger: DeviceLabelTrigger,
    ) -> Result<(), MeetingError> {
        let driver = self.current_driver().await.ok_or(MeetingError::NotJoined)?;
        *self.label_trigger.lock().await = trigger.clone();
        self.shared.topics.label_trigger.publish(&trigger);
        self.acquire_device_labels(&driver, &trigger).await?;
        self.shared.refresh_device_lists(&driver).await;
        Ok(())
    }

    async fn acquire_device_labels(
        &self,
        driver: &Arc<dyn SessionDriver>,
        trigger: &DeviceLabelTrigger,
    ) -> Result<(), MeetingError> {
        match trigger {
            DeviceLabelTrigger::Preset(DeviceLabels::None) => Ok(()),
            DeviceLabelTrigger::Preset(labels) => {
                self.shared
                    .topics
                    .device_permission
                    .publish(&PermissionStatus::InProgress);
                match driver.request_capture(MediaConstraints::from(*labels)).await {
                    Ok(handle) => {
                        self.shared
                            .topics
                            .device_permission
                            .publish(&PermissionStatus::Granted);
                        driver.adopt_capture(handle).await.map_err(|e| {
                            tracing::error!(manager = %self.id, "session rejected label capture: {e}");
                            MeetingError::DeviceLabelAcquisition
                        })
                    }
                    Err(e) => {
                        self.shared
                            .topics
                            .device_permission
                            .publish(&PermissionStatus::Denied);
                        tracing::error!(manager = %self.id, "media permission request failed: {e}");
                        Err(MeetingError::DeviceLabelAcquisition)
                    }
                }
            }
            // A custom trigger replaces the built-in permission flow and
            // leaves permission status untouched.
            DeviceLabelTrigger::Custom(callback) => match callback.as_ref()().await {
                Ok(handle) => driver.adopt_capture(handle).await.map_err(|e| {
                    tracing::error!(manager = %self.id, "session rejected label capture: {e}");
                    MeetingError::DeviceLabelAcquisition
                }),
                Err(e) => {
                    tracing::error!(manager = %self.id, "custom device label trigger failed: {e}");
                    Err(MeetingError::DeviceLabelAcquisition)
                }
            },
        }
    }

    /// Select the default device per category: the preferred device when it
    /// is enumerated, otherwise the first. Selection failures are logged
    /// and skipped.
    async fn select_default_devices(&self) {
        let (audio_input, audio_output, video_input) = {
            let catalog = self.shared.devices.lock().await;
            (
                catalog
                    .default_audio_input(self.preferences.preferred_audio_input.as_deref())
                    .map(|d| d.device_id.clone()),
                catalog
                    .default_audio_output(self.preferences.preferred_audio_output.as_deref())
                    .map(|d| d.device_id.clone()),
                catalog
                    .default_video_input(self.preferences.preferred_video_input.as_deref())
                    .map(|d| d.device_id.clone()),
            )
        };

        if let Some(id) = audio_input {
            if let Err(e) = self.select_audio_input_device(&id).await {
                tracing::warn!(manager = %self.id, device = %id, "default audio input selection failed: {e}");
            }
        }
        if let Some(id) = audio_output {
            if let Err(e) = self.select_audio_output_device(&id).await {
                tracing::warn!(manager = %self.id, device = %id, "default audio output selection failed: {e}");
            }
        }
        if let Some(id) = video_input {
            if let Err(e) = self.select_video_input_device(&id).await {
                tracing::warn!(manager = %self.id, device = %id, "default video input selection failed: {e}");
            }
        }
    }

    // ── state getters ────────────────────────────────────────────────────

    pub async fn session(&self) -> SessionHandle {
        self.shared.driver.lock().await.clone()
    }

    pub fn meeting_status(&self) -> MeetingStatus {
        self.shared
            .topics
            .meeting_status
            .current()
            .unwrap_or(MeetingStatus::Loading)
    }

    pub fn device_permission(&self) -> PermissionStatus {
        self.shared
            .topics
            .device_permission
            .current()
            .unwrap_or(PermissionStatus::Unset)
    }

    pub fn active_speakers(&self) -> Vec<String> {
        self.shared
            .topics
            .active_speakers
            .current()
            .unwrap_or_default()
    }

    pub async fn audio_input_devices(&self) -> Vec<MediaDeviceInfo> {
        self.shared.devices.lock().await.audio_inputs().to_vec()
    }

    pub async fn audio_output_devices(&self) -> Vec<MediaDeviceInfo> {
        self.shared.devices.lock().await.audio_outputs().to_vec()
    }

    pub async fn video_input_devices(&self) -> Vec<MediaDeviceInfo> {
        self.shared.devices.lock().await.video_inputs().to_vec()
    }

    pub async fn selected_audio_input_device(&self) -> Option<String> {
        self.shared
            .devices
            .lock()
            .await
            .selected_audio_input()
            .map(str::to_string)
    }

    pub async fn selected_audio_output_device(&self) -> Option<String> {
        self.shared
            .devices
            .lock()
            .await
            .selected_audio_output()
            .map(str::to_string)
    }

    pub async fn selected_video_input_device(&self) -> Option<String> {
        self.shared
            .devices
            .lock()
            .await
            .selected_video_input()
            .map(str::to_string)
    }

    pub async fn joined_at(&self) -> Option<DateTime<Utc>> {
        *self.shared.joined_at.lock().await
    }

    pub async fn device_label_trigger(&self) -> DeviceLabelTrigger {
        self.label_trigger.lock().await.clone()
    }

    // ── subscriptions ────────────────────────────────────────────────────

    pub fn subscribe_to_session(&self, observer: Arc<dyn Observer<SessionHandle>>) {
        self.shared.topics.session.subscribe(observer);
    }

    pub fn unsubscribe_from_session(&self, observer: &Arc<dyn Observer<SessionHandle>>) {
        self.shared.topics.session.unsubscribe(observer);
    }

    pub fn subscribe_to_meeting_status(&self, observer: Arc<dyn Observer<MeetingStatus>>) {
        self.shared.topics.meeting_status.subscribe(observer);
    }

    pub fn unsubscribe_from_meeting_status(&self, observer: &Arc<dyn Observer<MeetingStatus>>) {
        self.shared.topics.meeting_status.unsubscribe(observer);
    }

    pub fn subscribe_to_active_speakers(&self, observer: Arc<dyn Observer<Vec<String>>>) {
        self.shared.topics.active_speakers.subscribe(observer);
    }

    pub fn unsubscribe_from_active_speakers(&self, observer: &Arc<dyn Observer<Vec<String>>>) {
        self.shared.topics.active_speakers.unsubscribe(observer);
    }

    pub fn subscribe_to_device_permission(&self, observer: Arc<dyn Observer<PermissionStatus>>) {
        self.shared.topics.device_permission.subscribe(observer);
    }

    pub fn unsubscribe_from_device_permission(
        &self,
        observer: &Arc<dyn Observer<PermissionStatus>>,
    ) {
        self.shared.topics.device_permission.unsubscribe(observer);
    }

    pub fn subscribe_to_selected_audio_input(&self, observer: Arc<dyn Observer<Option<String>>>) {
        self.shared.topics.selected_audio_input.subscribe(observer);
    }

    pub fn unsubscribe_from_selected_audio_input(
        &self,
        observer: &Arc<dyn Observer<Option<String>>>,
    ) {
        self.shared.topics.selected_audio_input.unsubscribe(observer);
    }

    pub fn subscribe_to_selected_audio_output(&self, observer: Arc<dyn Observer<Option<String>>>) {
        self.shared.topics.selected_audio_output.subscribe(observer);
    }

    pub fn unsubscribe_from_selected_audio_output(
        &self,
        observer: &Arc<dyn Observer<Option<String>>>,
    ) {
        self.shared
            .topics
            .selected_audio_output
            .unsubscribe(observer);
    }

    pub fn subscribe_to_selected_video_input(&self, observer: Arc<dyn Observer<Option<String>>>) {
        self.shared.topics.selected_video_input.subscribe(observer);
    }

    pub fn unsubscribe_from_selected_video_input(
        &self,
        observer: &Arc<dyn Observer<Option<String>>>,
    ) {
        self.shared.topics.selected_video_input.unsubscribe(observer);
    }

    pub fn subscribe_to_device_label_trigger(
        &self,
        observer: Arc<dyn Observer<DeviceLabelTrigger>>,
    ) {
        self.shared.topics.label_trigger.subscribe(observer);
    }

    pub fn unsubscribe_from_device_label_trigger(
        &self,
        observer: &Arc<dyn Observer<DeviceLabelTrigger>>,
    ) {
        self.shared.topics.label_trigger.unsubscribe(observer);
    }

    pub fn subscribe_to_session_events(&self, observer: Arc<dyn Observer<SessionEvent>>) {
        self.shared.topics.session_events.subscribe(observer);
    }

    pub fn unsubscribe_from_session_events(&self, observer: &Arc<dyn Observer<SessionEvent>>) {
        self.shared.topics.session_events.unsubscribe(observer);
    }

    // ── internals ────────────────────────────────────────────────────────

    async fn current_driver(&self) -> Option<Arc<dyn SessionDriver>> {
        self.shared.driver.lock().await.clone()
    }

    fn stop_code_to_status(code: SessionStopCode) -> MeetingStatus {
        match code {
            SessionStopCode::MeetingEnded => MeetingStatus::Ended,
            SessionStopCode::Left => MeetingStatus::Left,
            SessionStopCode::AudioJoinedFromAnotherDevice => MeetingStatus::JoinedFromAnotherDevice,
            code if code.is_terminal() => MeetingStatus::TerminalFailure,
            code if code.is_failure() => MeetingStatus::Failed,
            _ => MeetingStatus::Ended,
        }
    }

    async fn event_loop(shared: Arc<Shared>, mut events: UnboundedReceiver<SessionEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Started => {
                    shared
                        .topics
                        .meeting_status
                        .publish(&MeetingStatus::Succeeded);
                }

                SessionEvent::ActiveSpeakersChanged(speakers) => {
                    shared.topics.active_speakers.publish(&speakers);
                }

                SessionEvent::DevicesChanged => {
                    let driver = shared.driver.lock().await.clone();
                    if let Some(driver) = driver {
                        shared.refresh_device_lists(&driver).await;
                    }
                }

                SessionEvent::Generic { .. } => {
                    shared.topics.session_events.publish(&event);
                }

                SessionEvent::Stopped(code) => {
                    let status = Self::stop_code_to_status(code);
                    tracing::info!("session stopped: {code:?} -> {status:?}");
                    shared.topics.meeting_status.publish(&status);
                    // The session stopped itself; releasing media is still
                    // the facade's responsibility.
                    let driver = shared.driver.lock().await.clone();
                    if let Some(driver) = driver {
                        driver.release_media().await;
                    }
                    shared.teardown().await;
                    break;
                }
            }
        }
        tracing::debug!("session event loop ended");
    }
}
