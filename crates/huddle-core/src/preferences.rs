use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::events::DeviceLabels;

/// Join-time preferences remembered across meetings.
///
/// Preferred device ids win over first-device defaults during join when the
/// device is still enumerated.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct JoinPreferences {
    #[serde(default)]
    pub preferred_audio_input: Option<String>,
    #[serde(default)]
    pub preferred_audio_output: Option<String>,
    #[serde(default)]
    pub preferred_video_input: Option<String>,
    #[serde(default = "default_device_labels")]
    pub default_device_labels: DeviceLabels,
}

fn default_device_labels() -> DeviceLabels {
    DeviceLabels::AudioAndVideo
}

impl Default for JoinPreferences {
    fn default() -> Self {
        Self {
            preferred_audio_input: None,
            preferred_audio_output: None,
            preferred_video_input: None,
            default_device_labels: DeviceLabels::AudioAndVideo,
        }
    }
}

/// Persists [`JoinPreferences`] as JSON under a data directory.
pub struct PreferencesStore {
    preferences: Mutex<JoinPreferences>,
    file_path: PathBuf,
}

impl PreferencesStore {
    pub fn new(data_dir: &str) -> Self {
        let file_path = PathBuf::from(data_dir).join("preferences.json");
        let preferences = Self::load(&file_path);
        Self {
            preferences: Mutex::new(preferences),
            file_path,
        }
    }

    pub fn get(&self) -> JoinPreferences {
        self.preferences.lock().unwrap().clone()
    }

    pub fn set_preferred_audio_input(&self, device_id: Option<String>) {
        self.preferences.lock().unwrap().preferred_audio_input = device_id;
        self.save();
    }

    pub fn set_preferred_audio_output(&self, device_id: Option<String>) {
        self.preferences.lock().unwrap().preferred_audio_output = device_id;
        self.save();
    }

    pub fn set_preferred_video_input(&self, device_id: Option<String>) {
        self.preferences.lock().unwrap().preferred_video_input = device_id;
        self.save();
    }

    pub fn set_default_device_labels(&self, labels: DeviceLabels) {
        self.preferences.lock().unwrap().default_device_labels = labels;
        self.save();
    }

    fn save(&self) {
        let preferences = self.preferences.lock().unwrap().clone();
        if let Some(parent) = self.file_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(json) = serde_json::to_string_pretty(&preferences) {
            let _ = std::fs::write(&self.file_path, json);
        }
    }

    fn load(path: &PathBuf) -> JoinPreferences {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => JoinPreferences::default(),
        }
    }
}
