/// Descriptor of one media device, as enumerated by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDeviceInfo {
    pub device_id: String,
    pub label: String,
}

impl MediaDeviceInfo {
    pub fn new(device_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            label: label.into(),
        }
    }
}

/// Holds the enumerated device lists and the current selection per category.
///
/// Lists are replaced wholesale on each refresh; there is no diffing.
/// Updated by the facade. Read by UI layers.
#[derive(Debug, Clone, Default)]
pub struct DeviceCatalog {
    audio_inputs: Vec<MediaDeviceInfo>,
    audio_outputs: Vec<MediaDeviceInfo>,
    video_inputs: Vec<MediaDeviceInfo>,
    selected_audio_input: Option<String>,
    selected_audio_output: Option<String>,
    selected_video_input: Option<String>,
}

impl DeviceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_audio_inputs(&mut self, devices: Vec<MediaDeviceInfo>) {
        self.audio_inputs = devices;
    }

    pub fn replace_audio_outputs(&mut self, devices: Vec<MediaDeviceInfo>) {
        self.audio_outputs = devices;
    }

    pub fn replace_video_inputs(&mut self, devices: Vec<MediaDeviceInfo>) {
        self.video_inputs = devices;
    }

    pub fn audio_inputs(&self) -> &[MediaDeviceInfo] {
        &self.audio_inputs
    }

    pub fn audio_outputs(&self) -> &[MediaDeviceInfo] {
        &self.audio_outputs
    }

    pub fn video_inputs(&self) -> &[MediaDeviceInfo] {
        &self.video_inputs
    }

    pub fn set_selected_audio_input(&mut self, device_id: Option<String>) {
        self.selected_audio_input = device_id;
    }

    pub fn set_selected_audio_output(&mut self, device_id: Option<String>) {
        self.selected_audio_output = device_id;
    }

    pub fn set_selected_video_input(&mut self, device_id: Option<String>) {
        self.selected_video_input = device_id;
    }

    pub fn selected_audio_input(&self) -> Option<&str> {
        self.selected_audio_input.as_deref()
    }

    pub fn selected_audio_output(&self) -> Option<&str> {
        self.selected_audio_output.as_deref()
    }

    pub fn selected_video_input(&self) -> Option<&str> {
        self.selected_video_input.as_deref()
    }

    /// Default selection for a category: the preferred device when it is
    /// present in the list, otherwise the first device.
    pub fn default_audio_input(&self, preferred: Option<&str>) -> Option<&MediaDeviceInfo> {
        Self::pick(&self.audio_inputs, preferred)
    }

    pub fn default_audio_output(&self, preferred: Option<&str>) -> Option<&MediaDeviceInfo> {
        Self::pick(&self.audio_outputs, preferred)
    }

    pub fn default_video_input(&self, preferred: Option<&str>) -> Option<&MediaDeviceInfo> {
        Self::pick(&self.video_inputs, preferred)
    }

    fn pick<'a>(
        devices: &'a [MediaDeviceInfo],
        preferred: Option<&str>,
    ) -> Option<&'a MediaDeviceInfo> {
        preferred
            .and_then(|id| devices.iter().find(|d| d.device_id == id))
            .or_else(|| devices.first())
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_device(id: &str) -> MediaDeviceInfo {
        MediaDeviceInfo::new(id, format!("Device {id}"))
    }

    #[test]
    fn replace_is_wholesale() {
        let mut catalog = DeviceCatalog::new();
        catalog.replace_audio_inputs(vec![make_device("a"), make_device("b")]);
        catalog.replace_audio_inputs(vec![make_device("c")]);
        assert_eq!(catalog.audio_inputs().len(), 1);
        assert_eq!(catalog.audio_inputs()[0].device_id, "c");
    }

    #[test]
    fn categories_are_independent() {
        let mut catalog = DeviceCatalog::new();
        catalog.replace_audio_inputs(vec![make_device("mic")]);
        catalog.replace_audio_outputs(vec![make_device("spk")]);
        catalog.replace_video_inputs(vec![make_device("cam")]);
        assert_eq!(catalog.audio_inputs()[0].device_id, "mic");
        assert_eq!(catalog.audio_outputs()[0].device_id, "spk");
        assert_eq!(catalog.video_inputs()[0].device_id, "cam");
    }

    #[test]
    fn default_is_first_device() {
        let mut catalog = DeviceCatalog::new();
        catalog.replace_audio_inputs(vec![make_device("a"), make_device("b")]);
        assert_eq!(catalog.default_audio_input(None).unwrap().device_id, "a");
    }

    #[test]
    fn default_honors_preferred_when_present() {
        let mut catalog = DeviceCatalog::new();
        catalog.replace_audio_inputs(vec![make_device("a"), make_device("b")]);
        assert_eq!(
            catalog.default_audio_input(Some("b")).unwrap().device_id,
            "b"
        );
    }

    #[test]
    fn default_falls_back_when_preferred_missing() {
        let mut catalog = DeviceCatalog::new();
        catalog.replace_video_inputs(vec![make_device("cam-1")]);
        assert_eq!(
            catalog.default_video_input(Some("gone")).unwrap().device_id,
            "cam-1"
        );
    }

    #[test]
    fn default_on_empty_list_is_none() {
        let catalog = DeviceCatalog::new();
        assert!(catalog.default_audio_output(None).is_none());
        assert!(catalog.default_audio_output(Some("x")).is_none());
    }

    #[test]
    fn selections_round_trip() {
        let mut catalog = DeviceCatalog::new();
        catalog.set_selected_audio_input(Some("mic".to_string()));
        catalog.set_selected_video_input(Some("cam".to_string()));
        assert_eq!(catalog.selected_audio_input(), Some("mic"));
        assert_eq!(catalog.selected_video_input(), Some("cam"));
        catalog.set_selected_video_input(None);
        assert_eq!(catalog.selected_video_input(), None);
    }

    #[test]
    fn clear_resets_everything() {
        let mut catalog = DeviceCatalog::new();
        catalog.replace_audio_inputs(vec![make_device("a")]);
        catalog.set_selected_audio_input(Some("a".to_string()));
        catalog.clear();
        assert!(catalog.audio_inputs().is_empty());
        assert!(catalog.selected_audio_input().is_none());
    }
}
