use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::errors::SessionError;
use crate::session::{CaptureHandle, MediaConstraints};

/// Meeting lifecycle status as seen by UI subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingStatus {
    Loading,
    Succeeded,
    Failed,
    Ended,
    Left,
    JoinedFromAnotherDevice,
    TerminalFailure,
}

/// Progress of the media-permission request run during device-label
/// acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Unset,
    InProgress,
    Granted,
    Denied,
}

/// Which device categories a join requests labels (permissions) for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceLabels {
    None,
    Audio,
    Video,
    AudioAndVideo,
}

impl From<DeviceLabels> for MediaConstraints {
    fn from(labels: DeviceLabels) -> Self {
        match labels {
            DeviceLabels::None => Self {
                audio: false,
                video: false,
            },
            DeviceLabels::Audio => Self {
                audio: true,
                video: false,
            },
            DeviceLabels::Video => Self {
                audio: false,
                video: true,
            },
            DeviceLabels::AudioAndVideo => Self {
                audio: true,
                video: true,
            },
        }
    }
}

/// Callback invoked in place of the built-in permission request.
pub type CustomLabelTrigger =
    Arc<dyn Fn() -> BoxFuture<'static, Result<CaptureHandle, SessionError>> + Send + Sync>;

/// How device labels are acquired during `join` and
/// `invoke_device_provider`.
#[derive(Clone)]
pub enum DeviceLabelTrigger {
    Preset(DeviceLabels),
    Custom(CustomLabelTrigger),
}

impl Default for DeviceLabelTrigger {
    fn default() -> Self {
        Self::Preset(DeviceLabels::AudioAndVideo)
    }
}

impl std::fmt::Debug for DeviceLabelTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Preset(labels) => f.debug_tuple("Preset").field(labels).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Observer registered on a topic.
/// Implementations must be Send + Sync (notified from tokio tasks).
pub trait Observer<T>: Send + Sync {
    fn notify(&self, value: &T);
}

impl<T, F> Observer<T> for F
where
    F: Fn(&T) + Send + Sync,
{
    fn notify(&self, value: &T) {
        self(value)
    }
}

/// One topic's subscriber registry.
///
/// The observer list is snapshotted before each dispatch pass, so an
/// observer may subscribe or unsubscribe (including itself) while a
/// publication is in flight; the in-flight pass is unaffected. Replay
/// topics cache the last published value and hand it to each new
/// subscriber synchronously.
pub struct Topic<T> {
    observers: RwLock<Vec<Arc<dyn Observer<T>>>>,
    current: Option<RwLock<T>>,
}

impl<T: Clone> Topic<T> {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
            current: None,
        }
    }

    /// A topic that replays its cached value to every new subscriber.
    pub fn replaying(initial: T) -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
            current: Some(RwLock::new(initial)),
        }
    }

    /// Append an observer. On replay topics the observer is immediately
    /// invoked with the current value.
    pub fn subscribe(&self, observer: Arc<dyn Observer<T>>) {
        self.observers.write().unwrap().push(observer.clone());
        if let Some(current) = &self.current {
            let value = current.read().unwrap().clone();
            Self::invoke(&observer, &value);
        }
    }

    /// Remove an observer by reference equality.
    pub fn unsubscribe(&self, observer: &Arc<dyn Observer<T>>) {
        self.observers
            .write()
            .unwrap()
            .retain(|o| !Arc::ptr_eq(o, observer));
    }

    /// Publish to all currently registered observers. Never fails; a
    /// panicking observer is logged and the pass continues.
    pub fn publish(&self, value: &T) {
        if let Some(current) = &self.current {
            *current.write().unwrap() = value.clone();
        }
        let snapshot = self.observers.read().unwrap().clone();
        for observer in &snapshot {
            Self::invoke(observer, value);
        }
    }

    /// Overwrite the cached value without notifying (replay topics only).
    pub fn reset(&self, value: T) {
        if let Some(current) = &self.current {
            *current.write().unwrap() = value;
        }
    }

    /// Current cached value (`None` on non-replay topics).
    pub fn current(&self) -> Option<T> {
        self.current.as_ref().map(|c| c.read().unwrap().clone())
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().unwrap().len()
    }

    fn invoke(observer: &Arc<dyn Observer<T>>, value: &T) {
        if panic::catch_unwind(AssertUnwindSafe(|| observer.notify(value))).is_err() {
            tracing::warn!("topic observer panicked during notification");
        }
    }
}

impl<T: Clone> Default for Topic<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingObserver {
        count: Arc<AtomicUsize>,
    }

    impl Observer<u32> for CountingObserver {
        fn notify(&self, _value: &u32) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn publish_reaches_observer() {
        let topic = Topic::new();
        let count = Arc::new(AtomicUsize::new(0));
        topic.subscribe(Arc::new(CountingObserver {
            count: count.clone(),
        }));

        topic.publish(&1u32);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn publish_reaches_multiple_observers_in_order() {
        let topic = Topic::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let order = order.clone();
            topic.subscribe(Arc::new(move |_: &u32| {
                order.lock().unwrap().push(tag);
            }));
        }

        topic.publish(&7u32);

        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn plain_topic_does_not_invoke_on_subscribe() {
        let topic = Topic::new();
        let count = Arc::new(AtomicUsize::new(0));
        topic.publish(&1u32);
        topic.subscribe(Arc::new(CountingObserver {
            count: count.clone(),
        }));

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(topic.current(), None);
    }

    #[test]
    fn replay_topic_invokes_new_subscriber_with_cached_value() {
        let topic = Topic::replaying(0u32);
        topic.publish(&42);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_by_observer = seen.clone();
        topic.subscribe(Arc::new(move |value: &u32| {
            seen_by_observer.lock().unwrap().push(*value);
        }));

        assert_eq!(*seen.lock().unwrap(), vec![42]);
        assert_eq!(topic.current(), Some(42));
    }

    #[test]
    fn reset_changes_cache_without_notifying() {
        let topic = Topic::replaying(1u32);
        let count = Arc::new(AtomicUsize::new(0));
        topic.subscribe(Arc::new(CountingObserver {
            count: count.clone(),
        }));
        let after_subscribe = count.load(Ordering::SeqCst);

        topic.reset(9);

        assert_eq!(count.load(Ordering::SeqCst), after_subscribe);
        assert_eq!(topic.current(), Some(9));
    }

    #[test]
    fn unsubscribed_observer_receives_nothing_further() {
        let topic = Topic::new();
        let count = Arc::new(AtomicUsize::new(0));
        let observer: Arc<dyn Observer<u32>> = Arc::new(CountingObserver {
            count: count.clone(),
        });
        topic.subscribe(observer.clone());
        topic.publish(&1);
        topic.unsubscribe(&observer);
        topic.publish(&2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(topic.observer_count(), 0);
    }

    #[test]
    fn observer_may_unsubscribe_itself_during_a_pass() {
        struct OneShot {
            topic: Arc<Topic<u32>>,
            this: Mutex<Option<Arc<dyn Observer<u32>>>>,
            count: Arc<AtomicUsize>,
        }

        impl Observer<u32> for OneShot {
            fn notify(&self, _value: &u32) {
                self.count.fetch_add(1, Ordering::SeqCst);
                if let Some(this) = self.this.lock().unwrap().take() {
                    self.topic.unsubscribe(&this);
                }
            }
        }

        let topic = Arc::new(Topic::new());
        let count = Arc::new(AtomicUsize::new(0));
        let one_shot = Arc::new(OneShot {
            topic: topic.clone(),
            this: Mutex::new(None),
            count: count.clone(),
        });
        let as_observer: Arc<dyn Observer<u32>> = one_shot.clone();
        *one_shot.this.lock().unwrap() = Some(as_observer.clone());
        topic.subscribe(as_observer);

        topic.publish(&1);
        topic.publish(&2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_observer_does_not_stop_the_pass() {
        let topic = Topic::new();
        topic.subscribe(Arc::new(|_: &u32| panic!("bad subscriber")));
        let count = Arc::new(AtomicUsize::new(0));
        topic.subscribe(Arc::new(CountingObserver {
            count: count.clone(),
        }));

        topic.publish(&1);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn device_labels_imply_constraints() {
        assert_eq!(
            MediaConstraints::from(DeviceLabels::None),
            MediaConstraints {
                audio: false,
                video: false
            }
        );
        assert_eq!(
            MediaConstraints::from(DeviceLabels::Audio),
            MediaConstraints {
                audio: true,
                video: false
            }
        );
        assert_eq!(
            MediaConstraints::from(DeviceLabels::Video),
            MediaConstraints {
                audio: false,
                video: true
            }
        );
        assert_eq!(
            MediaConstraints::from(DeviceLabels::AudioAndVideo),
            MediaConstraints {
                audio: true,
                video: true
            }
        );
    }
}
