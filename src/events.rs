use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Notification handed to listeners. The timestamp is captured at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerEvent {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ListenerEvent {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A [`ListenerEvent`] carrying a completion percentage in `0..=100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    #[serde(flatten)]
    pub event: ListenerEvent,
    pub progress: u8,
}

impl ProgressEvent {
    pub fn new(progress: u8, message: impl Into<String>) -> Self {
        Self {
            event: ListenerEvent::new(message),
            progress: progress.min(100),
        }
    }

    /// Progress event for item `done` (1-based) out of `total`.
    pub fn of(done: usize, total: usize, message: impl Into<String>) -> Self {
        Self::new(percent(done, total), message)
    }

    pub fn message(&self) -> &str {
        &self.event.message
    }
}

/// `round(done / total * 100)`, clamped to `0..=100`. An empty total counts as done.
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let value = (done as f64 / total as f64 * 100.0).round();
    value.clamp(0.0, 100.0) as u8
}

/// Observer of procedure lifecycle notifications. Every callback is a no-op by default.
///
/// Callbacks run inline with the pipeline on the dispatching thread and
/// must return promptly.
pub trait Listener {
    fn on_start(&self, _event: &ListenerEvent) {}
    fn on_progress(&self, _event: &ProgressEvent) {}
    fn on_cancel(&self, _event: &ListenerEvent) {}
    fn on_end(&self, _event: &ListenerEvent) {}
}

/// Caller-chosen key under which a listener is registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerHandle(String);

impl ListenerHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ListenerHandle {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ListenerHandle {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered fan-out of listeners. Callbacks run in registration order.
#[derive(Default, Clone)]
pub struct Listeners {
    entries: Vec<(ListenerHandle, Arc<dyn Listener>)>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener. Registering the same handle twice keeps both entries.
    pub fn register(&mut self, handle: impl Into<ListenerHandle>, listener: Arc<dyn Listener>) {
        self.entries.push((handle.into(), listener));
    }

    /// Remove every listener registered under `handle`. Returns how many were removed.
    pub fn unregister(&mut self, handle: &ListenerHandle) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(h, _)| h != handle);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn handles(&self) -> impl Iterator<Item = &ListenerHandle> {
        self.entries.iter().map(|(h, _)| h)
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.handles()).finish()
    }
}

impl Listener for Listeners {
    fn on_start(&self, event: &ListenerEvent) {
        for (_, listener) in &self.entries {
            listener.on_start(event);
        }
    }

    fn on_progress(&self, event: &ProgressEvent) {
        for (_, listener) in &self.entries {
            listener.on_progress(event);
        }
    }

    fn on_cancel(&self, event: &ListenerEvent) {
        for (_, listener) in &self.entries {
            listener.on_cancel(event);
        }
    }

    fn on_end(&self, event: &ListenerEvent) {
        for (_, listener) in &self.entries {
            listener.on_end(event);
        }
    }
}

/// Emission helpers so pipeline code reads as `listener.start("...")`.
pub(crate) trait Emit {
    fn start(&self, message: String);
    fn progress(&self, done: usize, total: usize, message: String);
    fn cancel(&self, message: String);
    fn end(&self, message: String);
}

impl<L: Listener + ?Sized> Emit for L {
    fn start(&self, message: String) {
        self.on_start(&ListenerEvent::new(message));
    }

    fn progress(&self, done: usize, total: usize, message: String) {
        self.on_progress(&ProgressEvent::of(done, total, message));
    }

    fn cancel(&self, message: String) {
        self.on_cancel(&ListenerEvent::new(message));
    }

    fn end(&self, message: String) {
        self.on_end(&ListenerEvent::new(message));
    }
}

/// Listener that keeps every notification it receives, in order.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct Recorder {
    pub seen: std::sync::Mutex<Vec<Recorded>>,
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Recorded {
    Start(String),
    Progress(u8, String),
    Cancel(String),
    End(String),
}

#[cfg(test)]
impl Recorder {
    pub fn take(&self) -> Vec<Recorded> {
        std::mem::take(&mut *self.seen.lock().unwrap())
    }

    pub fn progress_values(&self) -> Vec<u8> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| match r {
                Recorded::Progress(p, _) => Some(*p),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl Listener for Recorder {
    fn on_start(&self, event: &ListenerEvent) {
        self.seen.lock().unwrap().push(Recorded::Start(event.message.clone()));
    }
    fn on_progress(&self, event: &ProgressEvent) {
        self.seen
            .lock()
            .unwrap()
            .push(Recorded::Progress(event.progress, event.event.message.clone()));
    }
    fn on_cancel(&self, event: &ListenerEvent) {
        self.seen.lock().unwrap().push(Recorded::Cancel(event.message.clone()));
    }
    fn on_end(&self, event: &ListenerEvent) {
        self.seen.lock().unwrap().push(Recorded::End(event.message.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_and_clamps() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(5, 3), 100);
        assert_eq!(percent(0, 0), 100);
    }

    #[test]
    fn fan_out_follows_registration_order() {
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        let mut listeners = Listeners::new();
        listeners.register("first", first.clone());
        listeners.register("second", second.clone());

        listeners.start("hello".to_string());
        listeners.progress(1, 2, "half".to_string());

        assert_eq!(
            first.take(),
            vec![Recorded::Start("hello".into()), Recorded::Progress(50, "half".into())]
        );
        assert_eq!(second.take().len(), 2);
    }

    #[test]
    fn unregister_removes_by_handle_only() {
        let a = Arc::new(Recorder::default());
        let b = Arc::new(Recorder::default());
        let mut listeners = Listeners::new();
        listeners.register("a", a.clone());
        listeners.register("b", b.clone());

        assert_eq!(listeners.unregister(&"a".into()), 1);
        assert_eq!(listeners.unregister(&"missing".into()), 0);
        listeners.end("done".to_string());

        assert!(a.take().is_empty());
        assert_eq!(b.take(), vec![Recorded::End("done".into())]);
    }

    #[test]
    fn progress_event_serializes_flat() {
        let event = ProgressEvent::new(140, "over");
        assert_eq!(event.progress, 100);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["message"], "over");
        assert_eq!(json["progress"], 100);
        assert!(json.get("timestamp").is_some());
    }
}
