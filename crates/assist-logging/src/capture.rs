//! In-memory capture of tracing events for test assertions.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

/// One recorded event.
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    /// Level the event was emitted at.
    pub level: Level,
    /// Emitting module path.
    pub target: String,
    /// Rendered message.
    pub message: String,
    /// Structured fields other than the message.
    pub fields: Vec<(String, String)>,
}

impl CapturedEvent {
    /// Value of a structured field, if present.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Shared handle to the events recorded by [`capture_logs`].
#[derive(Clone, Default)]
pub struct CapturedLogs {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CapturedLogs {
    /// Snapshot of every recorded event.
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().clone()
    }

    /// Whether any event's message contains `needle`.
    pub fn has_message(&self, needle: &str) -> bool {
        self.events.lock().iter().any(|e| e.message.contains(needle))
    }

    /// Whether any event at `level` has a message containing `needle`.
    pub fn has_event(&self, level: Level, needle: &str) -> bool {
        self.events
            .lock()
            .iter()
            .any(|e| e.level == level && e.message.contains(needle))
    }

    /// Number of events recorded at `level`.
    pub fn count_at_level(&self, level: Level) -> usize {
        self.events.lock().iter().filter(|e| e.level == level).count()
    }

    /// Events whose target starts with `prefix`.
    pub fn events_for_target(&self, prefix: &str) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.target.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

struct CaptureLayer {
    logs: CapturedLogs,
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl FieldVisitor {
    fn push(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.push((field.name().to_owned(), value));
        }
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        self.push(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_owned());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, value.to_string());
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let metadata = event.metadata();
        self.logs.events.lock().push(CapturedEvent {
            level: *metadata.level(),
            target: metadata.target().to_owned(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

/// Capture every event emitted on the current thread until the guard drops.
///
/// Uses `set_default`, so parallel tests do not see each other's events.
/// Under a multi-threaded runtime, events from worker threads are not seen.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::registry()
        .with(CaptureLayer { logs: logs.clone() })
        .with(LevelFilter::TRACE);

    let guard = subscriber.set_default();
    (logs, guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_levels() {
        let (logs, _guard) = capture_logs();
        tracing::debug!("dialing");
        tracing::warn!("slow reconnect");
        tracing::error!("socket failed");

        assert!(logs.has_event(Level::WARN, "slow reconnect"));
        assert!(logs.has_event(Level::ERROR, "socket failed"));
        assert_eq!(logs.count_at_level(Level::DEBUG), 1);
    }

    #[test]
    fn captures_fields() {
        let (logs, _guard) = capture_logs();
        tracing::info!(attempt = 2, endpoint = "wss://host/", "reconnect scheduled");

        let events = logs.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].field("attempt"), Some("2"));
        assert_eq!(events[0].field("endpoint"), Some("wss://host/"));
        assert!(events[0].field("missing").is_none());
    }

    #[test]
    fn filters_by_target() {
        let (logs, _guard) = capture_logs();
        tracing::info!(target: "assist_connection::manager", "open");
        tracing::info!(target: "assist_session::reducer", "answer");

        let conn = logs.events_for_target("assist_connection");
        assert_eq!(conn.len(), 1);
        assert_eq!(conn[0].message, "open");
    }

    #[test]
    fn clear_forgets_events() {
        let (logs, _guard) = capture_logs();
        tracing::info!("one");
        assert!(logs.has_message("one"));
        logs.clear();
        assert!(logs.events().is_empty());
    }

    #[test]
    fn other_threads_are_isolated() {
        let (logs, _guard) = capture_logs();
        std::thread::spawn(|| tracing::info!("elsewhere"))
            .join()
            .unwrap();
        assert!(!logs.has_message("elsewhere"));
    }
}
