use std::time::Duration;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use super::append_db_runtime;

pub const DEFAULT_EVENT_TARGET: &str = "sqlx::query";
pub const DEFAULT_ELAPSED_FIELD: &str = "elapsed_secs";

/// Feeds query-completed events emitted by the database layer into the
/// current request's [`DbRuntime`](super::DbRuntime).
///
/// An event counts when its target equals `target` and it carries the
/// elapsed seconds of the query as a float in `elapsed_field`.
#[derive(Debug, Clone)]
pub struct DbRuntimeLayer {
    target: String,
    elapsed_field: String,
}

impl DbRuntimeLayer {
    pub fn new(target: impl Into<String>, elapsed_field: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            elapsed_field: elapsed_field.into(),
        }
    }
}

impl Default for DbRuntimeLayer {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_TARGET, DEFAULT_ELAPSED_FIELD)
    }
}

impl<S: Subscriber> Layer<S> for DbRuntimeLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if event.metadata().target() != self.target {
            return;
        }

        let mut visitor = ElapsedVisitor {
            field: &self.elapsed_field,
            seconds: None,
        };
        event.record(&mut visitor);

        if let Some(seconds) = visitor.seconds {
            if seconds.is_finite() && seconds >= 0.0 {
                append_db_runtime(Duration::from_secs_f64(seconds));
            }
        }
    }
}

struct ElapsedVisitor<'a> {
    field: &'a str,
    seconds: Option<f64>,
}

impl Visit for ElapsedVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        if field.name() == self.field {
            self.seconds = Some(value);
        }
    }

    fn record_debug(&mut self, _field: &Field, _value: &dyn std::fmt::Debug) {}
}
