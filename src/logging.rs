//! Unified JSON logging with custom format.
//!
//! Log format:
//! ```json
//! {"ts":"2024-12-28T15:04:05.123Z","level":"info","type":"app","msg":"Server started","ctx":{"service":"traced_hello"},"data":{}}
//! ```
//!
//! Events with target [`ACCESS_TARGET`] become `type: access`, events with
//! target [`SPAN_TARGET`] (finished spans from the log exporter) become
//! `type: span`. Both live under the crate's target so the default
//! `traced_hello=info` filter lets them through.
//! `trace_id` and `span_id` fields are lifted into `ctx` so every line
//! belonging to a request can be joined on them.

use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Target of the per-request access log event.
pub const ACCESS_TARGET: &str = "traced_hello::access";

/// Target of finished spans written by the log exporter.
pub const SPAN_TARGET: &str = "traced_hello::span";

/// Fields moved from `data` into `ctx`.
const CONTEXT_FIELDS: [&str; 2] = ["trace_id", "span_id"];

/// Install the global subscriber described by `config`.
pub fn init(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|e| {
        eprintln!("Warning: Invalid log filter '{}': {}", config.filter, e);
        EnvFilter::new("traced_hello=info")
    });

    match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .event_format(JsonFormatter::new(config.service_name.clone())),
            )
            .try_init()?,
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()?,
    }

    Ok(())
}

/// Custom JSON formatter for tracing.
pub struct JsonFormatter {
    service_name: String,
}

impl JsonFormatter {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }
}

impl<S, N> FormatEvent<S, N> for JsonFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let level = match *meta.level() {
            Level::TRACE => "debug",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };

        // Determine log type from target
        let log_type = match meta.target() {
            ACCESS_TARGET => "access",
            SPAN_TARGET => "span",
            _ if *meta.level() == Level::ERROR => "error",
            _ => "app",
        };

        // Collect fields
        let mut visitor = FieldVisitor::new();
        event.record(&mut visitor);
        let mut data = visitor.fields;

        // For access logs, build "METHOD /path STATUS"
        let msg = if log_type == "access" {
            let method = data.get("method").and_then(|v| v.as_str()).unwrap_or("?");
            let path = data.get("path").and_then(|v| v.as_str()).unwrap_or("?");
            let status = data.get("status").and_then(|v| v.as_u64()).unwrap_or(0);
            format!("{} {} {}", method, path, status)
        } else {
            visitor.message.unwrap_or_default()
        };

        // The span record arrives as rendered JSON text
        if log_type == "span" {
            if let Some(serde_json::Value::String(raw)) = data.get("record") {
                if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(raw) {
                    data.insert("record".to_string(), parsed);
                }
            }
        }

        let mut ctx = serde_json::Map::new();
        ctx.insert("service".into(), serde_json::json!(&self.service_name));
        for key in CONTEXT_FIELDS {
            if let Some(value) = data.remove(key) {
                ctx.insert(key.into(), value);
            }
        }

        let entry = serde_json::json!({
            "ts": iso8601(SystemTime::now()),
            "level": level,
            "type": log_type,
            "msg": msg,
            "ctx": ctx,
            "data": data,
        });

        writeln!(
            writer,
            "{}",
            serde_json::to_string(&entry).unwrap_or_default()
        )
    }
}

/// Field visitor for collecting tracing fields.
struct FieldVisitor {
    message: Option<String>,
    fields: HashMap<String, serde_json::Value>,
}

impl FieldVisitor {
    fn new() -> Self {
        Self {
            message: None,
            fields: HashMap::new(),
        }
    }
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(rendered.trim_matches('"').to_string());
        } else {
            self.fields
                .insert(field.name().to_string(), serde_json::Value::String(rendered));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.insert(
                field.name().to_string(),
                serde_json::Value::String(value.to_string()),
            );
        }
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.fields
            .insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), serde_json::json!(value));
    }
}

// =============================================================================
// Timestamps
// =============================================================================

/// ISO 8601 UTC timestamp with milliseconds, e.g. `2024-12-28T15:04:05.123Z`.
pub fn iso8601(time: SystemTime) -> String {
    let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
    let secs = since_epoch.as_secs();
    let millis = since_epoch.subsec_millis();

    let day_secs = secs % 86400;
    let (year, month, day) = civil_from_days((secs / 86400) as i64);

    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        year,
        month,
        day,
        day_secs / 3600,
        (day_secs % 3600) / 60,
        day_secs % 60,
        millis
    )
}

/// Days since 1970-01-01 to (year, month, day) in the proleptic Gregorian calendar.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
