//! Console formatting for log aggregation.
//!
//! Events mirrored by a [`super::LogService`] carry `module`, `function` and `user`
//! fields. These are rendered in front of the message just like in the log file, so
//! both outputs can be grepped the same way:
//!
//! ```text
//! INFO  ambit::logging::service: [SessionService] [start] [u-42] session.start_success
//! WARN  ambit::logging::service: [LocaleService] [translate] [System] locale.translation_not_found context={"key":"greeting"}
//! ```
//!
//! All other events are printed as `LEVEL target: message key=value`, followed by the
//! names and fields of the enclosing spans.

use std::fmt::{Debug, Write};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, FormattedFields};
use tracing_subscriber::registry::LookupSpan;

/// Console event format.
pub struct ConsoleLogFormat;

impl<S, N> FormatEvent<S, N> for ConsoleLogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let mut fields = EventFields::default();
        event.record(&mut fields);

        let metadata = event.metadata();
        fields.write_to(&mut writer, metadata.level(), metadata.target())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, " [{}", span.name())?;
                if let Some(span_fields) = span.extensions().get::<FormattedFields<N>>()
                    && !span_fields.is_empty()
                {
                    write!(writer, "{{{}}}", span_fields)?;
                }
                write!(writer, "]")?;
            }
        }

        writeln!(writer)
    }
}

/// The recorded fields of one event, split into the log entry columns and the rest.
#[derive(Debug, Default, PartialEq)]
struct EventFields {
    module: Option<String>,
    function: Option<String>,
    user: Option<String>,
    message: String,
    extra: Vec<(&'static str, String)>,
}

impl EventFields {
    fn record_value(&mut self, name: &'static str, value: String) {
        match name {
            "message" => self.message = value,
            "module" => self.module = Some(value),
            "function" => self.function = Some(value),
            "user" => self.user = Some(value),
            _ if value.is_empty() => {}
            _ => self.extra.push((name, value)),
        }
    }

    fn is_log_entry(&self) -> bool {
        self.module.is_some() && self.function.is_some() && self.user.is_some()
    }

    fn write_to(&self, writer: &mut impl Write, level: &Level, target: &str) -> std::fmt::Result {
        write!(writer, "{:<5} {}: ", level, target)?;

        if self.is_log_entry() {
            write!(
                writer,
                "[{}] [{}] [{}] ",
                self.module.as_deref().unwrap_or_default(),
                self.function.as_deref().unwrap_or_default(),
                self.user.as_deref().unwrap_or_default()
            )?;
        } else {
            for (name, value) in [
                ("module", &self.module),
                ("function", &self.function),
                ("user", &self.user),
            ] {
                if let Some(value) = value {
                    write!(writer, "{}={} ", name, value)?;
                }
            }
        }

        write!(writer, "{}", self.message)?;
        for (name, value) in &self.extra {
            write!(writer, " {}={}", name, value)?;
        }

        Ok(())
    }
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field.name(), value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        self.record_value(field.name(), format!("{:?}", value));
    }
}
