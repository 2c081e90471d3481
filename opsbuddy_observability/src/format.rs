//! Compact terminal event format for service logs.

use std::fmt;

use nu_ansi_term::Color;
use tracing::{Event, Level, Subscriber, field, span};

use tracing_subscriber::field::{RecordFields, VisitFmt, VisitOutput};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Renders events as `[LEVEL] [mm-dd|hh:mm:ss.mmm] message key=value ...`.
pub struct OpsFormat {
    time_format: time::format_description::OwnedFormatItem,
}

impl<S, N> FormatEvent<S, N> for OpsFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let level = FmtLevel {
            level: event.metadata().level(),
            ansi: writer.has_ansi_escapes(),
        };

        write!(writer, "{} ", level)?;
        self.format_time(&mut writer)?;
        writer.write_char(' ')?;

        ctx.format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

impl<'w> FormatFields<'w> for OpsFormat {
    fn format_fields<R: RecordFields>(
        &self,
        writer: Writer<'w>,
        fields: R,
    ) -> fmt::Result {
        let mut v = FieldVisitor::new(writer, true);
        fields.record(&mut v);
        v.finish()
    }

    fn add_fields(
        &self,
        current: &'w mut tracing_subscriber::fmt::FormattedFields<Self>,
        fields: &span::Record<'_>,
    ) -> fmt::Result {
        let empty = current.is_empty();
        let writer = current.as_writer();
        let mut v = FieldVisitor::new(writer, empty);
        fields.record(&mut v);
        v.finish()
    }
}

impl OpsFormat {
    fn format_time(&self, writer: &mut Writer<'_>) -> fmt::Result {
        let now = time::OffsetDateTime::from(std::time::SystemTime::now());
        let formatted = now
            .format(&self.time_format)
            .map_err(|_| std::fmt::Error)?;
        writer.write_str(&formatted)
    }
}

impl Default for OpsFormat {
    fn default() -> Self {
        let time_format = time::format_description::parse_owned::<2>(
            r#"\[[month]-[day]|[hour]:[minute]:[second].[subsecond digits:3]\]"#,
        )
        .expect("failed to parse time format");

        Self { time_format }
    }
}

/// Writes the `message` field bare and every other field as `key=value`,
/// coloring values when the terminal supports it.
struct FieldVisitor<'a> {
    writer: Writer<'a>,
    is_empty: bool,
    result: fmt::Result,
}

impl<'a> FieldVisitor<'a> {
    fn new(writer: Writer<'a>, is_empty: bool) -> Self {
        Self {
            writer,
            is_empty,
            result: Ok(()),
        }
    }

    fn pad(&mut self) -> &'static str {
        if self.is_empty {
            self.is_empty = false;
            ""
        } else {
            " "
        }
    }
}

impl field::Visit for FieldVisitor<'_> {
    fn record_debug(&mut self, field: &field::Field, value: &dyn fmt::Debug) {
        if self.result.is_err() {
            return;
        }

        let pad = self.pad();
        self.result = match field.name() {
            "message" => write!(self.writer, "{}{:?}", pad, value),
            name => {
                let value = format!("{:?}", value);
                if self.writer.has_ansi_escapes() {
                    let color = if name == "error" {
                        Color::Red
                    } else {
                        Color::Blue
                    };
                    write!(self.writer, "{}{}={}", pad, name, color.paint(value))
                } else {
                    write!(self.writer, "{}{}={}", pad, name, value)
                }
            }
        };
    }

    fn record_str(&mut self, field: &field::Field, value: &str) {
        if self.result.is_err() {
            return;
        }

        if field.name() == "message" {
            let pad = self.pad();
            self.result = write!(self.writer, "{}{}", pad, value);
        } else {
            self.record_debug(field, &value);
        }
    }
}

impl VisitOutput<fmt::Result> for FieldVisitor<'_> {
    fn finish(self) -> fmt::Result {
        self.result
    }
}

impl VisitFmt for FieldVisitor<'_> {
    fn writer(&mut self) -> &mut dyn fmt::Write {
        &mut self.writer
    }
}

struct FmtLevel<'a> {
    level: &'a Level,
    ansi: bool,
}

impl fmt::Display for FmtLevel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self.level {
            Level::TRACE => "TRACE",
            Level::DEBUG => "DEBUG",
            Level::INFO => "INFO",
            Level::WARN => "WARN",
            Level::ERROR => "ERROR",
        };

        if self.ansi {
            let color = match *self.level {
                Level::TRACE => Color::Purple,
                Level::DEBUG => Color::Blue,
                Level::INFO => Color::Green,
                Level::WARN => Color::Yellow,
                Level::ERROR => Color::Red,
            };
            write!(f, "[{}]", color.paint(name))
        } else {
            write!(f, "[{}]", name)
        }
    }
}
