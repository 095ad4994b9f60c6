use std::fmt::{self as stdfmt, Write as _};

use nu_ansi_term::Color::{Blue, Magenta, Red, Yellow};
use tracing::{
    field::{Field, Visit},
    Event, Level, Subscriber,
};
use tracing_subscriber::{
    fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields},
    registry::LookupSpan,
    EnvFilter,
};

use crate::{cli::Args, utils::Colored};

/// Crates whose events the CLI shows at the requested level. Everything else
/// only reports warnings.
const HDX_CRATES: [&str; 5] = ["hdx_cli", "hdx_core", "hdx_config", "hdx_remote", "hdx_utils"];

/// Overrides the computed filter with an `EnvFilter` directive string.
const LOG_ENV: &str = "HDX_LOG";

/// Collects the message and renders any other fields as `key=value`.
#[derive(Default)]
struct EventFields {
    message: String,
    extra: String,
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.extra, " {}={value}", field.name());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn stdfmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.extra, " {}={value:?}", field.name());
        }
    }
}

/// Where an event came from, without the `hdx_` crate prefix, eg.
/// `core::dataset`.
fn origin(target: &str) -> &str {
    target.strip_prefix("hdx_").unwrap_or(target)
}

/// Plain messages at INFO, `warning:`/`error:` labels above it, and the
/// emitting module below it.
pub struct HdxFormatter;

impl<S, N> FormatEvent<S, N> for HdxFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> stdfmt::Result {
        let metadata = event.metadata();
        let mut fields = EventFields::default();
        event.record(&mut fields);

        match *metadata.level() {
            Level::ERROR => write!(writer, "{} ", Colored(Red, "error:"))?,
            Level::WARN => write!(writer, "{} ", Colored(Yellow, "warning:"))?,
            Level::INFO => {}
            Level::DEBUG => write!(writer, "{} ", Colored(Blue, origin(metadata.target())))?,
            Level::TRACE => write!(writer, "{} ", Colored(Magenta, origin(metadata.target())))?,
        }
        writeln!(writer, "{}{}", fields.message, fields.extra)
    }
}

fn filter_level(args: &Args) -> Level {
    match (args.quiet, args.verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    }
}

/// `warn` for dependencies and the verbosity level for the hdx crates.
fn filter_directives(level: Level) -> String {
    let mut directives = String::from("warn");
    for krate in HDX_CRATES {
        let _ = write!(directives, ",{krate}={level}");
    }
    directives
}

/// Logs go to stderr so that `--json` output on stdout stays parseable.
pub fn setup_logging(args: &Args) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(filter_level(args))));
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time();

    let subscriber: Box<dyn Subscriber + Send + Sync> = if args.json {
        Box::new(builder.json().flatten_event(true).with_target(true).finish())
    } else {
        Box::new(builder.event_format(HdxFormatter).finish())
    };

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("A tracing subscriber is already set");
    }
}
