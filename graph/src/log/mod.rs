use slog::{o, Drain, FilterLevel, Logger};
use std::fmt::{Display, Error, Formatter};

/// Builds the process logger: compact terminal output, filtered by
/// `RUST_LOG` on top of a default level of `info` (or `debug`).
pub fn logger(show_debug: bool) -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let level = if show_debug {
        FilterLevel::Debug
    } else {
        FilterLevel::Info
    };
    let mut builder = slog_envlogger::LogBuilder::new(drain).filter(None, level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder = builder.parse(&filters);
    }
    let drain = slog_async::Async::new(builder.build().fuse())
        .chan_size(10000)
        .build()
        .fuse();
    Logger::root(drain, o!())
}

/// A logger that drops every record.
pub fn discard() -> Logger {
    Logger::root(slog::Discard, o!())
}

/// Tags for log lines that operators may want to search for.
pub enum LogCode {
    GraphQlQuerySuccess,
    GraphQlQueryFailure,
    FieldFailure,
    UnboundCapability,
}

impl Display for LogCode {
    fn fmt(&self, f: &mut Formatter) -> Result<(), Error> {
        let value = match self {
            LogCode::GraphQlQuerySuccess => "GraphQlQuerySuccess",
            LogCode::GraphQlQueryFailure => "GraphQlQueryFailure",
            LogCode::FieldFailure => "FieldFailure",
            LogCode::UnboundCapability => "UnboundCapability",
        };
        write!(f, "{}", value)
    }
}

impl slog::Value for LogCode {
    fn serialize(
        &self,
        _rec: &slog::Record,
        key: slog::Key,
        serializer: &mut dyn slog::Serializer,
    ) -> slog::Result {
        serializer.emit_str(key, format!("{}", self).as_str())
    }
}
