//! Subscriber layers for the command line.
//!
//! Trace records go to one writer as bare lines, transfers included, so the
//! output can be saved and parsed back. Everything else is diagnostics and
//! is filtered separately.

use crate::report::trace::TRACE_TARGET;
use tracing::{Level, Subscriber};
use tracing_subscriber::filter::{EnvFilter, Targets};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Writes every trace record, and nothing else, to `writer`.
pub fn trace_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .without_time()
        .with_level(false)
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(Targets::new().with_target(TRACE_TARGET, Level::DEBUG))
}

/// Writes diagnostics at `level` to `writer`. `RUST_LOG` overrides the level;
/// trace records are never included.
pub fn diagnostics_layer<S, W>(level: &str, writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .without_time()
        .with_target(false)
        .with_writer(writer)
        .with_filter(diagnostics_filter(level))
}

fn diagnostics_filter(level: &str) -> EnvFilter {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| level.to_string());
    EnvFilter::new(format!("{},{}=off", directives, TRACE_TARGET))
}
