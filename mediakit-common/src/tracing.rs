//! Tracing subscriber setup.
//!
//! `RUST_LOG` controls filtering, e.g. `RUST_LOG=mediakit_video=debug` or
//! `RUST_LOG=warn,mediakit_common=debug`. Without it the level defaults to
//! `info`.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

/// Install the global subscriber. Panics when called twice in one process.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer())
        .init();
}

/// Like [`init_tracing`], but tolerates an already-installed subscriber.
/// Useful in tests, where installation order is not deterministic.
pub fn try_init_tracing() -> Result<(), ()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer())
        .try_init()
        .map_err(|_| ())
}

fn fmt_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
}
