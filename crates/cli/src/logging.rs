//! Console diagnostics for metasnap
//!
//! Diagnostics go to stderr through `tracing`. The detect report itself is
//! written by `ReportSink` and never passes through here.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer as _;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Filter used when `RUST_LOG` is unset
fn default_filter(debug: bool) -> EnvFilter {
    if debug {
        EnvFilter::new("warn,metasnap=debug,metasnap_core=debug")
    } else {
        EnvFilter::new("warn")
    }
}

/// Initialize stderr logging.
///
/// `RUST_LOG` overrides the default filter. With `debug`, the console level
/// is raised so per-root walk progress is visible.
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(debug));

    let console_level = if debug {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(debug)
        .with_filter(console_level);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .init();
}
