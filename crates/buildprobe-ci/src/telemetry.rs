//! Tracing setup for the `buildprobe` binary.
//!
//! Build console lines go through [`BuildListener`](crate::build::BuildListener),
//! which mirrors each line as an `info` event tagged with the build id. The
//! human format therefore writes to stderr, keeping stdout for the command
//! output (`summary`, `show`, `history`). `--json` switches to one JSON
//! object per event for log shippers.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// `--verbose` lowers the threshold to `debug`, which shows probe dispatch,
/// exit codes and store queries.
pub fn default_level(verbose: bool) -> Level {
    if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

/// Install the global subscriber. `RUST_LOG` overrides `level`; later calls
/// are no-ops.
pub fn init_tracing(json: bool, level: Level) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if json {
        registry
            .with(fmt::layer().json().with_current_span(false).with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };

    if installed.is_ok() {
        tracing::debug!(json, level = %level, "tracing initialised");
    }
}
