//! Logging configuration and initialization

use crate::app::config::AppConfig;
use tracing::{debug, trace};
use tracing_subscriber::EnvFilter;

/// Initialize tracing for the binary.
///
/// `RUST_LOG` takes precedence over the verbosity flag. Output goes to stderr
/// so stdout stays machine-readable.
pub fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));

    let initialized = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(config.verbose >= 2) // Show target module for -vv and above
        .with_line_number(config.verbose >= 2)
        .try_init()
        .is_ok();

    if initialized {
        debug!("lintforge started with verbosity level: {}", config.verbose);
        trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
    }
}
