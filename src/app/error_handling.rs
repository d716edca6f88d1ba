//! Fatal error reporting for the binary

use tracing::error;

use crate::error::Error;

/// Print `error` and exit.
///
/// Configuration problems exit with 2, everything else with 1. With
/// `verbose >= 1` the full cause chain is printed.
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {}", error);
    eprintln!("Error: {error:#}");

    if verbose >= 1 {
        eprintln!("\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            eprintln!("  {}: {}", i, cause);
        }
    }

    std::process::exit(exit_code(&error))
}

fn exit_code(error: &anyhow::Error) -> i32 {
    match error.chain().find_map(|cause| cause.downcast_ref::<Error>()) {
        Some(Error::Config(_) | Error::Yaml(_) | Error::Toml(_)) => 2,
        _ => 1,
    }
}
