//! Diagnostic logging setup.
//!
//! User-facing output goes through [`crate::ui`]; this is only for
//! `tracing` diagnostics, written to stderr.

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbosity` picks the level
/// (`0` → warn, `1` → info, `2+` → debug).
///
/// ```bash
/// RUST_LOG=diskput::sync=debug diskput put --disk local --dir ./photos
/// ```
pub fn init_tracing(verbosity: u8) {
    let fallback = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
