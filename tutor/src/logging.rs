//! Logging setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG` wins over `verbosity` (0 = warn, 1 = info, 2 = debug, 3+ = trace).
pub fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}={level}", env!("CARGO_CRATE_NAME"))));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbosity >= 2)
        .without_time();

    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init()
    {
        eprintln!("Failed to initialize logging: {e}");
    }
}
