//! Tracing subscriber setup for the CLI binary.

use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber from `-v` count and the `GITREG_LOG`
/// environment variable. Repeat `-v` for more detail; the env filter, when
/// set, wins.
pub fn init(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "gitreg=info",
        2 => "gitreg=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("GITREG_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default));

    // A second init (e.g. in tests) is fine; keep the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
