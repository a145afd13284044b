use tracing::Level;
use tracing_subscriber::EnvFilter;

fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the process-wide subscriber on stderr. Call once, at start-up.
///
/// `RUST_LOG` wins when set; otherwise `-v` flags pick the level.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_for(verbosity).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}
