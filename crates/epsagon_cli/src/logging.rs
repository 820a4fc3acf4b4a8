use tracing_subscriber::EnvFilter;

/// Filter directive that overrides `--log-level`, e.g. `epsagon_weld=debug`
const LOG_ENV: &str = "EPSAGON_LOG";

/// Install the global subscriber for the pipeline's `epsagon` spans.
///
/// Logs go to stderr so the handler table on stdout stays pipeable.
pub fn init(log_level: &str) {
    let filter = match EnvFilter::try_from_env(LOG_ENV) {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(log_level),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
