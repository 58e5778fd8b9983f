use anyhow::{anyhow, Result};
use tracing_subscriber::FmtSubscriber;

/// Install the global subscriber. Logs go to stderr so stdout stays
/// parseable for `--format json`.
pub fn init(level: tracing::Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| anyhow!("setting default subscriber failed: {err}"))
}
