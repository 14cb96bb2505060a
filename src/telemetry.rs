//! Tracing subscriber setup shared by both binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::errors::{KeeperError, Result};

/// Install a global subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence over `default_directive`. Installing twice
/// is not an error; the first subscriber stays.
pub fn init(default_directive: &str) -> Result<()> {
    let env_filter = filter(default_directive)?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .ok();

    Ok(())
}

fn filter(default_directive: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .map_err(|e| KeeperError::Config(format!("invalid log filter '{default_directive}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        assert!(init("warn").is_ok());
        assert!(init("debug").is_ok());
    }
}
