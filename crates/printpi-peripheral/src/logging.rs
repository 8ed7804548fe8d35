use printpi_core::config::LoggingConfig;
use std::str::FromStr;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level; an unparsable level falls back
/// to `info`. Output goes to stderr so `check-config` can be piped.
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = filter_for(config);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()?;

    Ok(())
}

fn filter_for(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::from_str(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_level_is_used() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig {
            level: "warn".to_string(),
        };
        assert_eq!(filter_for(&config).to_string(), "warn");
    }

    #[test]
    fn test_unparsable_level_falls_back_to_info() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = LoggingConfig {
            level: "printpi=notalevel".to_string(),
        };
        assert_eq!(filter_for(&config).to_string(), "info");
    }
}
