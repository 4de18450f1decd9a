use crate::config_manager::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Calling this more than once is a
/// no-op, so tests and embedding applications can call it freely.
pub fn init_tracing(config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.format == "compact" {
        let subscriber = Registry::default()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().compact().with_target(true));
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = Registry::default()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(true));
        tracing::subscriber::set_global_default(subscriber).ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        let config = LoggingConfig {
            level: "debug".to_string(),
            format: "compact".to_string(),
        };
        init_tracing(&config);
        init_tracing(&LoggingConfig::default());
        tracing::debug!(target: "config", "subscriber installed");
    }
}
