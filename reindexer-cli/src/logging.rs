use crate::config::ObservabilityConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. `RUST_LOG` and `LOG_FORMAT` win over the
/// config file.
pub fn init(config: &ObservabilityConfig) {
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| config.log_format.clone());

    let registry = tracing_subscriber::registry().with(EnvFilter::new(level));

    if format == "json" {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
