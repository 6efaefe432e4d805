use tracing_subscriber::{
    EnvFilter,
    fmt::{self, time::LocalTime},
    prelude::*,
};

use crate::configs::{Config, LoggingConfig};

/// Builds the filter directive from the logging section.
///
/// The level applies to everything; `filters` is appended verbatim so users
/// can raise or lower individual targets, e.g. `nexlink::node=trace`.
pub fn filter_directive(logging: Option<&LoggingConfig>) -> String {
    let level = logging
        .and_then(|l| l.level.as_deref())
        .unwrap_or("info");

    let filters = logging.and_then(|l| l.filters.as_deref()).unwrap_or("");

    if filters.is_empty() {
        format!("{},hyper=warn,rustls=warn", level)
    } else {
        format!("{},hyper=warn,rustls=warn,{}", level, filters)
    }
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over the config.
pub fn init(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config.logging.as_ref())));

    let timer = LocalTime::new(time::macros::format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
    ));

    let stdout_layer = fmt::layer()
        .with_timer(timer)
        .with_target(true)
        .with_thread_ids(true)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_defaults_to_info() {
        assert_eq!(filter_directive(None), "info,hyper=warn,rustls=warn");
    }

    #[test]
    fn directive_appends_custom_filters() {
        let logging = LoggingConfig {
            level: Some("debug".into()),
            filters: Some("nexlink::node=trace".into()),
        };
        assert_eq!(
            filter_directive(Some(&logging)),
            "debug,hyper=warn,rustls=warn,nexlink::node=trace"
        );
    }
}
