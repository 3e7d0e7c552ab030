use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogConfig, LogFormat};

/// Fallback filter when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info,agui_a2a_bridge=debug";

/// Initialize logging.
///
/// `RUST_LOG` takes precedence over [`DEFAULT_FILTER`]. Output is one JSON
/// object per line or the compact human format, per `log.format`.
pub fn init(log: &LogConfig) {
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(filter_layer);

    match log.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true),
            )
            .init(),
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .compact(),
            )
            .init(),
    }
}
