use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Initialize structured logging.
///
/// `RUST_LOG` wins over `level` when set. JSON output carries the current span
/// and the span list so work order and actor ids show up on every line.
pub fn init_telemetry(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }

    tracing::debug!(level, json, "Work order telemetry initialized");
    Ok(())
}

/// Generate a correlation ID for linking the log lines of one request
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create a span with the common work order attributes
pub fn create_work_order_span(
    operation: &str,
    work_order_id: Option<Uuid>,
    actor_id: Option<Uuid>,
    correlation_id: Option<&str>,
) -> tracing::Span {
    tracing::info_span!(
        "work_order",
        operation = operation,
        work_order.id = work_order_id.map(tracing::field::display),
        actor.id = actor_id.map(tracing::field::display),
        correlation.id = correlation_id,
    )
}
