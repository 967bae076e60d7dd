use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Directive applied when `RUST_LOG` is not set
pub fn default_directive(verbose: bool) -> String {
    if verbose {
        "warn,taskflow=info".to_string()
    } else {
        "warn".to_string()
    }
}

/// Initialize human readable logging on stderr.
///
/// Without `verbose` only warnings and errors are shown; with it the
/// branch-creation steps are reported too. `RUST_LOG` overrides both.
pub fn init_telemetry(verbose: bool) -> Result<()> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives)?,
        _ => EnvFilter::try_new(default_directive(verbose))?,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .with(filter)
        .try_init()?;

    tracing::debug!("taskflow telemetry initialized");
    Ok(())
}

/// Generate a correlation ID for linking related operations
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span wrapping one top-level workflow operation
pub fn create_workflow_span(operation: &str, task: &str) -> tracing::Span {
    tracing::info_span!(
        "workflow",
        operation = operation,
        task = task,
        correlation.id = %generate_correlation_id(),
    )
}
