use miette::{IntoDiagnostic, Result};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging on stderr.
///
/// `RUST_LOG` wins when set; otherwise verbosity picks the default filter.
pub fn init_logging(verbose: bool) -> Result<()> {
    let default_filter = if verbose {
        "taskpay=debug,info"
    } else {
        "taskpay=info,warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .into_diagnostic()?;

    tracing::debug!("Verbose logging enabled");
    Ok(())
}
