use crate::{errors::Error, Result};

/// Initialize tracing for the monitor.
///
/// Diagnostics go to stderr so stdout carries only the rendered message blocks.
pub fn init(service_name: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    // Default: info for our crates, warn for the client libraries.
    // Can be overridden with `RUST_LOG`.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,tgmon=info,tgmon_core=info,tgmon_mtproto=info,tgmon_telegram=info,tgmon_mistral=info,{}=info",
            service_name.replace('-', "_")
        ))
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| Error::External(format!("failed to initialize logging: {e}")))
}
