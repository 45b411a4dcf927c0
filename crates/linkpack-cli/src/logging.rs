use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// JSON logs on stdout. `RUST_LOG`, when set and valid, wins over `level`.
pub fn init(level: &str) -> anyhow::Result<()> {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().json().with_current_span(true))
        .with(filter)
        .try_init()?;
    Ok(())
}
