//! Maintenance utility: dump all registry records as JSON lines.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin list_patients -- [--db <path>]
//! ```
//!
//! The database path defaults to `HEALTHCHAIN_DB` or `healthchain.db`.
//! Output goes to stdout; logs go to stderr, PII-sanitized.

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use healthchain::adapters::sanitize::SanitizingMakeWriter;
use healthchain::adapters::SqliteRegistry;
use healthchain::ports::Registry;

fn main() -> Result<()> {
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    let mut db_path = std::env::var("HEALTHCHAIN_DB").unwrap_or_else(|_| "healthchain.db".to_string());
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => {
                db_path = args.next().context("--db requires a path")?;
            }
            "-h" | "--help" => {
                println!("Usage: list_patients [--db <path>]");
                return Ok(());
            }
            other => anyhow::bail!("Unknown arg: {other}\nUsage: list_patients [--db <path>]"),
        }
    }

    let registry = SqliteRegistry::new(&db_path)
        .with_context(|| format!("Failed to open registry at {db_path}"))?;
    let records = registry.list_all().context("Failed to list records")?;

    tracing::info!(count = records.len(), "Listing patient records");
    for record in &records {
        println!("{}", serde_json::to_string(record)?);
    }

    Ok(())
}
