//! Maintenance utility: delete duplicate patient records, keeping the
//! newest per key.
//!
//! Duplicates arise when concurrent registrations for the same fingerprint
//! template both succeed; reads already resolve most-recent-first, this
//! sweep removes the rest.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin compact_duplicates -- [--db <path>] [--key <hex>]
//! ```
//!
//! With `--key`, only that patient key is compacted; otherwise every key is
//! swept. The database path defaults to `HEALTHCHAIN_DB` or
//! `healthchain.db`.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use healthchain::adapters::sanitize::SanitizingMakeWriter;
use healthchain::adapters::SqliteRegistry;
use healthchain::application::CompactionService;
use healthchain::domain::PatientKey;

fn main() -> Result<()> {
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    let mut db_path = std::env::var("HEALTHCHAIN_DB").unwrap_or_else(|_| "healthchain.db".to_string());
    let mut key: Option<PatientKey> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => {
                db_path = args.next().context("--db requires a path")?;
            }
            "--key" => {
                let hex = args.next().context("--key requires a hex patient key")?;
                key = Some(hex.parse().context("Invalid patient key")?);
            }
            "-h" | "--help" => {
                println!("Usage: compact_duplicates [--db <path>] [--key <hex>]");
                return Ok(());
            }
            other => {
                anyhow::bail!("Unknown arg: {other}\nUsage: compact_duplicates [--db <path>] [--key <hex>]")
            }
        }
    }

    let registry = Arc::new(
        SqliteRegistry::new(&db_path)
            .with_context(|| format!("Failed to open registry at {db_path}"))?,
    );
    let service = CompactionService::new(registry);

    match key {
        Some(key) => {
            let deleted = service
                .compact_key(&key)
                .context("Compaction failed")?;
            if deleted > 0 {
                println!("Deleted {deleted} duplicate record(s)");
            } else {
                println!("No duplicates found.");
            }
        }
        None => {
            let report = service.compact_all().context("Compaction failed")?;
            println!(
                "Scanned {} key(s), deleted {} duplicate record(s)",
                report.keys_scanned, report.records_deleted
            );
        }
    }

    Ok(())
}
