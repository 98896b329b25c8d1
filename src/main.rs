use clap::Parser;
use devhire::application::engine::MarketplaceEngine;
use devhire::config::EngineConfig;
use devhire::domain::ports::StoreBox;
use devhire::infrastructure::in_memory::InMemoryStore;
use devhire::infrastructure::notifier::TracingNotifier;
use devhire::interfaces::csv::balance_writer::{BalanceRow, BalanceWriter};
use devhire::interfaces::csv::command_reader::CommandReader;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input command script (CSV)
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// JSON engine configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Withdrawal commission in percent, overrides the config file
    #[arg(long)]
    fee_percentage: Option<Decimal>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn open_store(db_path: Option<PathBuf>) -> Result<StoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store =
                devhire::infrastructure::rocksdb::RocksDBStore::open(path).into_diagnostic()?;
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryStore::new()))
        }
        None => Ok(Box::new(InMemoryStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path).into_diagnostic()?,
        None => EngineConfig::default(),
    };
    if let Some(fee_percentage) = cli.fee_percentage {
        config = config.with_fee_percentage(fee_percentage).into_diagnostic()?;
    }

    let store = open_store(cli.db_path)?;
    let engine = MarketplaceEngine::new(store, Arc::new(TracingNotifier), config);

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    let mut applied = 0usize;
    for (line, command) in reader.commands().enumerate() {
        match command {
            Ok(command) => match command.execute(&engine).await {
                Ok(()) => applied += 1,
                Err(e) => warn!(
                    row = line + 1,
                    command = ?command.command,
                    "Error processing command: {e}"
                ),
            },
            Err(e) => warn!(row = line + 1, "Error reading command: {e}"),
        }
    }
    engine.flush_notifications().await;
    info!(applied, "script finished");

    let rows = engine
        .users()
        .await
        .into_diagnostic()?
        .iter()
        .map(BalanceRow::new)
        .collect();

    let stdout = io::stdout();
    let mut writer = BalanceWriter::new(stdout.lock());
    writer.write_balances(rows).into_diagnostic()?;

    Ok(())
}
