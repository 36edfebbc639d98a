//! Full stock sync binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use secrecy::ExposeSecret;

use integrations_fulfillment_sync::{
    create_token_manager, get_user_message, init_logging, AesGcmCipher, ApiClient,
    DatabaseConfig, ExpansionStatus, LogFormat, LogLevel, LoggingConfig, PostgresCatalog,
    PostgresCredentialStore, RawReport, ReqwestHttpTransport, StockSynchronizer, StoreKey,
    SyncConfig, SyncError,
};

/// Applies a fulfillment-center stock report to the ERP deposit of a store.
#[derive(Parser, Debug)]
#[command(name = "full-stock-sync")]
#[command(version, about, long_about = None)]
struct Args {
    /// Store whose credentials and deposit are used
    #[arg(short, long, env = "FULL_SYNC_STORE", required_unless_present = "generate_key")]
    store: Option<String>,

    /// Stock report exported as CSV
    #[arg(short, long, required_unless_present = "generate_key")]
    report: Option<PathBuf>,

    /// Expand the report and print the deltas without posting
    #[arg(long)]
    dry_run: bool,

    /// Create the credential table if it is missing
    #[arg(long)]
    ensure_schema: bool,

    /// Print a fresh token encryption key and exit
    #[arg(long)]
    generate_key: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "FULL_SYNC_LOG_LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Log format (pretty, json, compact)
    #[arg(long, env = "FULL_SYNC_LOG_FORMAT", default_value = "compact")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(
        &LoggingConfig::new()
            .with_level(args.log_level)
            .with_format(args.log_format),
    )
    .context("failed to install log subscriber")?;

    if args.generate_key {
        let key = AesGcmCipher::generate_key()?;
        println!("{}", key.expose_secret());
        return Ok(());
    }

    if let Err(e) = run(&args).await {
        if let Some(sync_error) = e.downcast_ref::<SyncError>() {
            tracing::error!(code = sync_error.error_code(), error = %sync_error, "Stock sync failed");
            eprintln!("{}", get_user_message(sync_error));
        }
        return Err(e);
    }
    Ok(())
}

async fn run(args: &Args) -> Result<()> {
    let store = StoreKey::new(args.store.as_deref().unwrap_or_default());
    let report_path = args.report.clone().unwrap_or_default();

    let config = Arc::new(SyncConfig::from_env()?);
    config.store(&store)?;

    let report = RawReport::from_csv_path(&report_path, &config.report_layout)?;
    tracing::info!(store = %store, skus = report.len(), path = %report_path.display(), "Loaded report");

    let pool = DatabaseConfig::from_env().create_pool()?;
    let credentials = Arc::new(PostgresCredentialStore::new(
        pool.clone(),
        config.credentials_table.clone(),
    )?);
    if args.ensure_schema {
        credentials.ensure_schema().await?;
    }
    let catalog = Arc::new(PostgresCatalog::new(pool, config.products_table.clone())?);

    let transport = Arc::new(ReqwestHttpTransport::with_timeout(config.timeout)?);
    let tokens = Arc::new(create_token_manager(
        config.clone(),
        transport.clone(),
        credentials,
    )?);
    let client = ApiClient::new(config.clone(), transport, tokens);
    let synchronizer = StockSynchronizer::new(client, catalog);

    if args.dry_run {
        let expansion = synchronizer.plan(&report).await?;
        println!("{}", serde_json::to_string_pretty(&expansion.deltas)?);
        println!(
            "matched={} unmatched={} malformed={} total_quantity={}",
            expansion.matched,
            expansion.unmatched_skus.len(),
            expansion.failures.len(),
            expansion.total_quantity()
        );
        return Ok(());
    }

    let result = synchronizer.run(&store, &report).await?;
    let summary = &result.summary;
    println!(
        "posted={} skipped={} failed={} unmatched={}",
        summary.posted,
        summary.skipped,
        summary.failed(),
        result.expansion.unmatched_skus.len()
    );
    for failure in &summary.failures {
        println!(
            "failed sku={} id={}: {}",
            failure.sku.as_deref().unwrap_or("-"),
            failure.id,
            failure.message
        );
    }

    match result.status() {
        ExpansionStatus::Ready if summary.failures.is_empty() => Ok(()),
        ExpansionStatus::Ready => anyhow::bail!("{} stock adjustments failed", summary.failed()),
        ExpansionStatus::NoMatches => anyhow::bail!("no report SKU matched the product catalog"),
        ExpansionStatus::AllFailed => {
            anyhow::bail!("every matched product has a malformed structure")
        }
    }
}
