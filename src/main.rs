use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use taskpay::application::engine::{SettlementEngine, Stores};
use taskpay::config::Settings;
use taskpay::domain::money::Amount;
use taskpay::domain::ports::WalletStore;
use taskpay::domain::webhook::WebhookVerifier;
use taskpay::infrastructure::gateway::HttpGateway;
use taskpay::infrastructure::in_memory::in_memory_stores;
use taskpay::interfaces::csv::quote_reader::QuoteReader;
use taskpay::interfaces::csv::writer::{QuoteWriter, WalletWriter};
use taskpay::interfaces::http::build_router;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};

#[cfg(not(feature = "storage-rocksdb"))]
const FALLBACK_WARNING: &str = concat!(
    "WARNING: Persistent storage requested via --db-path, ",
    "but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
);

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API and the payment webhook receiver
    Serve {
        /// Listen address, overrides the settings file
        #[arg(long)]
        addr: Option<String>,
    },
    /// Print the fee breakdown for task prices as CSV
    Quote {
        /// A single task price
        #[arg(long, conflicts_with = "input")]
        amount: Option<Decimal>,
        /// CSV file with `task,amount` rows
        input: Option<PathBuf>,
    },
    /// Export wallet balances as CSV
    Wallets,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    taskpay::logging::init_logging(cli.verbose)?;

    let settings = Settings::load(cli.config.as_deref()).into_diagnostic()?;

    match cli.command {
        Command::Serve { addr } => serve(settings, cli.db_path, addr).await,
        Command::Quote { amount, input } => quote(&settings, amount, input),
        Command::Wallets => export_wallets(cli.db_path).await,
    }
}

fn open_stores(db_path: Option<PathBuf>) -> Result<Stores> {
    let Some(db_path) = db_path else {
        return Ok(in_memory_stores());
    };

    #[cfg(feature = "storage-rocksdb")]
    {
        let store =
            taskpay::infrastructure::rocksdb::RocksDBStore::open(&db_path).into_diagnostic()?;
        info!(path = %db_path.display(), "Using RocksDB storage");
        Ok(store.stores())
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    {
        let _ = db_path;
        warn!("{FALLBACK_WARNING}");
        Ok(in_memory_stores())
    }
}

async fn serve(settings: Settings, db_path: Option<PathBuf>, addr: Option<String>) -> Result<()> {
    settings.require_secrets().into_diagnostic()?;

    let gateway = HttpGateway::new(
        settings.gateway.base_url.clone(),
        settings.gateway.secret_key.clone(),
        settings.gateway.timeout(),
    )
    .into_diagnostic()?;
    let verifier = WebhookVerifier::new(settings.gateway.webhook_secret());
    let engine = SettlementEngine::new(
        open_stores(db_path)?,
        Box::new(gateway),
        verifier,
        settings.engine_config(),
    );

    let app = build_router(Arc::new(engine)).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    let addr = addr.unwrap_or(settings.server.listen_addr);
    let listener = tokio::net::TcpListener::bind(&addr).await.into_diagnostic()?;
    info!(%addr, "taskpay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .into_diagnostic()
}

fn quote(settings: &Settings, amount: Option<Decimal>, input: Option<PathBuf>) -> Result<()> {
    let stdout = io::stdout();
    let mut writer = QuoteWriter::new(stdout.lock()).into_diagnostic()?;

    if let Some(amount) = amount {
        let subtotal = Amount::new(amount).into_diagnostic()?;
        writer
            .write("-", &settings.fees.breakdown(subtotal))
            .into_diagnostic()?;
        return writer.finish().into_diagnostic();
    }

    let Some(input) = input else {
        return Err(miette::miette!("either --amount or an input CSV is required"));
    };
    let reader = QuoteReader::new(File::open(input).into_diagnostic()?);
    for row in reader.rows() {
        let priced = row.and_then(|row| {
            let breakdown = settings.fees.breakdown(Amount::new(row.amount)?);
            Ok((row.task, breakdown))
        });
        match priced {
            Ok((task, breakdown)) => writer.write(&task, &breakdown).into_diagnostic()?,
            Err(e) => warn!(error = %e, "Skipping row"),
        }
    }
    writer.finish().into_diagnostic()
}

async fn export_wallets(db_path: Option<PathBuf>) -> Result<()> {
    let stores = open_stores(db_path)?;
    let wallets = stores.wallets.get_all().await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = WalletWriter::new(stdout.lock());
    writer.write_wallets(wallets).into_diagnostic()?;
    Ok(())
}
