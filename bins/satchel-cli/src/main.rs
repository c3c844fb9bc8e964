//! satchel — command-line interface for the single-key Satchel wallet.
//!
//! Every command prints one JSON document to stdout. Failures print
//! `{"error": "..."}` and exit with status 1. Logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

use satchel_core::address::Network;
use satchel_core::types::Utxo;
use satchel_wallet::coin_selection::{DEFAULT_BASE_FEE, DEFAULT_FEE_PER_INPUT};
use satchel_wallet::config::DEFAULT_BROADCAST_RETRIES;
use satchel_wallet::{FeePolicy, HttpExplorer, MemoryStore, RocksStore, WalletConfig, WalletService};

/// Satchel command-line wallet.
#[derive(Parser)]
#[command(name = "satchel")]
#[command(version, about = "Single-key command-line UTXO wallet")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Data directory (default: ~/.satchel).
    #[arg(short = 'd', long, global = true)]
    datadir: Option<PathBuf>,

    /// Network (mainnet/livenet or testnet).
    #[arg(short = 'n', long, global = true, default_value = "testnet")]
    network: String,

    /// Data to embed in sent transactions.
    #[arg(short = 'm', long, global = true)]
    data: Option<String>,

    /// Explorer API base URL (default: $SATCHEL_EXPLORER_URL or the network default).
    #[arg(long, global = true)]
    explorer: Option<String>,

    /// Broadcast retries on network failure.
    #[arg(long, global = true, default_value_t = DEFAULT_BROADCAST_RETRIES)]
    retries: u32,

    /// Fixed fee per transaction.
    #[arg(long, global = true, default_value_t = DEFAULT_BASE_FEE)]
    base_fee: u64,

    /// Additional fee per input.
    #[arg(long, global = true, default_value_t = DEFAULT_FEE_PER_INPUT)]
    fee_per_input: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new wallet key in the data directory.
    Init {
        /// Data directory, overriding --datadir.
        dir: Option<PathBuf>,
        /// Replace an existing key.
        #[arg(long)]
        force: bool,
    },
    /// Show the wallet address and its explorer summary.
    Info,
    /// Look up an address.
    Addr { address: String },
    /// Look up a transaction.
    Tx { txid: String },
    /// List unspent outputs of an address.
    Utxo { address: String },
    /// Send <amount> smallest units to <to>.
    Send { to: String, amount: u64 },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(mut output) => {
            print_json(&output);
            scrub_secrets(&mut output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            print_json(&json!({ "error": format!("{e:#}") }));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<Value> {
    let global = cli.global;
    match cli.command {
        Commands::Init { dir, force } => {
            let config = build_config(&global, dir)?;
            let wallet = open_wallet(config)?;
            let report = wallet.init_wallet(force)?;
            Ok(json!({
                "pkey": report.wif.as_str(),
                "addr": report.address.to_string(),
                "network": report.network,
            }))
        }
        Commands::Info => {
            let wallet = open_wallet(build_config(&global, None)?)?;
            Ok(serde_json::to_value(wallet.info().await?)?)
        }
        Commands::Addr { address } => {
            let wallet = lookup_wallet(build_config(&global, None)?)?;
            Ok(wallet.address_info(&address).await?)
        }
        Commands::Tx { txid } => {
            let wallet = lookup_wallet(build_config(&global, None)?)?;
            Ok(wallet.transaction(&txid).await?)
        }
        Commands::Utxo { address } => {
            let wallet = lookup_wallet(build_config(&global, None)?)?;
            let utxos = wallet.utxos(&address).await?;
            Ok(Value::Array(utxos.iter().map(utxo_json).collect()))
        }
        Commands::Send { to, amount } => {
            let wallet = open_wallet(build_config(&global, None)?)?;
            Ok(serde_json::to_value(wallet.send_payment(&to, amount).await?)?)
        }
    }
}

fn build_config(global: &GlobalArgs, dir: Option<PathBuf>) -> Result<WalletConfig> {
    let network: Network = global
        .network
        .parse()
        .with_context(|| format!("invalid network '{}'", global.network))?;

    let mut config = WalletConfig::for_network(network);
    if let Some(dir) = dir.or_else(|| global.datadir.clone()) {
        config.data_dir = dir;
    }
    config.explorer_url = global
        .explorer
        .clone()
        .unwrap_or_else(|| WalletConfig::explorer_url_from_env(network));
    config.data = global.data.clone().map(String::into_bytes);
    config.broadcast_retries = global.retries;
    config.fee_policy = FeePolicy::new(global.base_fee, global.fee_per_input);

    debug!(
        data_dir = %config.data_dir.display(),
        %network,
        explorer = %config.explorer_url,
        "configuration resolved"
    );
    Ok(config)
}

/// Wallet backed by the on-disk key database.
fn open_wallet(config: WalletConfig) -> Result<WalletService<RocksStore, HttpExplorer>> {
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data directory {}", config.data_dir.display()))?;
    let store = RocksStore::open(config.db_path())?;
    let explorer = HttpExplorer::new(&config.explorer_url)?;
    Ok(WalletService::new(config, store, explorer))
}

/// Wallet for explorer lookups (`addr`, `tx`, `utxo`).
///
/// These commands never read the key, so the data directory is left alone
/// and an empty in-memory store stands in for the key database.
fn lookup_wallet(config: WalletConfig) -> Result<WalletService<MemoryStore, HttpExplorer>> {
    let explorer = HttpExplorer::new(&config.explorer_url)?;
    Ok(WalletService::new(config, MemoryStore::new(), explorer))
}

fn utxo_json(utxo: &Utxo) -> Value {
    json!({
        "txid": utxo.outpoint.txid.to_string(),
        "vout": utxo.outpoint.index,
        "address": utxo.address.to_string(),
        "satoshis": utxo.value,
    })
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", *Zeroizing::new(text)),
        Err(_) => println!("{value}"),
    }
}

/// Wipe the exported key from command output once it has been printed.
fn scrub_secrets(value: &mut Value) {
    if let Some(Value::String(pkey)) = value.get_mut("pkey") {
        pkey.zeroize();
    }
}
