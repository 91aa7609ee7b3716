//! lana-core CLI
//!
//! Thin command-line front end over the library operations. Output is JSON
//! on stdout, logs go to stderr. Private keys are read from stdin, never
//! from the argument list.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use zeroize::Zeroize;

use lana_core::node::NodeClient;
use lana_core::operations;
use lana_core::types::{
    ConsolidationRequest, NodeEndpoint, PaymentRequest, Recipient, Utxo, WifSecret,
};
use lana_core::utils::{logging, NetworkConfig, SystemClock};
use lana_core::wallet::UtxoAnalyzer;

#[derive(Parser)]
#[command(name = "lana-core")]
#[command(about = "Lanacoin address tools, UTXO consolidation and payments")]
#[command(version)]
struct Cli {
    /// JSON network config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Node endpoint as host:port; repeat for fallbacks. Replaces the
    /// endpoints from --config.
    #[arg(short, long = "endpoint", global = true)]
    endpoints: Vec<NodeEndpoint>,

    /// Verbose logging (same as LANA_LOG=debug)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an address; exits non-zero if it is invalid
    ValidateAddress { address: String },

    /// Print the address and public key for a WIF read from stdin
    Derive,

    /// List and analyze the unspent outputs of an address
    Analyze { address: String },

    /// Sweep outputs back into the sender address (WIF on stdin)
    Consolidate {
        #[arg(long)]
        sender: String,

        /// JSON file holding the array of outputs to spend
        #[arg(long)]
        utxos: PathBuf,
    },

    /// Pay recipients from the sender address (WIF on stdin)
    Send {
        #[arg(long)]
        sender: String,

        /// Recipient as address:amount in lanoshi; repeatable
        #[arg(long = "to", required = true, value_parser = parse_recipient)]
        recipients: Vec<Recipient>,
    },
}

fn parse_recipient(s: &str) -> std::result::Result<Recipient, String> {
    let (address, amount) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("expected address:amount, got '{}'", s))?;
    let amount = amount
        .parse::<u64>()
        .map_err(|e| format!("bad amount '{}': {}", amount, e))?;
    Ok(Recipient {
        address: address.to_string(),
        amount,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_from_env();
    if cli.debug {
        logging::enable_debug();
    }

    match &cli.command {
        Commands::ValidateAddress { address } => {
            let report = operations::validate_address(address);
            print_json(&report)?;
            if !report.valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Derive => {
            let wif = read_wif()?;
            let identity = operations::derive_identity(&wif)?;
            print_json(&identity)
        }
        Commands::Analyze { address } => {
            let analyzer = UtxoAnalyzer::new(Arc::new(node_client(&cli)?));
            let outcome = operations::analyze_address(&analyzer, address).await?;
            print_json(&outcome)
        }
        Commands::Consolidate { sender, utxos } => {
            let text = std::fs::read_to_string(utxos)
                .with_context(|| format!("reading {}", utxos.display()))?;
            let selected: Vec<Utxo> = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", utxos.display()))?;
            let client = node_client(&cli)?;
            let request = ConsolidationRequest {
                sender_address: sender.clone(),
                selected_utxos: selected,
                private_key_wif: read_wif()?,
                node_endpoints: Vec::new(),
            };
            let response = operations::consolidate(&client, &request, &SystemClock).await;
            finish(&response)
        }
        Commands::Send { sender, recipients } => {
            let client = node_client(&cli)?;
            let request = PaymentRequest {
                sender_address: sender.clone(),
                recipients: recipients.clone(),
                private_key_wif: read_wif()?,
                node_endpoints: Vec::new(),
            };
            let response = operations::send_payment(&client, &request, &SystemClock).await;
            finish(&response)
        }
    }
}

fn node_client(cli: &Cli) -> Result<NodeClient> {
    let config = match &cli.config {
        Some(path) => NetworkConfig::load(path)?,
        None => NetworkConfig::default(),
    };
    Ok(NodeClient::new(config.overridden_by(&cli.endpoints))?)
}

/// First line of stdin, trimmed
fn read_wif() -> Result<WifSecret> {
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading private key from stdin")?;
    let wif = WifSecret::new(line.trim());
    line.zeroize();
    if wif.expose().is_empty() {
        bail!("no private key on stdin");
    }
    Ok(wif)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn finish(response: &lana_core::types::OperationResponse) -> Result<()> {
    print_json(response)?;
    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}
