use bigdecimal::BigDecimal;
use clap::{Parser, Subcommand};

use crate::config::{mask_password, Config};
use crate::domain::{Transaction, TransactionStatus};
use crate::error::TransitionError;
use crate::services::TransitionCoordinator;

#[derive(Parser)]
#[command(name = "settlement-guard")]
#[command(about = "Settlement Guard - race-free transaction status transitions", long_about = None)]
pub struct Cli {
    /// Dry run against a throwaway in-process store instead of Postgres.
    /// Each invocation starts empty, so only `tx create` and `health` accept it.
    #[arg(long, global = true)]
    pub in_memory: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transaction commands
    #[command(subcommand)]
    Tx(TxCommands),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Check that the store answers
    Health,

    /// Configuration validation
    Config,
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Create a pending transaction
    Create {
        #[arg(value_name = "TX_ID")]
        tx_id: String,
        #[arg(value_name = "AMOUNT")]
        amount: BigDecimal,
    },

    /// Show a transaction
    Get {
        #[arg(value_name = "TX_ID")]
        tx_id: String,
    },

    /// Move a transaction from one status to another
    Transition {
        #[arg(value_name = "TX_ID")]
        tx_id: String,
        #[arg(value_name = "FROM")]
        from: TransactionStatus,
        #[arg(value_name = "TO")]
        to: TransactionStatus,
        /// Also require the stored version to match
        #[arg(long)]
        version: Option<i64>,
    },

    /// List transactions, newest first
    List {
        #[arg(short, long, default_value_t = 20, value_parser = clap::value_parser!(i64).range(0..))]
        limit: i64,
        #[arg(short, long, default_value_t = 0, value_parser = clap::value_parser!(i64).range(0..))]
        offset: i64,
    },
}

impl TxCommands {
    /// Commands that read records created by an earlier invocation.
    pub fn reads_existing_records(&self) -> bool {
        !matches!(self, TxCommands::Create { .. })
    }
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

pub async fn handle_tx(coordinator: &TransitionCoordinator, cmd: TxCommands) -> anyhow::Result<()> {
    match cmd {
        TxCommands::Create { tx_id, amount } => {
            print_transaction(&coordinator.create(tx_id, amount).await?)
        }
        TxCommands::Get { tx_id } => print_transaction(&coordinator.get(&tx_id).await?),
        TxCommands::Transition {
            tx_id,
            from,
            to,
            version,
        } => {
            let result = match version {
                Some(v) => coordinator.try_transition_at_version(&tx_id, from, v, to).await,
                None => coordinator.try_transition(&tx_id, from, to).await,
            };
            match result {
                Ok(tx) => print_transaction(&tx),
                Err(e @ TransitionError::Conflict { .. }) => {
                    anyhow::bail!("{} (re-read the transaction before retrying)", e)
                }
                Err(e) => Err(e.into()),
            }
        }
        TxCommands::List { limit, offset } => {
            let txs = coordinator.list(limit, offset).await?;
            println!("{}", serde_json::to_string_pretty(&txs)?);
            Ok(())
        }
    }
}

pub async fn handle_health(coordinator: &TransitionCoordinator) -> anyhow::Result<()> {
    coordinator.health_check().await?;
    println!("✓ Store is reachable");
    Ok(())
}

pub fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!(
        "  Database URL: {}",
        config
            .database_url
            .as_deref()
            .map(mask_password)
            .unwrap_or_else(|| "<unset>".to_string())
    );
    println!("  Max Connections: {}", config.database_max_connections);
    println!("  Acquire Timeout: {}s", config.database_acquire_timeout_secs);

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");

    Ok(())
}

fn print_transaction(tx: &Transaction) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(tx)?);
    Ok(())
}
