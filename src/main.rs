use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt}; // for .with() on registry

use settlement_guard::adapters::{InMemoryTransactionRepository, PostgresTransactionRepository};
use settlement_guard::cli::{self, Cli, Commands, DbCommands};
use settlement_guard::config::Config;
use settlement_guard::ports::TransactionRepository;
use settlement_guard::services::TransitionCoordinator;
use settlement_guard::db;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Config => cli::handle_config_validate(&config),
        Commands::Db(DbCommands::Migrate) => {
            let pool = db::create_pool(&config).await?;
            tracing::info!("Running database migrations...");
            db::run_migrations(&pool).await?;
            println!("✓ Database migrations completed");
            Ok(())
        }
        Commands::Health => {
            let coordinator = build_coordinator(&config, cli.in_memory).await?;
            cli::handle_health(&coordinator).await
        }
        Commands::Tx(cmd) => {
            if cli.in_memory && cmd.reads_existing_records() {
                anyhow::bail!(
                    "--in-memory starts with an empty store; only `tx create` and `health` support it"
                );
            }
            let coordinator = build_coordinator(&config, cli.in_memory).await?;
            cli::handle_tx(&coordinator, cmd).await
        }
    }
}

async fn build_coordinator(config: &Config, in_memory: bool) -> anyhow::Result<TransitionCoordinator> {
    let repository: Arc<dyn TransactionRepository> = if in_memory {
        tracing::info!("Using in-memory transaction store");
        Arc::new(InMemoryTransactionRepository::new())
    } else {
        let pool = db::create_pool(config).await?;
        db::run_migrations(&pool).await?;
        Arc::new(PostgresTransactionRepository::new(pool))
    };

    Ok(TransitionCoordinator::new(repository))
}
