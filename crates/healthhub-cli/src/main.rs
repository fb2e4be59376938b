mod cli;
mod commands;
mod observability;
mod output;
mod store;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use healthhub_beds::{AllocationWorkflow, BedDirectory, Reconciler};
use healthhub_config::loader::load_config;

use cli::{Cli, Commands};
use commands::Completion;
use output::print_error;

/// Exit codes: 0 success, 1 failure, 2 partial failure.
#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(completion) => completion.exit_code(),
        Err(e) => {
            print_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<Completion> {
    // .env may set HEALTHHUB_CONFIG, so load it before parsing arguments
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound) {
            output::print_warning(&format!("Ignoring unreadable .env file: {e}"));
        }
    }
    let cli = Cli::parse();
    let format = cli.format.unwrap_or_default();

    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    observability::init_tracing_with_level(&config.logging.level);

    let store = store::open_store(&config)?;
    let tables = store::table_names(&config);

    match &cli.command {
        Commands::Beds(args) => {
            let directory = BedDirectory::new(store).with_tables(tables);
            commands::beds::run(&directory, &args.command, format).await?;
        }
        Commands::Allocate(args) => {
            let workflow = AllocationWorkflow::new(store).with_tables(tables);
            return commands::allocation::allocate(&workflow, args, format).await;
        }
        Commands::Discharge(args) => {
            let workflow = AllocationWorkflow::new(store).with_tables(tables);
            return commands::allocation::discharge(&workflow, args, format).await;
        }
        Commands::Allocations(args) => {
            let directory = BedDirectory::new(store).with_tables(tables);
            commands::allocation::patient_allocations(&directory, &args.patient_id, format)
                .await?;
        }
        Commands::Reconcile(args) => {
            let reconciler = Reconciler::new(store).with_tables(tables);
            commands::reconcile::reconcile(&reconciler, args.apply, format).await?;
        }
    }

    Ok(Completion::Done)
}
