use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use almanac::app::AppContext;
use almanac::cli::{commands, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let ctx = AppContext::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run => {
            commands::run(&ctx).await?;
        }
        Commands::Preview => {
            commands::preview(&ctx).await?;
        }
        Commands::Daemon {
            interval,
            no_initial_run,
        } => {
            commands::daemon(&ctx, interval.as_deref(), no_initial_run).await?;
        }
    }

    Ok(())
}
