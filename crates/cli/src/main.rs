use clap::Parser;

mod commands;

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    waypost_observability::init_with(cli.log_format.into());

    if let Err(err) = commands::run(cli).await {
        tracing::error!(error = %format!("{err:#}"), "waypost failed");
        return Err(err);
    }

    Ok(())
}
