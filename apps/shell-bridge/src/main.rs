use anyhow::Context;
use clap::Parser;
use shell_bridge::host::{self, cli::Cli};
use shell_bridge::telemetry::logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.logging.to_config()).context("failed to initialise logging")?;
    host::run(&cli).context("shell session failed")?;
    Ok(())
}
