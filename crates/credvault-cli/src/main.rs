//! CredVault CLI entry point.

use clap::Parser;
use credvault_cli::{init_logging, run, Cli, Context};

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration, then logging, so the configured filter applies
    let ctx = Context::load(cli.config.as_deref())?;
    init_logging(&ctx.config.logging, cli.verbose);

    // Run the command
    run(cli, &ctx)
}
