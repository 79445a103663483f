// Check that the Teams MCP server project is laid out and installed correctly

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use teams_mcp_cli::CommonArgs;
use teams_mcp_core::verify::SetupVerifier;
use teams_mcp_core::SystemRunner;

#[derive(Parser, Debug)]
#[command(name = "verify-setup")]
#[command(about = "Verify the Teams MCP server configuration without authenticating", long_about = None)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    args.common.init_tracing();

    let config = args.common.load_config()?;
    let root = std::env::current_dir().context("Failed to resolve working directory")?;

    let stdout = std::io::stdout();
    let report = SetupVerifier::new(&SystemRunner, root, &config.verify, &config.server)
        .run(&mut stdout.lock())
        .await?;

    Ok(args.common.exit_code(report.all_ok()))
}
