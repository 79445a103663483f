// Obtain a Microsoft Graph access token for the Teams MCP server via the Azure CLI

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use teams_mcp_cli::CommonArgs;
use teams_mcp_core::token::{SaveMode, TokenHelper};
use teams_mcp_core::SystemRunner;

#[derive(Parser, Debug)]
#[command(name = "get-token")]
#[command(about = "Get a Microsoft Graph access token for the Teams MCP server", long_about = None)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Save the token to the .env file without asking
    #[arg(short, long, conflicts_with = "no_save")]
    yes: bool,

    /// Never save the token
    #[arg(long)]
    no_save: bool,
}

impl Args {
    fn save_mode(&self) -> SaveMode {
        match (self.yes, self.no_save) {
            (true, _) => SaveMode::Always,
            (_, true) => SaveMode::Never,
            _ => SaveMode::Prompt,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    args.common.init_tracing();

    let config = args.common.load_config()?;
    let helper = TokenHelper::new(&SystemRunner, &config.token, args.save_mode());

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let report = helper.run(&mut stdin.lock(), &mut stdout.lock()).await?;

    tracing::debug!(obtained = report.succeeded(), saved = report.saved, "Token helper finished");
    Ok(args.common.exit_code(report.succeeded()))
}
