// Smoke test for the Teams MCP server: connect over stdio, list tools, call a few

use anyhow::Result;
use clap::Parser;
use std::io::Write;
use std::process::ExitCode;
use teams_mcp_cli::CommonArgs;
use teams_mcp_client::catalog::print_usage_examples;
use teams_mcp_client::smoke::{smoke_cases, SmokeTest};
use teams_mcp_client::ServerParams;
use teams_mcp_core::{console, TOKEN_ENV_VAR};

#[derive(Parser, Debug)]
#[command(name = "test-teams-mcp")]
#[command(about = "Test & demo client for the Teams MCP server", long_about = None)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Team used by the team-scoped calls (overrides config and TEAMS_TEST_TEAM_ID)
    #[arg(long)]
    team_id: Option<String>,

    /// Don't print the usage example catalog
    #[arg(long)]
    skip_examples: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    args.common.init_tracing();

    let mut config = args.common.load_config()?;
    if let Some(team_id) = args.team_id.clone() {
        config.smoke.team_id = Some(team_id);
    }

    let token_present = std::env::var(TOKEN_ENV_VAR).is_ok_and(|token| !token.is_empty());
    let smoke = SmokeTest {
        params: ServerParams::from_config(&config.server),
        timeout: config.server.request_timeout(),
        cases: smoke_cases(config.smoke.team_id.as_deref()),
        token_present,
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    console::section(&mut out, "Microsoft Teams MCP Server - Test & Demo")?;
    let report = smoke.run(&mut out).await?;

    if !args.skip_examples {
        print_usage_examples(&mut out)?;
    }

    console::section(&mut out, "Test Complete!")?;
    writeln!(out)?;

    Ok(args.common.exit_code(report.succeeded()))
}
