// Pieces shared by the get-token, test-teams-mcp and verify-setup binaries

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::process::ExitCode;
use teams_mcp_core::{ToolsConfig, CONFIG_FILE};

/// Flags every tool accepts.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = CONFIG_FILE)]
    pub config: PathBuf,

    /// Log debug output to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Exit with status 1 when the run did not succeed
    #[arg(long)]
    pub strict: bool,
}

impl CommonArgs {
    pub fn init_tracing(&self) {
        let default_filter = if self.verbose { "debug" } else { "warn" };

        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| default_filter.into()),
            )
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    /// Config file (or defaults) with environment overrides applied.
    pub fn load_config(&self) -> Result<ToolsConfig> {
        let mut config = ToolsConfig::load(&self.config)
            .with_context(|| format!("Failed to load {}", self.config.display()))?;
        config.apply_env();
        Ok(config)
    }

    /// Exit 0 unless `--strict` was given and the run failed.
    pub fn exit_code(&self, succeeded: bool) -> ExitCode {
        if self.should_fail(succeeded) {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }

    fn should_fail(&self, succeeded: bool) -> bool {
        self.strict && !succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        common: CommonArgs,
    }

    #[test]
    fn test_defaults() {
        let cli = TestCli::parse_from(["tool"]);

        assert_eq!(cli.common.config, PathBuf::from("teams-mcp.toml"));
        assert!(!cli.common.verbose);
        assert!(!cli.common.strict);
    }

    #[test]
    fn test_exit_code_policy() {
        let lenient = TestCli::parse_from(["tool"]).common;
        assert!(!lenient.should_fail(false));
        assert!(!lenient.should_fail(true));

        let strict = TestCli::parse_from(["tool", "--strict"]).common;
        assert!(strict.should_fail(false));
        assert!(!strict.should_fail(true));
    }

    #[test]
    fn test_load_config_reports_path_on_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("broken.toml");
        std::fs::write(&path, "[server\n").unwrap();
        let args = TestCli::parse_from(["tool", "--config", path.to_str().unwrap()]).common;

        let error = args.load_config().unwrap_err();
        assert!(error.to_string().contains("broken.toml"));
    }
}
