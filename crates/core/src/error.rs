//! Error types shared by the Teams MCP tools.

use std::path::PathBuf;

/// Result type for subprocess invocations.
pub type CommandResult<T> = Result<T, CommandError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Failure to run an external program at all.
///
/// A program that runs and exits non-zero is not an error at this level;
/// callers inspect [`crate::command::CommandOutput::success`].
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The program could not be found on `PATH`.
    #[error("command not found: {program}")]
    NotFound { program: String },

    /// Spawning or waiting on the program failed.
    #[error("failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from obtaining an access token through the Azure CLI.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// `az` is not installed.
    #[error("Azure CLI not found")]
    CliNotFound,

    /// `az` ran but exited non-zero.
    #[error("Azure CLI command failed (exit code {code:?}): {stderr}")]
    CommandFailed { code: Option<i32>, stderr: String },

    /// `az` succeeded but printed nothing.
    #[error("Azure CLI returned an empty access token")]
    EmptyToken,

    /// Any other failure to run `az`.
    #[error(transparent)]
    Command(CommandError),
}

impl From<CommandError> for TokenError {
    fn from(error: CommandError) -> Self {
        match error {
            CommandError::NotFound { .. } => Self::CliNotFound,
            other => Self::Command(other),
        }
    }
}

/// Errors from loading `teams-mcp.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_cli_not_found() {
        let error: TokenError = CommandError::NotFound {
            program: "az".to_string(),
        }
        .into();
        assert!(matches!(error, TokenError::CliNotFound));
    }

    #[test]
    fn test_io_error_is_kept() {
        let error: TokenError = CommandError::Io {
            program: "az".to_string(),
            source: std::io::Error::other("broken pipe"),
        }
        .into();
        assert!(matches!(error, TokenError::Command(_)));
        assert_eq!(error.to_string(), "failed to run az: broken pipe");
    }
}
