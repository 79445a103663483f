// Shared building blocks for the Teams MCP developer tools

pub mod command;
pub mod config;
pub mod console;
pub mod error;
pub mod token;
pub mod verify;

pub use command::{CommandOutput, CommandRunner, SystemRunner};
pub use config::{ToolsConfig, CONFIG_FILE, TEAM_ID_ENV_VAR, TOKEN_ENV_VAR};
pub use error::{CommandError, ConfigError, TokenError};
