// Configuration for the token helper, smoke test and setup verifier.
// Every field has a default, so running without a config file behaves
// exactly like the stock project layout.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file, looked up in the working directory.
pub const CONFIG_FILE: &str = "teams-mcp.toml";

/// Environment variable carrying the Graph bearer token.
pub const TOKEN_ENV_VAR: &str = "TEAMS_ACCESS_TOKEN";

/// Environment variable overriding `smoke.team_id`.
pub const TEAM_ID_ENV_VAR: &str = "TEAMS_TEST_TEAM_ID";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub token: TokenConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub verify: VerifyConfig,

    #[serde(default)]
    pub smoke: SmokeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Azure CLI executable.
    #[serde(default = "default_az_program")]
    pub program: String,

    /// Resource the token is scoped to.
    #[serde(default = "default_resource")]
    pub resource: String,

    /// File the token line is appended to.
    #[serde(default = "default_env_file")]
    pub env_file: PathBuf,
}

fn default_az_program() -> String {
    "az".to_string()
}

fn default_resource() -> String {
    "https://graph.microsoft.com".to_string()
}

fn default_env_file() -> PathBuf {
    PathBuf::from(".env")
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            program: default_az_program(),
            resource: default_resource(),
            env_file: default_env_file(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Command that starts the MCP server.
    #[serde(default = "default_python")]
    pub command: String,

    #[serde(default = "default_server_args")]
    pub args: Vec<String>,

    /// Module that defines the server object.
    #[serde(default = "default_server_module")]
    pub module: String,

    /// Name of the server object inside `module`.
    #[serde(default = "default_server_attribute")]
    pub attribute: String,

    /// Per-request timeout for the stdio client; `0` waits forever.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_python() -> String {
    "python".to_string()
}

fn default_server_args() -> Vec<String> {
    vec!["main.py".to_string()]
}

fn default_server_module() -> String {
    "app.server".to_string()
}

fn default_server_attribute() -> String {
    "mcp".to_string()
}

fn default_request_timeout_secs() -> u64 {
    0
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            command: default_python(),
            args: default_server_args(),
            module: default_server_module(),
            attribute: default_server_attribute(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedFile {
    pub path: PathBuf,
    pub description: String,
}

impl ExpectedFile {
    fn new(path: &str, description: &str) -> Self {
        Self {
            path: PathBuf::from(path),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedPackage {
    /// Import name, e.g. `pydantic_settings`.
    pub name: String,
    pub description: String,
}

impl ExpectedPackage {
    fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Interpreter used to probe imports.
    #[serde(default = "default_python")]
    pub python: String,

    #[serde(default = "default_expected_files")]
    pub files: Vec<ExpectedFile>,

    #[serde(default = "default_expected_packages")]
    pub packages: Vec<ExpectedPackage>,
}

fn default_expected_files() -> Vec<ExpectedFile> {
    vec![
        ExpectedFile::new("app/server.py", "Server module"),
        ExpectedFile::new("main.py", "Main entry point"),
        ExpectedFile::new("requirements.txt", "Requirements file"),
        ExpectedFile::new("test_teams_mcp.py", "Test script"),
        ExpectedFile::new("TEAMS_MCP_SETUP.md", "Setup documentation"),
    ]
}

fn default_expected_packages() -> Vec<ExpectedPackage> {
    vec![
        ExpectedPackage::new("mcp", "Model Context Protocol"),
        ExpectedPackage::new("httpx", "HTTP client library"),
        ExpectedPackage::new("fastapi", "FastAPI framework"),
        ExpectedPackage::new("pydantic_settings", "Pydantic Settings"),
        ExpectedPackage::new("dotenv", "Python dotenv"),
    ]
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            python: default_python(),
            files: default_expected_files(),
            packages: default_expected_packages(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmokeConfig {
    /// Team used by the team-scoped smoke cases; they are skipped without one.
    #[serde(default)]
    pub team_id: Option<String>,
}

impl ToolsConfig {
    /// Load configuration from `path`, falling back to defaults when the file
    /// does not exist.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            tracing::debug!("Configuration file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides (`TEAMS_TEST_TEAM_ID`).
    pub fn apply_env(&mut self) {
        self.apply_team_id(std::env::var(TEAM_ID_ENV_VAR).ok());
    }

    fn apply_team_id(&mut self, team_id: Option<String>) {
        if let Some(team_id) = team_id.filter(|id| !id.trim().is_empty()) {
            self.smoke.team_id = Some(team_id);
        }
    }
}
