//! Microsoft Graph access token helper.
//!
//! Obtains a bearer token from the Azure CLI, prints it in the formats the
//! common shells expect and optionally appends it to a local `.env` file.
//! The token is opaque: it is trimmed and passed through, never validated.

use crate::command::CommandRunner;
use crate::config::{TokenConfig, TOKEN_ENV_VAR};
use crate::console;
use crate::error::TokenError;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// Number of characters shown by [`AccessToken::preview`].
pub const TOKEN_PREVIEW_CHARS: usize = 20;

const AZURE_CLI_INSTALL_URL: &str = "https://docs.microsoft.com/cli/azure/install-azure-cli";

/// Opaque bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Trim `raw`; `None` if nothing is left.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First few characters followed by `...`, safe to print.
    pub fn preview(&self) -> String {
        let head: String = self.0.chars().take(TOKEN_PREVIEW_CHARS).collect();
        format!("{head}...")
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&self.preview()).finish()
    }
}

/// The token rendered for copy-paste into each shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFormats {
    pub cmd: String,
    pub powershell: String,
    pub posix: String,
    pub dotenv: String,
}

impl ExportFormats {
    pub fn for_token(token: &AccessToken) -> Self {
        let token = token.as_str();
        Self {
            cmd: format!("set {TOKEN_ENV_VAR}={token}"),
            powershell: format!("$env:{TOKEN_ENV_VAR}=\"{token}\""),
            posix: format!("export {TOKEN_ENV_VAR}=\"{token}\""),
            dotenv: format!("{TOKEN_ENV_VAR}={token}"),
        }
    }

    fn print(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "\nTo use this token, set the environment variable:")?;
        writeln!(out, "\nWindows (cmd):")?;
        writeln!(out, "{}", self.cmd)?;
        writeln!(out, "\nWindows (PowerShell):")?;
        writeln!(out, "{}", self.powershell)?;
        writeln!(out, "\nLinux/Mac:")?;
        writeln!(out, "{}", self.posix)?;
        writeln!(out, "\nOr add to .env file:")?;
        writeln!(out, "{}", self.dotenv)
    }
}

/// Append `TEAMS_ACCESS_TOKEN=<token>` to `path`, creating it if needed.
///
/// Existing lines are left alone, including earlier tokens.
pub fn append_to_env_file(path: &Path, token: &AccessToken) -> io::Result<()> {
    let needs_newline = match std::fs::read(path) {
        Ok(bytes) => !bytes.is_empty() && !bytes.ends_with(b"\n"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => return Err(e),
    };

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    if needs_newline {
        file.write_all(b"\n")?;
    }
    writeln!(file, "{}", ExportFormats::for_token(token).dotenv)
}

/// Ask a yes/no question; only `y` (any case) counts as yes.
pub fn confirm(input: &mut dyn BufRead, out: &mut dyn Write, question: &str) -> io::Result<bool> {
    write!(out, "{question}")?;
    out.flush()?;

    let mut answer = String::new();
    if input.read_line(&mut answer)? == 0 {
        writeln!(out)?;
        return Ok(false);
    }
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

/// Installation and login state of the Azure CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliStatus {
    Ready { version: String },
    NotLoggedIn { version: Option<String> },
    NotInstalled,
}

impl CliStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// Thin wrapper over the `az` subcommands we need.
pub struct AzureCli<'a> {
    runner: &'a dyn CommandRunner,
    program: String,
    resource: String,
}

impl<'a> AzureCli<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &TokenConfig) -> Self {
        Self {
            runner,
            program: config.program.clone(),
            resource: config.resource.clone(),
        }
    }

    /// `az --version` then `az account show`. Never fails.
    pub async fn check(&self) -> CliStatus {
        let version = match self.runner.run(&self.program, &["--version"]).await {
            Ok(output) if output.success => output.first_stdout_line().to_string(),
            Ok(output) => {
                tracing::warn!(code = ?output.code, "`{} --version` failed", self.program);
                return CliStatus::NotLoggedIn { version: None };
            }
            Err(e) => {
                tracing::debug!(error = %e, "Azure CLI unavailable");
                return CliStatus::NotInstalled;
            }
        };

        match self.runner.run(&self.program, &["account", "show"]).await {
            Ok(output) if output.success => CliStatus::Ready { version },
            Ok(_) => CliStatus::NotLoggedIn {
                version: Some(version),
            },
            Err(e) => {
                tracing::warn!(error = %e, "`{} account show` could not run", self.program);
                CliStatus::NotInstalled
            }
        }
    }

    pub async fn get_access_token(&self) -> Result<AccessToken, TokenError> {
        let args = [
            "account",
            "get-access-token",
            "--resource",
            self.resource.as_str(),
            "--query",
            "accessToken",
            "-o",
            "tsv",
        ];
        let output = self.runner.run(&self.program, &args).await?;

        if !output.success {
            return Err(TokenError::CommandFailed {
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        AccessToken::parse(&output.stdout).ok_or(TokenError::EmptyToken)
    }
}

/// What to do with a freshly obtained token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveMode {
    #[default]
    Prompt,
    Always,
    Never,
}

#[derive(Debug, Clone)]
pub struct TokenReport {
    pub status: CliStatus,
    pub token: Option<AccessToken>,
    pub saved: bool,
}

impl TokenReport {
    pub fn succeeded(&self) -> bool {
        self.token.is_some()
    }
}

/// The interactive get-token flow.
pub struct TokenHelper<'a> {
    cli: AzureCli<'a>,
    env_file: PathBuf,
    save_mode: SaveMode,
}

impl<'a> TokenHelper<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &TokenConfig, save_mode: SaveMode) -> Self {
        Self {
            cli: AzureCli::new(runner, config),
            env_file: config.env_file.clone(),
            save_mode,
        }
    }

    /// Run the whole flow. Only console I/O errors are returned; every Azure
    /// CLI failure ends in the manual instructions instead.
    pub async fn run(&self, input: &mut dyn BufRead, out: &mut dyn Write) -> io::Result<TokenReport> {
        console::banner(out, "Microsoft Teams MCP Server - Access Token Helper")?;
        writeln!(out)?;

        let status = self.cli.check().await;
        print_status(out, &status)?;

        let mut report = TokenReport {
            status: status.clone(),
            token: None,
            saved: false,
        };

        if status.is_ready() {
            writeln!(out, "Getting access token via Azure CLI...")?;
            writeln!(out, "Make sure you're logged in with: az login\n")?;

            match self.cli.get_access_token().await {
                Ok(token) => {
                    report.saved = self.present_token(&token, input, out)?;
                    report.token = Some(token);
                    writeln!(out, "\n✅ Success! You can now run the Teams MCP server.")?;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to get access token");
                    print_token_error(out, &e)?;
                    writeln!(out, "\n❌ Failed to get access token")?;
                    print_manual_instructions(out)?;
                }
            }
        } else {
            print_manual_instructions(out)?;
        }

        console::section(out, "Next Steps:")?;
        console::steps(
            out,
            &[
                "Set the TEAMS_ACCESS_TOKEN environment variable",
                "Run: python main.py (to start the server)",
                "Run: test-teams-mcp (to test the server)",
            ],
        )?;
        console::rule(out, '=')?;

        Ok(report)
    }

    /// Print the token and handle the save prompt. Returns whether it was saved.
    fn present_token(
        &self,
        token: &AccessToken,
        input: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> io::Result<bool> {
        writeln!(out, "✅ Successfully obtained access token!\n")?;
        writeln!(out, "Token (first {TOKEN_PREVIEW_CHARS} chars): {}", token.preview())?;
        ExportFormats::for_token(token).print(out)?;

        let save = match self.save_mode {
            SaveMode::Always => true,
            SaveMode::Never => false,
            SaveMode::Prompt => confirm(
                input,
                out,
                &format!(
                    "\nDo you want to save this to {} file? (y/n): ",
                    self.env_file.display()
                ),
            )?,
        };
        if !save {
            return Ok(false);
        }

        match append_to_env_file(&self.env_file, token) {
            Ok(()) => {
                writeln!(out, "✅ Saved to {} file!", self.env_file.display())?;
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %self.env_file.display(), "Failed to append token");
                writeln!(out, "❌ Failed to write {}: {e}", self.env_file.display())?;
                Ok(false)
            }
        }
    }
}

fn print_status(out: &mut dyn Write, status: &CliStatus) -> io::Result<()> {
    match status {
        CliStatus::Ready { version } => {
            writeln!(out, "✅ Azure CLI is installed")?;
            writeln!(out, "{version}")?;
            writeln!(out, "✅ You are logged in to Azure\n")
        }
        CliStatus::NotLoggedIn { version } => {
            if let Some(version) = version {
                writeln!(out, "✅ Azure CLI is installed")?;
                writeln!(out, "{version}")?;
            }
            writeln!(out, "❌ Not logged in to Azure")?;
            writeln!(out, "Please run: az login")
        }
        CliStatus::NotInstalled => writeln!(out, "❌ Azure CLI not found"),
    }
}

fn print_token_error(out: &mut dyn Write, error: &TokenError) -> io::Result<()> {
    match error {
        TokenError::CliNotFound => {
            writeln!(out, "❌ Azure CLI not found!")?;
            writeln!(out, "\nPlease install Azure CLI:")?;
            writeln!(out, "{AZURE_CLI_INSTALL_URL}")
        }
        TokenError::CommandFailed { stderr, .. } => {
            writeln!(out, "❌ Error running Azure CLI command:")?;
            writeln!(out, "{stderr}")?;
            writeln!(out, "\nMake sure:")?;
            writeln!(out, "1. Azure CLI is installed ({AZURE_CLI_INSTALL_URL})")?;
            writeln!(out, "2. You are logged in (run: az login)")
        }
        TokenError::EmptyToken => writeln!(out, "❌ Azure CLI returned an empty token"),
        TokenError::Command(e) => {
            writeln!(out, "❌ Error running Azure CLI command:")?;
            writeln!(out, "{e}")
        }
    }
}

/// Static fallback when the Azure CLI route fails.
pub fn print_manual_instructions(out: &mut dyn Write) -> io::Result<()> {
    console::section(out, "Manual Access Token Setup")?;

    console::subsection(out, "Option 1: Using Azure Portal")?;
    console::steps(
        out,
        &[
            "Go to https://portal.azure.com",
            "Navigate to Azure Active Directory > App registrations",
            "Create a new app registration",
            "Go to API permissions > Add Microsoft Graph permissions",
            "Add required permissions (see TEAMS_MCP_SETUP.md)",
            "Go to Certificates & secrets > Create client secret",
            "Use client credentials to get token",
        ],
    )?;

    console::subsection(out, "Option 2: Using Graph Explorer")?;
    console::steps(
        out,
        &[
            "Go to https://developer.microsoft.com/graph/graph-explorer",
            "Sign in with your Microsoft account",
            "Click 'Access token' in the left panel",
            "Copy the token",
        ],
    )?;

    console::subsection(out, "Option 3: Using PowerShell")?;
    writeln!(out, "Install-Module -Name Microsoft.Graph -Scope CurrentUser")?;
    writeln!(out, "Connect-MgGraph -Scopes 'Chat.Read','Team.ReadBasic.All'")?;
    writeln!(out, "Get-MgContext | Select-Object -ExpandProperty Token")
}
