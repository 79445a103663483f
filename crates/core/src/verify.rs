//! Local setup verification for the Teams MCP server project.
//!
//! Three independent groups of checks: expected files, importable Python
//! packages and an importable server module. Each check is reported on its
//! own line and never aborts the others.

use crate::command::CommandRunner;
use crate::config::{ExpectedFile, ExpectedPackage, ServerConfig, VerifyConfig};
use crate::console;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCheck {
    pub path: PathBuf,
    pub description: String,
    pub exists: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageCheck {
    pub name: String,
    pub description: String,
    pub installed: bool,
    /// Why the import failed, when it did.
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCheck {
    Loaded { name: Option<String> },
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub files: Vec<FileCheck>,
    pub packages: Vec<PackageCheck>,
    pub server: ServerCheck,
}

impl VerifyReport {
    pub fn files_ok(&self) -> bool {
        self.files.iter().all(|f| f.exists)
    }

    pub fn packages_ok(&self) -> bool {
        self.packages.iter().all(|p| p.installed)
    }

    pub fn server_ok(&self) -> bool {
        matches!(self.server, ServerCheck::Loaded { .. })
    }

    pub fn all_ok(&self) -> bool {
        self.files_ok() && self.packages_ok() && self.server_ok()
    }
}

/// `true` for dotted Python identifiers such as `app.server`.
fn is_python_dotted_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
                && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        })
}

/// Check each expected file relative to `root`.
pub fn check_files(
    root: &Path,
    files: &[ExpectedFile],
    out: &mut dyn Write,
) -> io::Result<Vec<FileCheck>> {
    writeln!(out, "\nChecking required files...")?;

    let mut checks = Vec::with_capacity(files.len());
    for file in files {
        let exists = root.join(&file.path).exists();
        if exists {
            writeln!(out, "✅ {}: {}", file.description, file.path.display())?;
        } else {
            writeln!(out, "❌ {} not found: {}", file.description, file.path.display())?;
        }
        checks.push(FileCheck {
            path: file.path.clone(),
            description: file.description.clone(),
            exists,
        });
    }
    Ok(checks)
}

/// Probe each package with `<python> -c "import <name>"`.
pub async fn check_packages(
    runner: &dyn CommandRunner,
    python: &str,
    packages: &[ExpectedPackage],
    out: &mut dyn Write,
) -> io::Result<Vec<PackageCheck>> {
    writeln!(out, "\nChecking Python packages...")?;

    let mut checks = Vec::with_capacity(packages.len());
    for package in packages {
        let failure = if !is_python_dotted_name(&package.name) {
            Some("invalid package name".to_string())
        } else {
            let script = format!("import {}", package.name);
            match runner.run(python, &["-c", script.as_str()]).await {
                Ok(output) if output.success => None,
                Ok(output) => Some(output.last_stderr_line().to_string()),
                Err(e) => Some(e.to_string()),
            }
        };

        match &failure {
            None => writeln!(out, "✅ {} ({})", package.description, package.name)?,
            Some(reason) => {
                tracing::debug!(package = %package.name, %reason, "Import failed");
                writeln!(out, "❌ {} ({}) - NOT INSTALLED", package.description, package.name)?
            }
        }

        checks.push(PackageCheck {
            name: package.name.clone(),
            description: package.description.clone(),
            installed: failure.is_none(),
            detail: failure,
        });
    }
    Ok(checks)
}

/// Prefix of the stdout line carrying the server name. Importing the module
/// may print its own output first.
const SERVER_NAME_MARKER: &str = "teams-mcp-server-name:";

/// Python snippet that imports the server object from `root` and prints its
/// `name` after [`SERVER_NAME_MARKER`] (empty if it has none).
fn server_probe(root: &Path, module: &str, attribute: &str) -> String {
    // A JSON string literal is also a valid Python string literal.
    let root = serde_json::Value::String(root.to_string_lossy().into_owned()).to_string();
    format!(
        "import sys\nsys.path.insert(0, {root})\nfrom {module} import {attribute}\nprint('{SERVER_NAME_MARKER}' + str(getattr({attribute}, 'name', '') or ''))"
    )
}

fn parse_server_name(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .rev()
        .find_map(|line| line.strip_prefix(SERVER_NAME_MARKER))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Import the server module in a child interpreter and read its name.
pub async fn check_server(
    runner: &dyn CommandRunner,
    python: &str,
    root: &Path,
    server: &ServerConfig,
    out: &mut dyn Write,
) -> io::Result<ServerCheck> {
    writeln!(out, "\nChecking server structure...")?;

    let valid_target = is_python_dotted_name(&server.module)
        && is_python_dotted_name(&server.attribute)
        && !server.attribute.contains('.');

    let check = if !valid_target {
        ServerCheck::Failed {
            reason: format!("invalid server target {}:{}", server.module, server.attribute),
        }
    } else {
        let script = server_probe(root, &server.module, &server.attribute);
        match runner.run(python, &["-c", script.as_str()]).await {
            Ok(output) if output.success => ServerCheck::Loaded {
                name: parse_server_name(&output.stdout),
            },
            Ok(output) => ServerCheck::Failed {
                reason: output.last_stderr_line().to_string(),
            },
            Err(e) => ServerCheck::Failed {
                reason: e.to_string(),
            },
        }
    };

    match &check {
        ServerCheck::Loaded { name } => {
            writeln!(out, "✅ Server module loaded successfully")?;
            if let Some(name) = name {
                writeln!(out, "✅ MCP Server name: {name}")?;
            }
        }
        ServerCheck::Failed { reason } => {
            writeln!(out, "❌ Error loading server module: {reason}")?;
        }
    }
    Ok(check)
}

/// Runs all checks against a project directory and prints the summary.
pub struct SetupVerifier<'a> {
    runner: &'a dyn CommandRunner,
    root: PathBuf,
    verify: &'a VerifyConfig,
    server: &'a ServerConfig,
}

impl<'a> SetupVerifier<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        root: impl Into<PathBuf>,
        verify: &'a VerifyConfig,
        server: &'a ServerConfig,
    ) -> Self {
        Self {
            runner,
            root: root.into(),
            verify,
            server,
        }
    }

    pub async fn run(&self, out: &mut dyn Write) -> io::Result<VerifyReport> {
        console::banner(out, "Microsoft Teams MCP Server - Configuration Verification")?;

        let files = check_files(&self.root, &self.verify.files, out)?;
        let packages =
            check_packages(self.runner, &self.verify.python, &self.verify.packages, out).await?;
        let server =
            check_server(self.runner, &self.verify.python, &self.root, self.server, out).await?;

        let report = VerifyReport {
            files,
            packages,
            server,
        };
        print_summary(out, &report)?;
        Ok(report)
    }
}

fn print_summary(out: &mut dyn Write, report: &VerifyReport) -> io::Result<()> {
    console::section(out, "Verification Summary:")?;

    if report.all_ok() {
        writeln!(out, "✅ All checks passed!")?;
        writeln!(out, "\nNext steps:")?;
        console::steps(
            out,
            &[
                "Get an access token (run: get-token)",
                "Set TEAMS_ACCESS_TOKEN environment variable",
                "Test the server (run: test-teams-mcp)",
                "Start the server (run: python main.py)",
            ],
        )?;
    } else {
        writeln!(out, "❌ Some checks failed!")?;
        if !report.files_ok() {
            writeln!(out, "   - Missing required files")?;
        }
        if !report.packages_ok() {
            writeln!(
                out,
                "   - Missing required packages (run: pip install -r requirements.txt)"
            )?;
        }
        if !report.server_ok() {
            writeln!(out, "   - Server configuration issue")?;
        }
    }

    console::rule(out, '=')
}
