// External program invocation (Azure CLI, Python interpreter)

use crate::error::{CommandError, CommandResult};
use std::process::Stdio;
use tokio::process::Command;

/// Captured result of a finished program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn first_stdout_line(&self) -> &str {
        self.stdout.lines().next().unwrap_or("").trim_end()
    }

    /// Last non-blank stderr line; for Python this is the exception message.
    pub fn last_stderr_line(&self) -> &str {
        self.stderr
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or("")
            .trim()
    }
}

/// Runs a program to completion and captures its output.
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[&str]) -> CommandResult<CommandOutput>;
}

/// [`CommandRunner`] backed by real processes. Inherits the environment and
/// working directory; no timeout is applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait::async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[&str]) -> CommandResult<CommandOutput> {
        tracing::debug!(program, ?args, "Running command");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| match source.kind() {
                std::io::ErrorKind::NotFound => CommandError::NotFound {
                    program: program.to_string(),
                },
                _ => CommandError::Io {
                    program: program.to_string(),
                    source,
                },
            })?;

        tracing::debug!(program, status = %output.status, "Command finished");

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    pub(crate) enum Reply {
        Output(CommandOutput),
        NotFound,
    }

    pub(crate) fn ok(stdout: &str) -> Reply {
        Reply::Output(CommandOutput {
            success: true,
            code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        })
    }

    pub(crate) fn fail(code: i32, stderr: &str) -> Reply {
        Reply::Output(CommandOutput {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        })
    }

    /// Replies to command lines by prefix; unmatched lines exit 1.
    #[derive(Default)]
    pub(crate) struct ScriptedRunner {
        replies: Vec<(String, Reply)>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedRunner {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn on(mut self, prefix: &str, reply: Reply) -> Self {
            self.replies.push((prefix.to_string(), reply));
            self
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, program: &str, args: &[&str]) -> CommandResult<CommandOutput> {
            let line = std::iter::once(program)
                .chain(args.iter().copied())
                .collect::<Vec<_>>()
                .join(" ");
            self.calls.lock().unwrap().push(line.clone());

            match self
                .replies
                .iter()
                .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            {
                Some((_, Reply::Output(output))) => Ok(output.clone()),
                Some((_, Reply::NotFound)) => Err(CommandError::NotFound {
                    program: program.to_string(),
                }),
                None => Ok(CommandOutput {
                    success: false,
                    code: Some(1),
                    stdout: String::new(),
                    stderr: format!("no scripted reply for `{line}`"),
                }),
            }
        }
    }
}
