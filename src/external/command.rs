//! Base command execution abstraction
//!
//! Provides the foundational trait for executing external commands, enabling
//! dependency injection for testing.

use std::path::Path;
use std::process::{Command, Stdio};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status_code == 0
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Command not found: {command}")]
    CommandNotFound { command: String },
    #[error("Command terminated by signal: {command}")]
    Terminated { command: String },
    #[error("IO error: {message}")]
    Io { message: String },
}

/// Trait for executing external commands
///
/// This abstraction allows the rest of the codebase to execute commands
/// without directly depending on std::process::Command, enabling testing
/// with mock implementations.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait CommandExecutor: Send + Sync {
    fn execute(&self, program: &str, args: &[String], cwd: &Path)
        -> Result<CommandOutput, CommandError>;
}

/// Real implementation using std::process::Command
///
/// With `interactive` set the child shares this process's terminal, so tools
/// that open an editor or prompt keep working; captured output is then empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessCommandExecutor {
    interactive: bool,
}

impl ProcessCommandExecutor {
    pub fn captured() -> Self {
        Self { interactive: false }
    }

    pub fn interactive() -> Self {
        Self { interactive: true }
    }
}

impl CommandExecutor for ProcessCommandExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandOutput, CommandError> {
        let mut command = Command::new(program);
        command.args(args).current_dir(cwd);

        let map_spawn_error = |e: std::io::Error| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CommandError::CommandNotFound {
                    command: program.to_string(),
                }
            } else {
                CommandError::Io {
                    message: e.to_string(),
                }
            }
        };

        if self.interactive {
            let status = command
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .map_err(map_spawn_error)?;
            let status_code = status.code().ok_or_else(|| CommandError::Terminated {
                command: program.to_string(),
            })?;
            return Ok(CommandOutput {
                status_code,
                stdout: String::new(),
                stderr: String::new(),
            });
        }

        let output = command.output().map_err(map_spawn_error)?;
        let status_code = output.status.code().ok_or_else(|| CommandError::Terminated {
            command: program.to_string(),
        })?;

        Ok(CommandOutput {
            status_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
