//! Production [`CommandRunner`] backed by `tokio::process`.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error};

use crate::contract::{CommandOutput, CommandRunner, GitCommand};
use crate::error::SyncError;

/// Spawns the configured git executable and captures its output.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    program: String,
}

impl SystemRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_GIT_PROGRAM)
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, command: GitCommand) -> Result<CommandOutput, SyncError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&command.args);
        // Never block on a credential prompt.
        cmd.env("GIT_TERMINAL_PROMPT", "0");

        debug!(program = %self.program, args = ?command.args, "Spawning command");
        let output = cmd.output().await.map_err(|e| {
            error!(error = ?e, program = %self.program, "Failed to launch git process");
            SyncError::CommandLaunch {
                command: command.to_string(),
                source: e,
            }
        })?;

        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
