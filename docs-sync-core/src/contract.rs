#![allow(unused)]

//! # contract: seam between the pipeline and external processes
//!
//! The pipeline never spawns processes directly. Every git invocation is described
//! as a [`GitCommand`] and handed to a [`CommandRunner`], which returns a structured
//! [`CommandOutput`] (exit code plus captured stdout/stderr). The pipeline then
//! branches on that result instead of on inherited process I/O.
//!
//! ## Implementations
//! - [`crate::runner::SystemRunner`] spawns the real executable via tokio.
//! - `MockCommandRunner` is generated by `mockall` for tests; enabled under `cfg(test)`
//!   and through the default `test-export-mocks` feature so integration tests can use it.

use std::fmt;

use async_trait::async_trait;
use mockall::{automock, predicate::*};

use crate::error::SyncError;

/// A single invocation of the version-control executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommand {
    /// Arguments after the program name, e.g. `["clone", "--depth", "1", ...]`.
    pub args: Vec<String>,
}

impl GitCommand {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// First argument, i.e. the git subcommand (`clone`, `checkout`, ...).
    /// Skips a leading `-C <dir>` pair.
    pub fn subcommand(&self) -> Option<&str> {
        let mut args = self.args.iter();
        while let Some(arg) = args.next() {
            if arg == "-C" {
                args.next();
                continue;
            }
            return Some(arg.as_str());
        }
        None
    }
}

impl fmt::Display for GitCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "git {}", self.args.join(" "))
    }
}

/// Structured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `-1` when the process was terminated by a signal.
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 0
    }
}

/// Runs version-control commands to completion.
///
/// Implementations must block (await) until the process exits and must only
/// return `Err` when the process could not be started; a non-zero exit is an
/// `Ok(CommandOutput)` the caller inspects.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: GitCommand) -> Result<CommandOutput, SyncError>;
}
