//! External process execution.
//!
//! Every tool the run shells out to goes through [`CommandRunner`], so the
//! orchestration can be exercised without real binaries.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::credentials::CredentialContext;
use crate::error::{BackupError, BackupResult};

/// One external command: program, arguments and variables to strip from its environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub env_remove: Vec<String>,
    secret_args: Vec<usize>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env_remove: Vec::new(),
            secret_args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Argument that must never show up in logs.
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.secret_args.push(self.args.len());
        self.args.push(arg.into());
        self
    }

    /// Strip the run's credential variables from the child environment.
    pub fn with_credentials(mut self, ctx: &CredentialContext) -> Self {
        self.env_remove.extend(ctx.cleared_env().iter().cloned());
        self
    }

    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for (i, arg) in self.args.iter().enumerate() {
            if self.secret_args.contains(&i) {
                f.write_str(" ***")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Execute an invocation and check its exit status.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs to completion. A non-zero exit is a [`BackupError::Process`].
    async fn run(&self, step: &'static str, invocation: &Invocation) -> BackupResult<()>;
}

/// Spawns real processes. stdout/stderr are inherited so the tool's own
/// diagnostics reach the operator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, step: &'static str, invocation: &Invocation) -> BackupResult<()> {
        debug!(step, command = %invocation, "spawning");

        let mut cmd = tokio::process::Command::new(&invocation.program);
        cmd.args(&invocation.args);
        for var in &invocation.env_remove {
            cmd.env_remove(var);
        }

        let status = cmd.status().await.map_err(|source| BackupError::Spawn {
            step,
            program: invocation.program_name(),
            source,
        })?;

        if !status.success() {
            return Err(BackupError::Process {
                step,
                program: invocation.program_name(),
                code: status.code(),
            });
        }
        Ok(())
    }
}
