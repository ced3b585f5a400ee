//! Running independent external commands concurrently.
//!
//! Only for throughput: no state is shared between commands and results are
//! returned once every command has finished.

use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, error};

use crate::errors::MonoflowError;

/// An external command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Label identifying the command in outcomes and logs.
    pub label: String,
    /// Program to execute.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
    /// Working directory, if not the current one.
    pub current_dir: Option<PathBuf>,
}

impl CommandSpec {
    /// Creates a command without arguments.
    #[must_use]
    pub fn new(label: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    /// Appends arguments.
    #[must_use]
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }
}

/// What a finished command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Label of the command.
    pub label: String,
    /// Exit code; `None` when terminated by a signal.
    pub status_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutcome {
    /// Returns true if the command exited with code 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.status_code == Some(0)
    }
}

async fn run_command(spec: CommandSpec) -> Result<CommandOutcome, String> {
    let mut command = Command::new(&spec.program);
    command.args(&spec.args);
    if let Some(dir) = &spec.current_dir {
        command.current_dir(dir);
    }
    let output = command
        .output()
        .await
        .map_err(|e| format!("{}: failed to run {}: {e}", spec.label, spec.program))?;
    Ok(CommandOutcome {
        label: spec.label,
        status_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Runs `commands` with at most `workers` at a time.
///
/// Outcomes are returned in input order. Non-zero exit codes are ordinary
/// outcomes; a command that cannot be started or a worker that panics fails
/// the whole batch, after every other command has finished.
pub async fn run_in_parallel(
    commands: Vec<CommandSpec>,
    workers: usize,
) -> Result<Vec<CommandOutcome>, MonoflowError> {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let handles = commands.into_iter().map(|spec| {
        let semaphore = Arc::clone(&semaphore);
        tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| e.to_string())?;
            debug!(label = %spec.label, program = %spec.program, "Running command");
            run_command(spec).await
        })
    });

    let mut outcomes = Vec::new();
    let mut failures = Vec::new();
    for joined in join_all(handles).await {
        match joined {
            Ok(Ok(outcome)) => outcomes.push(outcome),
            Ok(Err(message)) => failures.push(message),
            Err(join_error) => failures.push(format!("worker failed: {join_error}")),
        }
    }

    if failures.is_empty() {
        Ok(outcomes)
    } else {
        for failure in &failures {
            error!(error = %failure, "Parallel command failed");
        }
        Err(MonoflowError::Parallel(failures.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collects_all_outcomes_in_order() {
        let commands = vec![
            CommandSpec::new("first", "sh").args(["-c", "echo one"]),
            CommandSpec::new("second", "sh").args(["-c", "echo two >&2; exit 3"]),
            CommandSpec::new("third", "sh").args(["-c", "echo three"]),
        ];

        let outcomes = run_in_parallel(commands, 2).await.unwrap();

        let labels: Vec<_> = outcomes.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["first", "second", "third"]);
        assert_eq!(outcomes[0].stdout.trim(), "one");
        assert!(outcomes[0].success());
        assert_eq!(outcomes[1].status_code, Some(3));
        assert_eq!(outcomes[1].stderr.trim(), "two");
    }

    #[tokio::test]
    async fn test_unstartable_command_fails_batch() {
        let commands = vec![
            CommandSpec::new("ok", "sh").args(["-c", "true"]),
            CommandSpec::new("missing", "definitely-not-a-real-program-xyz"),
        ];

        let err = run_in_parallel(commands, 4).await.unwrap_err();

        assert!(matches!(err, MonoflowError::Parallel(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        assert!(run_in_parallel(Vec::new(), 0).await.unwrap().is_empty());
    }
}
