// src/recipe/exec.rs

//! Shell command execution for recipe steps
//!
//! Every recipe line is handed to the platform shell as-is, so pipes,
//! redirection and `&&` chains work the way the recipe author wrote them.
//! The working directory is always passed explicitly; the process's own
//! current directory is never changed.

use crate::error::{Error, Result};
use std::path::Path;
use std::process::Command;
use tracing::{debug, info, warn};

/// Captured result of a command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Which failures are tolerated, and how often a failing command is retried
///
/// The default tolerates nothing: any non-zero exit aborts the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailurePolicy {
    /// Exit codes treated as success with empty output
    pub ignored_exit_codes: Vec<i32>,
    /// Extra attempts after the first failure
    pub retries: u32,
}

impl FailurePolicy {
    fn ignores(&self, code: Option<i32>) -> bool {
        code.is_some_and(|c| self.ignored_exit_codes.contains(&c))
    }
}

/// Something that can run a shell command line
///
/// The bake driver only talks to this trait, which keeps it testable
/// without spawning real toolchains.
pub trait Executor {
    /// Run `command` in `working_dir`, or the current directory when `None`
    fn run(&self, command: &str, working_dir: Option<&Path>) -> Result<CommandOutput>;
}

/// Runs commands through `sh -c` (or `cmd /C` on Windows)
#[derive(Debug, Clone, Default)]
pub struct ShellExecutor {
    policy: FailurePolicy,
}

impl ShellExecutor {
    pub fn new(policy: FailurePolicy) -> Self {
        Self { policy }
    }

    fn shell_command(command: &str) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(command);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        }
    }

    fn run_once(&self, command: &str, working_dir: Option<&Path>) -> Result<CommandOutput> {
        let mut cmd = Self::shell_command(command);
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().map_err(|e| Error::CommandSpawn {
            command: command.to_string(),
            source: e,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if output.status.success() {
            return Ok(CommandOutput { stdout, stderr });
        }

        let code = output.status.code();
        if self.policy.ignores(code) {
            warn!("Ignoring exit code {:?} from: {}", code, command);
            return Ok(CommandOutput::default());
        }

        Err(Error::CommandFailed {
            command: command.to_string(),
            code,
            stderr,
        })
    }
}

impl Executor for ShellExecutor {
    fn run(&self, command: &str, working_dir: Option<&Path>) -> Result<CommandOutput> {
        println!("Running: {}", command);
        if let Some(dir) = working_dir {
            debug!("in {}", dir.display());
        }

        let mut attempt = 0;
        let output = loop {
            match self.run_once(command, working_dir) {
                Ok(output) => break output,
                Err(Error::CommandFailed { code, .. }) if attempt < self.policy.retries => {
                    attempt += 1;
                    info!(
                        "Command exited with {:?}, retrying ({}/{})",
                        code, attempt, self.policy.retries
                    );
                }
                // stderr is part of the error message
                Err(e) => return Err(e),
            }
        };

        if !output.stdout.is_empty() {
            print!("{}", output.stdout);
        }
        if !output.stderr.is_empty() {
            print!("{}", output.stderr);
        }
        println!();

        Ok(output)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_run_captures_output() {
        let exec = ShellExecutor::default();
        let out = exec.run("echo hello && echo oops 1>&2", None).unwrap();
        assert_eq!(out.stdout, "hello\n");
        assert_eq!(out.stderr, "oops\n");
    }

    #[test]
    fn test_run_in_working_dir() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("marker.txt"), "x").unwrap();

        let exec = ShellExecutor::default();
        let out = exec.run("ls", Some(temp.path())).unwrap();
        assert!(out.stdout.contains("marker.txt"));
    }

    #[test]
    fn test_nonzero_exit_is_fatal() {
        let exec = ShellExecutor::default();
        let err = exec.run("echo bad 1>&2; exit 3", None).unwrap_err();
        match err {
            Error::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "bad\n");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_failure_message_carries_stderr_once() {
        let exec = ShellExecutor::default();
        let err = exec.run("echo compiler exploded 1>&2; exit 2", None).unwrap_err();
        let message = err.to_string();
        assert_eq!(message.matches("compiler exploded").count(), 1);
        assert!(message.contains("exit code Some(2)"));
    }

    #[test]
    fn test_ignored_exit_code_is_success() {
        let exec = ShellExecutor::new(FailurePolicy {
            ignored_exit_codes: vec![57],
            retries: 0,
        });
        let out = exec.run("echo partial; exit 57", None).unwrap();
        assert_eq!(out, CommandOutput::default());

        assert!(exec.run("exit 56", None).is_err());
    }

    #[test]
    fn test_retry_until_success() {
        let temp = tempfile::tempdir().unwrap();
        let exec = ShellExecutor::new(FailurePolicy {
            ignored_exit_codes: Vec::new(),
            retries: 2,
        });

        // Fails on the first attempt, succeeds once the counter file exists
        let out = exec
            .run("if [ -f count ]; then echo ok; else touch count; exit 1; fi", Some(temp.path()))
            .unwrap();
        assert_eq!(out.stdout, "ok\n");
    }

    #[test]
    fn test_missing_working_dir_is_spawn_error() {
        let exec = ShellExecutor::default();
        let err = exec
            .run("true", Some(Path::new("/nonexistent/mkvfx/dir")))
            .unwrap_err();
        assert!(matches!(err, Error::CommandSpawn { .. }));
    }
}
