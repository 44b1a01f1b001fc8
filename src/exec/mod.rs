//! Subprocess execution seam.
//!
//! Everything that shells out (`git`, `tmux`, `gh`) goes through the
//! [`CommandExecutor`] trait so tests can substitute canned outputs without
//! touching the host system.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::SobaError;

#[derive(Debug, Clone)]
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

/// A single subprocess invocation: program, arguments, optional working
/// directory, optional timeout.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            cwd: None,
            timeout: None,
        }
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Rendering used in logs and error context.
    pub fn display(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
    }
}

#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, spec: CommandSpec) -> Result<CommandOutput, SobaError>;
}

/// Real implementation backed by `tokio::process::Command`.
pub struct ProcessCommandExecutor;

#[async_trait]
impl CommandExecutor for ProcessCommandExecutor {
    async fn execute(&self, spec: CommandSpec) -> Result<CommandOutput, SobaError> {
        let mut command = tokio::process::Command::new(&spec.program);
        command.args(&spec.args);
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        let fut = command.output();
        let output = match spec.timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                SobaError::transient("command timed out")
                    .with_context("command", spec.display())
                    .with_context("timeout_secs", limit.as_secs())
            })?,
            None => fut.await,
        };

        let output = output.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SobaError::external("command not found").with_context("command", &spec.program)
            } else {
                SobaError::external(e.to_string()).with_context("command", spec.display())
            }
        })?;

        Ok(CommandOutput {
            status_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Run a spec and fail with `External` unless it exits zero.
pub async fn run_checked(
    executor: &dyn CommandExecutor,
    spec: CommandSpec,
) -> Result<CommandOutput, SobaError> {
    let display = spec.display();
    let output = executor.execute(spec).await?;
    if !output.success() {
        return Err(SobaError::external("command exited non-zero")
            .with_context("command", display)
            .with_context("status", output.status_code)
            .with_context("stderr", output.stderr.trim()));
    }
    Ok(output)
}

pub mod mock {
    //! Hand-rolled mock executor for tests: canned responses keyed by the
    //! rendered command line, with a recorded call log.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct MockCommandExecutor {
        responses: Mutex<HashMap<String, CommandOutput>>,
        failures: Mutex<HashMap<String, String>>,
        pub calls: Mutex<Vec<String>>,
        default_ok: bool,
    }

    impl MockCommandExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Unmatched commands succeed with empty output instead of failing.
        pub fn permissive() -> Self {
            Self {
                default_ok: true,
                ..Self::default()
            }
        }

        pub fn on(self, command_line: &str, stdout: &str) -> Self {
            self.responses.lock().unwrap().insert(
                command_line.to_string(),
                CommandOutput {
                    status_code: 0,
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                },
            );
            self
        }

        pub fn failing(self, command_line: &str, stderr: &str) -> Self {
            self.responses.lock().unwrap().insert(
                command_line.to_string(),
                CommandOutput {
                    status_code: 1,
                    stdout: String::new(),
                    stderr: stderr.to_string(),
                },
            );
            self
        }

        pub fn erroring(self, command_line: &str, message: &str) -> Self {
            self.failures
                .lock()
                .unwrap()
                .insert(command_line.to_string(), message.to_string());
            self
        }

        pub fn call_log(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        /// Non-consuming variant of [`Self::on`] for already-shared mocks.
        pub fn stub(&self, command_line: &str, stdout: &str) {
            self.responses.lock().unwrap().insert(
                command_line.to_string(),
                CommandOutput {
                    status_code: 0,
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                },
            );
        }

        /// Non-consuming variant of [`Self::failing`].
        pub fn stub_fail(&self, command_line: &str, stderr: &str) {
            self.responses.lock().unwrap().insert(
                command_line.to_string(),
                CommandOutput {
                    status_code: 1,
                    stdout: String::new(),
                    stderr: stderr.to_string(),
                },
            );
        }
    }

    #[async_trait]
    impl CommandExecutor for MockCommandExecutor {
        async fn execute(&self, spec: CommandSpec) -> Result<CommandOutput, SobaError> {
            let key = spec.display();
            self.calls.lock().unwrap().push(key.clone());

            if let Some(message) = self.failures.lock().unwrap().get(&key) {
                return Err(SobaError::external(message.clone()).with_context("command", key));
            }
            if let Some(output) = self.responses.lock().unwrap().get(&key) {
                return Ok(output.clone());
            }
            if self.default_ok {
                return Ok(CommandOutput {
                    status_code: 0,
                    stdout: String::new(),
                    stderr: String::new(),
                });
            }
            Err(SobaError::internal("unexpected command in test").with_context("command", key))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockCommandExecutor;
    use super::*;

    #[tokio::test]
    async fn process_executor_captures_stdout() {
        let executor = ProcessCommandExecutor;
        let output = executor
            .execute(CommandSpec::new("echo", &["hello"]))
            .await
            .unwrap();
        assert!(output.success());
        assert!(output.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn process_executor_maps_missing_binary() {
        let executor = ProcessCommandExecutor;
        let err = executor
            .execute(CommandSpec::new("soba-no-such-binary-xyz", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, SobaError::External { .. }));
    }

    #[tokio::test]
    async fn run_checked_surfaces_nonzero_exit() {
        let mock = MockCommandExecutor::new().failing("git fetch", "fatal: no remote");
        let err = run_checked(&mock, CommandSpec::new("git", &["fetch"]))
            .await
            .unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("fatal: no remote"));
    }

    #[tokio::test]
    async fn mock_records_calls() {
        let mock = MockCommandExecutor::permissive();
        mock.execute(CommandSpec::new("tmux", &["has-session", "-t", "soba"]))
            .await
            .unwrap();
        assert_eq!(mock.call_log(), vec!["tmux has-session -t soba"]);
    }
}
