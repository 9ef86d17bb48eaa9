//! External command execution used by the AWS CLI provider.
//!
//! The provider never talks to the network itself; it shells out to the `aws`
//! binary. Keeping process spawning behind [`CommandRunner`] lets tests script
//! the CLI's JSON responses without touching a real account.

use std::ffi::OsString;
use std::process::Command;

use shell_escape::unix::escape;
use thiserror::Error;
use tracing::debug;

/// Result of running an external command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandOutput {
    /// Exit code reported by the process, if available.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns `true` when the exit code equals zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Renders the exit status for error messages.
    #[must_use]
    pub fn status_text(&self) -> String {
        self.code
            .map_or_else(|| String::from("unknown"), |code| code.to_string())
    }
}

/// Errors raised before a command produces any output.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RunnerError {
    /// Raised when a command cannot be spawned.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Command that failed to start.
        program: String,
        /// Operating system error string.
        message: String,
    },
}

/// Abstraction over command execution to support fakes in tests.
pub trait CommandRunner {
    /// Runs `program` with the given arguments, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Spawn`] if the command cannot be started.
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RunnerError>;
}

/// Real command runner that shells out to the host operating system.
#[derive(Clone, Debug, Default)]
pub struct ProcessCommandRunner {
    envs: Vec<(String, String)>,
}

impl ProcessCommandRunner {
    /// Creates a runner that inherits the parent environment unchanged.
    #[must_use]
    pub const fn new() -> Self {
        Self { envs: Vec::new() }
    }

    /// Adds an environment variable applied to every spawned command.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }
}

impl CommandRunner for ProcessCommandRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<CommandOutput, RunnerError> {
        debug!(command = %render_command(program, args), "running external command");
        let output = Command::new(program)
            .args(args)
            .envs(self.envs.iter().map(|(key, value)| (key, value)))
            .output()
            .map_err(|err| RunnerError::Spawn {
                program: program.to_owned(),
                message: err.to_string(),
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Renders a command line with each argument shell-escaped, for logs.
#[must_use]
pub fn render_command(program: &str, args: &[OsString]) -> String {
    let mut rendered = String::from(escape(program.into()));
    for arg in args {
        let text = arg.to_string_lossy();
        rendered.push(' ');
        rendered.push_str(escape(text).as_ref());
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some(0), true)]
    #[case(Some(255), false)]
    #[case(None, false)]
    fn is_success_requires_zero_exit(#[case] code: Option<i32>, #[case] expected: bool) {
        let output = CommandOutput {
            code,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(output.is_success(), expected);
    }

    #[rstest]
    fn status_text_reports_unknown_without_code() {
        let output = CommandOutput {
            code: None,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(output.status_text(), "unknown");
    }

    #[rstest]
    fn render_command_escapes_arguments() {
        let args = [
            OsString::from("ec2"),
            OsString::from("create-snapshot"),
            OsString::from("--description"),
            OsString::from("web 1"),
        ];
        assert_eq!(
            render_command("aws", &args),
            "aws ec2 create-snapshot --description 'web 1'"
        );
    }

    #[rstest]
    fn process_runner_reports_spawn_failures() {
        let runner = ProcessCommandRunner::new().with_env("AWS_PAGER", "");
        let err = runner
            .run("/nonexistent/snapwarden-test-binary", &[])
            .expect_err("missing binary should fail to spawn");
        assert!(matches!(err, RunnerError::Spawn { ref program, .. } if program.ends_with("snapwarden-test-binary")));
    }
}
