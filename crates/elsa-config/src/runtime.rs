//! External command execution.
//!
//! Secret store providers talk to the operator's own tooling (`aws`,
//! `gcloud`, `security`, `pass`) instead of linking cloud SDKs. They do so
//! through [`CommandRunner`] so that tests can substitute canned output.

use async_trait::async_trait;
use std::process::Stdio;
use thiserror::Error;
use tracing::debug;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("'{0}' was not found on the PATH")]
    BinaryNotFound(String),

    #[error("I/O error running '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with code {code}: {message}")]
    ProcessFailed {
        program: String,
        code: i32,
        message: String,
    },
}

/// Output from a command execution
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code (0 = success)
    pub code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    /// A successful run that printed `stdout`.
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            code: 0,
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    /// A failed run that printed `stderr`.
    pub fn failed(code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            code,
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Get stdout as a string (lossy UTF-8 conversion)
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Get stderr as a string (lossy UTF-8 conversion)
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` and capture its output. A non-zero exit is
    /// not an error at this level.
    async fn run(&self, program: &str, args: &[String]) -> RuntimeResult<CommandOutput>;

    /// Run and turn a non-zero exit into [`RuntimeError::ProcessFailed`].
    async fn run_checked(&self, program: &str, args: &[String]) -> RuntimeResult<CommandOutput> {
        let output = self.run(program, args).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(RuntimeError::ProcessFailed {
                program: program.to_string(),
                code: output.code,
                message: output.stderr_string().trim().to_string(),
            })
        }
    }
}

/// Runs real processes, resolving the program with `which`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCommandRunner;

#[async_trait]
impl CommandRunner for NativeCommandRunner {
    async fn run(&self, program: &str, args: &[String]) -> RuntimeResult<CommandOutput> {
        let binary =
            which::which(program).map_err(|_| RuntimeError::BinaryNotFound(program.to_string()))?;
        debug!(program, binary = %binary.display(), ?args, "running external command");

        let output = tokio::process::Command::new(&binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| RuntimeError::Io {
                program: program.to_string(),
                source,
            })?;

        Ok(CommandOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(CommandOutput);

    #[async_trait]
    impl CommandRunner for Fixed {
        async fn run(&self, _program: &str, _args: &[String]) -> RuntimeResult<CommandOutput> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_run_checked_reports_stderr() {
        let runner = Fixed(CommandOutput::failed(254, "  AccessDenied\n"));
        let err = pollster::block_on(runner.run_checked("aws", &[])).unwrap_err();
        assert_eq!(err.to_string(), "'aws' exited with code 254: AccessDenied");
    }

    #[test]
    fn test_run_checked_passes_success_through() {
        let runner = Fixed(CommandOutput::ok("hello\n"));
        let output = pollster::block_on(runner.run_checked("echo", &[])).unwrap();
        assert_eq!(output.stdout_string(), "hello\n");
    }

    #[tokio::test]
    async fn test_native_runner_missing_binary() {
        let err = NativeCommandRunner
            .run("definitely-not-a-real-binary-elsa", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::BinaryNotFound(_)));
    }
}
