//! Captcha solver running an external command.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use railpilot_core::error::PortError;
use railpilot_core::ports::CaptchaSolver;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Maximum time a single solve may take.
const SOLVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs `program args... <image_ref>` and reads the answer from stdout.
#[derive(Debug, Clone)]
pub struct CommandSolver {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSolver {
    /// Build from a whitespace-separated command line.
    pub fn from_command_line(command_line: &str) -> Result<Self, PortError> {
        let mut words = command_line.split_whitespace().map(str::to_string);
        let Some(program) = words.next() else {
            return Err(PortError::invalid_input("Captcha solver command is empty"));
        };
        Ok(Self {
            program,
            args: words.collect(),
            timeout: SOLVE_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl CaptchaSolver for CommandSolver {
    async fn solve(&self, image_ref: &str) -> Result<String, PortError> {
        debug!("Running {} on a {} byte image reference", self.program, image_ref.len());
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(image_ref)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                PortError::solver_failed_with_stderr(
                    format!("Solver did not answer within {:?}", self.timeout),
                    None,
                )
            })?
            .map_err(|e| {
                PortError::solver_failed_with_stderr(
                    format!("Failed to run '{}': {}", self.program, e),
                    None,
                )
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(PortError::solver_failed_with_stderr(
                format!("Solver exited with {}", output.status),
                Some(&stderr),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        // Libraries may log before the answer; the answer is the last line.
        stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                PortError::solver_failed_with_stderr("Solver printed no answer", Some(&stderr))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use railpilot_core::error::PortErrorCode;

    #[test]
    fn test_command_line_splits_program_and_args() {
        let solver = CommandSolver::from_command_line("python3  irctc-captcha-solver/app.py").unwrap();
        assert_eq!(solver.program, "python3");
        assert_eq!(solver.args, vec!["irctc-captcha-solver/app.py"]);
    }

    #[test]
    fn test_empty_command_is_rejected() {
        let err = CommandSolver::from_command_line("   ").unwrap_err();
        assert_eq!(err.code, PortErrorCode::InvalidInput);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_answer_is_last_stdout_line() {
        let solver = CommandSolver::from_command_line("echo").unwrap();
        let answer = solver.solve("data:image/jpg;base64,AAAA").await.unwrap();
        assert_eq!(answer, "data:image/jpg;base64,AAAA");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_command_is_retryable() {
        let solver = CommandSolver::from_command_line("false").unwrap();
        let err = solver.solve("img").await.unwrap_err();
        assert_eq!(err.code, PortErrorCode::SolverFailed);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_program_reports_name() {
        let solver = CommandSolver::from_command_line("railpilot-no-such-solver").unwrap();
        let err = solver.solve("img").await.unwrap_err();
        assert!(err.message.contains("railpilot-no-such-solver"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_solver_times_out() {
        let solver = CommandSolver::from_command_line("sleep")
            .unwrap()
            .with_timeout(Duration::from_millis(50));
        let err = solver.solve("5").await.unwrap_err();
        assert!(err.message.contains("did not answer"));
    }
}
