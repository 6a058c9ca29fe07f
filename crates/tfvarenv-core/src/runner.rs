//! Provisioning tool abstraction

use crate::error::{CoreError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

/// Runs the external provisioning tool.
///
/// A non-zero exit is reported through [`ExecutionResult::success`];
/// `Err` is reserved for failures to launch the tool at all.
#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn init(&self, options: &RunOptions) -> Result<ExecutionResult>;
    async fn plan(&self, options: &RunOptions) -> Result<ExecutionResult>;
    async fn apply(&self, options: &RunOptions) -> Result<ExecutionResult>;
    async fn destroy(&self, options: &RunOptions) -> Result<ExecutionResult>;
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub working_dir: PathBuf,
    pub var_file: Option<PathBuf>,
    pub backend_config: Option<PathBuf>,
    pub auto_approve: bool,
    pub reconfigure: bool,
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub command_line: String,
    /// Stopped by Ctrl-C rather than finishing on its own
    pub interrupted: bool,
}

impl ExecutionResult {
    /// Converts a failed run into [`CoreError::ExternalTool`].
    pub fn ensure_success(self) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(self.to_error())
        }
    }

    pub fn to_error(&self) -> CoreError {
        CoreError::ExternalTool {
            command: self.command_line.clone(),
            exit_code: self.exit_code,
            stderr: self.error_text(),
        }
    }

    /// Captured stderr, or a placeholder when the tool wrote nothing
    pub fn error_text(&self) -> String {
        let stderr = self.stderr.trim();
        if self.interrupted {
            return match stderr {
                "" => "interrupted by user".to_string(),
                _ => format!("interrupted by user: {}", stderr),
            };
        }
        if stderr.is_empty() {
            format!("exit code {}", self.exit_code)
        } else {
            stderr.to_string()
        }
    }
}
