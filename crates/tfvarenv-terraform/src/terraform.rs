//! terraform CLI wrapper
//!
//! Output is echoed to the terminal as it arrives, partial lines included,
//! so terraform's own prompts stay visible while it reads the inherited
//! stdin.
//!
//! Ctrl-C reaches terraform through the terminal's process group. While a
//! child is running the runner waits for it to stop on its own (up to
//! [`INTERRUPT_GRACE`], or until a second Ctrl-C) and reports the run as
//! interrupted instead of killing it outright.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tfvarenv_core::{CoreError, ExecutionResult, Provisioner, Result, RunOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, Command};

pub const TERRAFORM_BIN_ENV_VAR: &str = "TFVARENV_TERRAFORM_BIN";

/// How long terraform gets to exit after Ctrl-C before it is killed
pub const INTERRUPT_GRACE: Duration = Duration::from_secs(30);

static RUNNING: AtomicUsize = AtomicUsize::new(0);

/// Whether a terraform child is in flight. Ctrl-C is its to handle then.
pub fn child_running() -> bool {
    RUNNING.load(Ordering::SeqCst) > 0
}

struct RunningGuard;

impl RunningGuard {
    fn enter() -> Self {
        RUNNING.fetch_add(1, Ordering::SeqCst);
        RunningGuard
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        RUNNING.fetch_sub(1, Ordering::SeqCst);
    }
}

/// terraform CLI wrapper
pub struct Terraform {
    binary: String,
    echo: bool,
}

impl Terraform {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            echo: true,
        }
    }

    /// `TFVARENV_TERRAFORM_BIN`, or `terraform` from `PATH`
    pub fn from_env() -> Self {
        let binary = std::env::var(TERRAFORM_BIN_ENV_VAR)
            .ok()
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| "terraform".to_string());
        Self::new(binary)
    }

    /// Whether output is mirrored to the terminal
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Run a terraform subcommand and capture its output
    async fn run(&self, subcommand: &str, options: &RunOptions) -> Result<ExecutionResult> {
        let args = build_args(subcommand, options);
        let command_line = format!("{} {}", self.binary, args.join(" "));

        let mut cmd = Command::new(&self.binary);
        cmd.args(&args);
        if !options.working_dir.as_os_str().is_empty() {
            cmd.current_dir(&options.working_dir);
        }
        cmd.stdin(Stdio::inherit());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        tracing::debug!("Running: {}", command_line);
        let started = Instant::now();

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound => CoreError::NotFound(format!(
                "'{}' executable; install terraform or set {}",
                self.binary, TERRAFORM_BIN_ENV_VAR
            )),
            _ => CoreError::Io(e),
        })?;
        let _running = RunningGuard::enter();

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let echo = self.echo;
        let stdout_task = tokio::spawn(capture(stdout, echo, false));
        let stderr_task = tokio::spawn(capture(stderr, echo, true));

        let (status, interrupted) = tokio::select! {
            status = child.wait() => (status?, false),
            Ok(()) = tokio::signal::ctrl_c() => (stop(&mut child, &command_line).await?, true),
        };
        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();
        let duration = started.elapsed();

        tracing::debug!(
            "{} finished with {:?} in {:.1}s",
            command_line,
            status.code(),
            duration.as_secs_f64()
        );

        Ok(ExecutionResult {
            success: status.success() && !interrupted,
            exit_code: status
                .code()
                .unwrap_or(if interrupted { 130 } else { -1 }),
            stdout,
            stderr,
            duration,
            command_line,
            interrupted,
        })
    }
}

/// Waits for an interrupted child to exit, killing it after the grace
/// period or on a second Ctrl-C.
async fn stop(child: &mut Child, command_line: &str) -> std::io::Result<ExitStatus> {
    tracing::warn!(
        "Interrupted, waiting up to {}s for `{}` to exit (Ctrl-C again to kill it)",
        INTERRUPT_GRACE.as_secs(),
        command_line
    );
    tokio::select! {
        status = child.wait() => return status,
        Ok(()) = tokio::signal::ctrl_c() => {}
        _ = tokio::time::sleep(INTERRUPT_GRACE) => {}
    }

    tracing::warn!("Killing `{}`", command_line);
    if let Err(e) = child.start_kill() {
        tracing::debug!("Could not kill `{}`: {}", command_line, e);
    }
    child.wait().await
}

#[async_trait]
impl Provisioner for Terraform {
    async fn init(&self, options: &RunOptions) -> Result<ExecutionResult> {
        self.run("init", options).await
    }

    async fn plan(&self, options: &RunOptions) -> Result<ExecutionResult> {
        self.run("plan", options).await
    }

    async fn apply(&self, options: &RunOptions) -> Result<ExecutionResult> {
        self.run("apply", options).await
    }

    async fn destroy(&self, options: &RunOptions) -> Result<ExecutionResult> {
        self.run("destroy", options).await
    }
}

/// Command-line arguments for one subcommand
pub fn build_args(subcommand: &str, options: &RunOptions) -> Vec<String> {
    let mut args = vec![subcommand.to_string()];

    match subcommand {
        "init" => {
            if let Some(backend) = &options.backend_config {
                args.push(format!("-backend-config={}", backend.display()));
            }
            if options.reconfigure {
                args.push("-reconfigure".to_string());
            }
        }
        _ => {
            if let Some(var_file) = &options.var_file {
                args.push(format!("-var-file={}", var_file.display()));
            }
            if options.auto_approve && subcommand != "plan" {
                args.push("-auto-approve".to_string());
            }
        }
    }

    args.extend(options.extra_args.iter().cloned());
    args
}

async fn capture<R>(reader: Option<R>, echo: bool, is_stderr: bool) -> String
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return String::new();
    };

    let captured = match (echo, is_stderr) {
        (false, _) => tee(reader, &mut tokio::io::sink()).await,
        (true, false) => tee(reader, &mut tokio::io::stdout()).await,
        (true, true) => tee(reader, &mut tokio::io::stderr()).await,
    };
    String::from_utf8_lossy(&captured).into_owned()
}

/// Copies `reader` to `out` chunk by chunk and returns every byte read.
///
/// A failing `out` stops the echo but not the capture, so the child never
/// blocks on a full pipe.
async fn tee<R, W>(mut reader: R, out: &mut W) -> Vec<u8>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut captured = Vec::new();
    let mut buf = [0u8; 8192];
    let mut echoing = true;

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::debug!("Stopped reading terraform output: {}", e);
                break;
            }
        };

        let chunk = &buf[..n];
        if echoing {
            let written = match out.write_all(chunk).await {
                Ok(()) => out.flush().await,
                Err(e) => Err(e),
            };
            if let Err(e) = written {
                tracing::debug!("Stopped echoing terraform output: {}", e);
                echoing = false;
            }
        }
        captured.extend_from_slice(chunk);
    }
    captured
}
