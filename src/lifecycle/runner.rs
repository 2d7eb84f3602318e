//! Subprocess collaborator for the external command-line tools

use anyhow::{anyhow, bail, Context, Result};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use crate::utils::system::decode_console;

/// Captured result of a finished subprocess
#[derive(Debug, Clone)]
pub struct CmdOutput {
    pub code: i32,
    pub stdout: String,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Subprocess-invocation collaborator. The real implementation shells out
/// to a fixed program; tests substitute a scripted double.
pub trait Runner {
    /// Run to completion, capturing stdout. `None` waits indefinitely;
    /// on timeout the child is killed and an error raised.
    fn run(&self, args: &[&str], timeout: Option<Duration>) -> Result<CmdOutput>;

    /// Like `run`, but feeding `input` to the child's stdin
    fn run_with_input(&self, args: &[&str], input: &str, timeout: Option<Duration>)
        -> Result<CmdOutput>;

    /// Fire and forget: spawn without waiting for exit
    fn spawn_detached(&self, args: &[&str]) -> Result<()>;
}

/// Runner bound to one external program (wsl.exe, usbipd, powershell, ...)
pub struct ToolRunner {
    program: PathBuf,
}

impl ToolRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Locate the WSL command-line tool
    pub fn wsl() -> Result<Self> {
        for candidate in ["wsl.exe", "wsl"] {
            if let Ok(p) = which::which(candidate) {
                return Ok(Self { program: p });
            }
        }
        Err(anyhow!("wsl executable not found in PATH"))
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        cmd
    }

    fn finish(
        &self,
        mut child: Child,
        args: &[&str],
        timeout: Option<Duration>,
    ) -> Result<CmdOutput> {
        let status = match timeout {
            None => child.wait()?,
            Some(limit) => match wait_with_timeout(&mut child, limit)? {
                Some(status) => status,
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                    bail!(
                        "{} {} timed out after {}s",
                        self.program.display(),
                        args.join(" "),
                        limit.as_secs()
                    );
                }
            },
        };
        let mut raw = Vec::new();
        if let Some(mut stdout) = child.stdout.take() {
            stdout.read_to_end(&mut raw)?;
        }
        Ok(CmdOutput {
            code: status.code().unwrap_or(-1),
            stdout: decode_console(&raw),
        })
    }
}

impl Runner for ToolRunner {
    fn run(&self, args: &[&str], timeout: Option<Duration>) -> Result<CmdOutput> {
        let child = self
            .command(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to start {}", self.program.display()))?;
        self.finish(child, args, timeout)
    }

    fn run_with_input(
        &self,
        args: &[&str],
        input: &str,
        timeout: Option<Duration>,
    ) -> Result<CmdOutput> {
        let mut child = self
            .command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to start {}", self.program.display()))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes())?;
            // dropping the handle closes the pipe so the child sees EOF
        }
        self.finish(child, args, timeout)
    }

    fn spawn_detached(&self, args: &[&str]) -> Result<()> {
        self.command(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to start {}", self.program.display()))?;
        Ok(())
    }
}

fn wait_with_timeout(child: &mut Child, limit: Duration) -> Result<Option<ExitStatus>> {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}
