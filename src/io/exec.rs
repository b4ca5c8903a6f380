//! External tool invocation.
//!
//! Tools run with the dataset directory as working directory, stderr merged into stdout, and the
//! combined output either appended to the dataset's execution log or written to a destination
//! file when the tool's output is the artifact itself.

use crate::config::StoreConfig;
use std::{
    fmt,
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

/// Status reported when a tool could not be launched, could not be waited on, or timed out.
pub const FAILED_TO_RUN: i32 = -1;

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Bgzip,
    Tabix,
    Bcftools,
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Bgzip => "bgzip",
            Tool::Tabix => "tabix",
            Tool::Bcftools => "bcftools",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Destination of a tool's combined stdout/stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutput {
    /// Append to an execution log.
    ExecLog(PathBuf),
    /// Truncate and write to a file.
    File(PathBuf),
}

impl ToolOutput {
    pub fn path(&self) -> &Path {
        match self {
            ToolOutput::ExecLog(path) | ToolOutput::File(path) => path,
        }
    }
}

/// Runs a command line to completion and reports its exit status.
///
/// Implementations never fail: anything preventing the command from completing is reported as
/// [`FAILED_TO_RUN`].
pub trait ProcessRunner: Send + Sync {
    fn run(&self, workdir: &Path, argv: &[String], output: &ToolOutput) -> i32;
}

#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    fn open_output(output: &ToolOutput, command_line: &str) -> io::Result<File> {
        match output {
            ToolOutput::ExecLog(path) => {
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                writeln!(
                    file,
                    "[{}] {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                    command_line
                )?;
                Ok(file)
            }
            ToolOutput::File(path) => File::create(path),
        }
    }

    fn wait(&self, child: &mut Child) -> io::Result<Option<ExitStatus>> {
        let Some(timeout) = self.timeout else {
            return child.wait().map(Some);
        };
        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            if start.elapsed() >= timeout {
                child.kill()?;
                child.wait()?;
                return Ok(None);
            }
            thread::sleep(WAIT_POLL_INTERVAL);
        }
    }

    fn spawn_and_wait(&self, workdir: &Path, argv: &[String], output: &ToolOutput) -> io::Result<i32> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command line"))?;
        let stdout = Self::open_output(output, &argv.join(" "))?;
        let stderr = stdout.try_clone()?;
        let mut child = Command::new(program)
            .args(args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .spawn()?;
        match self.wait(&mut child)? {
            Some(status) => Ok(status.code().unwrap_or(FAILED_TO_RUN)),
            None => {
                log::error!(
                    "Killed '{}' after exceeding the {:?} timeout",
                    program,
                    self.timeout.unwrap_or_default()
                );
                Ok(FAILED_TO_RUN)
            }
        }
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, workdir: &Path, argv: &[String], output: &ToolOutput) -> i32 {
        match self.spawn_and_wait(workdir, argv, output) {
            Ok(status) => status,
            Err(error) => {
                log::error!("Failed to run '{}': {error}", argv.join(" "));
                FAILED_TO_RUN
            }
        }
    }
}

/// Resolves tool executables through the configuration and logs every invocation.
#[derive(Clone)]
pub struct ToolInvoker {
    config: Arc<StoreConfig>,
    runner: Arc<dyn ProcessRunner>,
}

impl ToolInvoker {
    pub fn new(config: Arc<StoreConfig>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self { config, runner }
    }

    pub fn command<S: AsRef<str>>(&self, tool: Tool, args: &[S]) -> Vec<String> {
        std::iter::once(self.config.executable(tool).to_string_lossy().into_owned())
            .chain(args.iter().map(|arg| arg.as_ref().to_string()))
            .collect()
    }

    pub fn run<S: AsRef<str>>(
        &self,
        workdir: &Path,
        tool: Tool,
        args: &[S],
        output: &ToolOutput,
    ) -> i32 {
        let argv = self.command(tool, args);
        let command_line = argv.join(" ");
        log::debug!("Running: {command_line} > {}", output.path().display());
        let status = self.runner.run(workdir, &argv, output);
        if status == 0 {
            log::debug!("Finished: {command_line} (status {status})");
        } else {
            log::warn!("Finished: {command_line} (status {status})");
        }
        status
    }
}
