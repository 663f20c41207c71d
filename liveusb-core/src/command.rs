//! Runs the external tools the installer depends on.
//!
//! The archive extractor and the bootloader installer are opaque binaries.
//! They are reached through the [`CommandRunner`] trait so the pipeline can be
//! exercised without them, and every invocation is a single blocking call
//! with no timeout and no retry.
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::debug;

/// An external program and the places it may live.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tool {
    /// Program name looked up on the system `PATH`.
    pub program: String,
    /// Candidate locations relative to the working directory, tried in order
    /// before the `PATH`.
    pub bundled: Vec<PathBuf>,
    /// Explicit location that bypasses every other lookup.
    pub override_path: Option<PathBuf>,
}

impl Tool {
    pub fn new<I, P>(program: &str, bundled: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            program: program.to_string(),
            bundled: bundled.into_iter().map(Into::into).collect(),
            override_path: None,
        }
    }

    /// Resolves the tool to an executable path.
    ///
    /// The lookup order is the explicit override, then the bundled
    /// candidates under `workdir`, then the system `PATH`.
    pub fn locate(&self, workdir: &Path) -> Result<PathBuf, CommandError> {
        if let Some(path) = &self.override_path {
            return if path.is_file() {
                Ok(path.clone())
            } else {
                Err(CommandError::NotFound {
                    tool: self.program.clone(),
                })
            };
        }

        if let Some(found) = self
            .bundled
            .iter()
            .map(|rel| workdir.join(rel))
            .find(|candidate| candidate.is_file())
        {
            return Ok(found);
        }

        which::which(&self.program).map_err(|_| CommandError::NotFound {
            tool: self.program.clone(),
        })
    }
}

/// What a finished command left behind.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// The exit code, or `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// The most useful single line to show an operator when the tool failed.
    pub fn summary(&self) -> String {
        let text = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        let last = text.lines().rev().find(|l| !l.trim().is_empty());
        match (last, self.code) {
            (Some(line), Some(code)) => format!("exit status {code}: {}", line.trim()),
            (Some(line), None) => format!("terminated by signal: {}", line.trim()),
            (None, Some(code)) => format!("exit status {code}"),
            (None, None) => "terminated by signal".to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("cannot find '{tool}'; install it or place it next to this program")]
    NotFound { tool: String },

    #[error("failed to run '{}'", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Executes external tools on behalf of the pipeline.
pub trait CommandRunner {
    /// Runs `tool` with `args`, blocking until it exits.
    ///
    /// A non-zero exit status is not an error at this level; callers decide
    /// what the status means.
    fn run(&self, tool: &Tool, args: &[OsString]) -> Result<CommandOutput, CommandError>;
}

/// Runs tools as real child processes, capturing their output.
#[derive(Clone, Debug)]
pub struct SystemRunner {
    workdir: PathBuf,
}

impl SystemRunner {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, tool: &Tool, args: &[OsString]) -> Result<CommandOutput, CommandError> {
        let program = tool.locate(&self.workdir)?;
        debug!(program = %program.display(), ?args, "running external tool");

        let output = Command::new(&program)
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .map_err(|source| CommandError::Spawn {
                program: program.clone(),
                source,
            })?;

        let output = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(
            code = ?output.code,
            stdout = %output.stdout,
            stderr = %output.stderr,
            "tool finished"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn bundled_copy_wins_over_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("7-Zip")).unwrap();
        fs::write(dir.path().join("7-Zip/7z"), b"").unwrap();

        let tool = Tool::new("7z", ["7-Zip/7z.exe", "7-Zip/7z"]);
        assert_eq!(tool.locate(dir.path()).unwrap(), dir.path().join("7-Zip/7z"));
    }

    #[test]
    fn missing_override_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut tool = Tool::new("syslinux", Vec::<PathBuf>::new());
        tool.override_path = Some(dir.path().join("nope"));

        match tool.locate(dir.path()) {
            Err(CommandError::NotFound { tool }) => assert_eq!(tool, "syslinux"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn unknown_program_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let tool = Tool::new("liveusb-no-such-tool-4f1c", Vec::<PathBuf>::new());
        assert!(matches!(
            tool.locate(dir.path()),
            Err(CommandError::NotFound { .. })
        ));
    }

    #[test]
    fn summary_prefers_last_stderr_line() {
        let output = CommandOutput {
            code: Some(1),
            stdout: "scanning\n".into(),
            stderr: "warning\nsyslinux: invalid media signature\n\n".into(),
        };
        assert_eq!(
            output.summary(),
            "exit status 1: syslinux: invalid media signature"
        );
        assert!(!output.success());
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_captures_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let tool = Tool::new("sh", Vec::<PathBuf>::new());
        let runner = SystemRunner::new(dir.path());

        let output = runner
            .run(&tool, &["-c".into(), "echo out; echo err >&2; exit 3".into()])
            .unwrap();
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }
}
