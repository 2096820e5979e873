// src/exec/mod.rs

//! External process execution for compilation rules.
//!
//! Rules run their tools to completion and inspect the captured output;
//! there is no streaming and no mid-flight interruption (cancellation
//! granularity is one whole asset).

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

/// Captured result of a completed process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit status code; -1 if the process was terminated by a signal.
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Run `command` with `args` to completion, capturing stdout and stderr.
///
/// `cwd` is the working directory for the child (rules run from the
/// project root). Returns `None` when the process could not be launched
/// at all (command not found, permission denied); a nonzero exit status
/// is a normal `Some` result.
pub fn run_process(command: &str, args: &[String], cwd: Option<&Path>) -> Option<ProcessOutput> {
    let mut cmd = Command::new(command);
    cmd.args(args).stdin(Stdio::null());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    debug!(command, ?args, "running process");

    let output = match cmd.output() {
        Ok(output) => output,
        Err(err) => {
            warn!(command, error = %err, "failed to launch process");
            return None;
        }
    };

    let status = output.status.code().unwrap_or(-1);
    debug!(command, status, "process exited");

    Some(ProcessOutput {
        status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
