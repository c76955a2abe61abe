//! External tool invocation.
//!
//! Every tool is run from an explicit argument vector; nothing goes through a
//! shell. [`ToolRunner`] is the seam tests replace with
//! [`RecordingRunner`](crate::mocks::RecordingRunner).

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::process::Command;

use crate::console::Console;
use crate::error::{BuildError, Result};

/// Pipeline step that owns an invocation. Used in errors and by test doubles.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Stage {
    /// Source file → object file.
    Compile,
    /// Objects + libraries → ELF.
    Link,
    /// ELF → Intel HEX.
    ElfToHex,
    /// Intel HEX → SysEx.
    HexToSyx,
    /// Section size inspection.
    Size,
    /// SysEx transmission to the device.
    Deliver,
}

impl Stage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::Compile => "compile",
            Stage::Link => "link",
            Stage::ElfToHex => "ELF to HEX conversion",
            Stage::HexToSyx => "HEX to SysEx conversion",
            Stage::Size => "size report",
            Stage::Deliver => "delivery",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One external program run: which stage, what program, which arguments.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Invocation {
    stage: Stage,
    program: String,
    args: Vec<OsString>,
}

impl Invocation {
    pub fn new(stage: Stage, program: impl Into<String>) -> Self {
        Self {
            stage,
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Human-readable command line. Arguments containing spaces are quoted;
    /// the result is for display only and is never handed to a shell.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            line.push(' ');
            if arg.contains(' ') {
                line.push('"');
                line.push_str(&arg);
                line.push('"');
            } else {
                line.push_str(&arg);
            }
        }
        line
    }
}

/// Exit status and captured streams of a finished tool.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct ToolOutput {
    /// Exit code; `None` if the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// A clean exit with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external programs. Blocking, no timeout.
pub trait ToolRunner {
    /// Run `invocation` to completion. `Err` only when the program could not
    /// be started; a non-zero exit is reported through [`ToolOutput::code`].
    fn run(&mut self, invocation: &Invocation) -> Result<ToolOutput>;
}

/// Runs tools as real child processes.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<ToolOutput> {
        tracing::debug!(
            stage = %invocation.stage(),
            command = %invocation.command_line(),
            "spawning tool"
        );

        let output = Command::new(invocation.program())
            .args(invocation.arguments())
            .output()
            .map_err(|source| BuildError::Spawn {
                stage: invocation.stage(),
                program: invocation.program().to_string(),
                source,
            })?;

        Ok(ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run a build-stage tool; a non-zero exit becomes [`BuildError::Stage`].
pub(crate) fn run_stage(
    runner: &mut dyn ToolRunner,
    invocation: &Invocation,
    console: &Console,
) -> Result<ToolOutput> {
    let output = runner.run(invocation)?;
    if !output.success() {
        console.failure(invocation.stage().as_str(), &output);
        return Err(BuildError::Stage {
            stage: invocation.stage(),
            code: output.code,
        });
    }
    console.diagnostics(&output);
    tracing::info!(stage = %invocation.stage(), "stage finished");
    Ok(output)
}
