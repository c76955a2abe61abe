//! Test doubles for the process seam.

#![cfg(any(test, feature = "mocks"))]

use std::collections::HashMap;

use crate::error::Result;
use crate::runner::{Invocation, Stage, ToolOutput, ToolRunner};

/// Records every invocation instead of spawning anything.
///
/// Each stage succeeds with empty output unless configured otherwise with
/// [`fail_at`](Self::fail_at) or [`respond`](Self::respond).
#[derive(Debug, Default)]
pub struct RecordingRunner {
    invocations: Vec<Invocation>,
    failures: HashMap<Stage, i32>,
    responses: HashMap<Stage, String>,
    diagnostics: HashMap<Stage, String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every invocation of `stage` exits with `code`.
    pub fn fail_at(mut self, stage: Stage, code: i32) -> Self {
        self.failures.insert(stage, code);
        self
    }

    /// Every successful invocation of `stage` prints `stdout`.
    pub fn respond(mut self, stage: Stage, stdout: impl Into<String>) -> Self {
        self.responses.insert(stage, stdout.into());
        self
    }

    /// Every successful invocation of `stage` writes `stderr`, as a compiler
    /// does when it warns.
    pub fn diagnose(mut self, stage: Stage, stderr: impl Into<String>) -> Self {
        self.diagnostics.insert(stage, stderr.into());
        self
    }

    pub fn invocations(&self) -> &[Invocation] {
        &self.invocations
    }

    /// Stage of each invocation, in order.
    pub fn stages(&self) -> Vec<Stage> {
        self.invocations.iter().map(Invocation::stage).collect()
    }

    pub fn count(&self, stage: Stage) -> usize {
        self.invocations.iter().filter(|i| i.stage() == stage).count()
    }
}

impl ToolRunner for RecordingRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<ToolOutput> {
        self.invocations.push(invocation.clone());
        let stage = invocation.stage();

        if let Some(code) = self.failures.get(&stage) {
            return Ok(ToolOutput {
                code: Some(*code),
                stdout: String::new(),
                stderr: format!("{} failed (injected)", invocation.program()),
            });
        }
        Ok(ToolOutput {
            code: Some(0),
            stdout: self.responses.get(&stage).cloned().unwrap_or_default(),
            stderr: self.diagnostics.get(&stage).cloned().unwrap_or_default(),
        })
    }
}
