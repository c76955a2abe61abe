//! User-facing progress output.

use std::path::Path;

use colored::Colorize;

use crate::runner::{Invocation, ToolOutput};

/// Progress printer shared by every stage.
///
/// Quiet mode prints one line per action (`Building .build/launchpad_pro.hex`);
/// verbose mode prints the full command line instead.
#[derive(Copy, Clone, Debug, Default)]
pub struct Console {
    verbose: bool,
}

impl Console {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Announce that `invocation` is about to produce or consume `target`.
    pub fn announce(&self, label: &str, target: &Path, invocation: &Invocation) {
        if self.verbose {
            println!("{}", invocation.command_line().dimmed());
        } else {
            println!("{} {}", label.cyan(), target.display());
        }
    }

    /// Echo a tool's stdout unchanged.
    pub fn tool_output(&self, output: &ToolOutput) {
        if !output.stdout.is_empty() {
            print!("{}", output.stdout);
            if !output.stdout.ends_with('\n') {
                println!();
            }
        }
    }

    /// Show what a successful tool wrote to stderr (compiler warnings and
    /// the like).
    pub fn diagnostics(&self, output: &ToolOutput) {
        if let Some(text) = diagnostic_text(output) {
            eprintln!("{}", text.yellow());
        }
    }

    pub fn failure(&self, what: &str, output: &ToolOutput) {
        eprintln!("{}", format!("✗ {what} failed").red().bold());
        for stream in [&output.stdout, &output.stderr] {
            if !stream.is_empty() {
                eprintln!();
                eprintln!("{stream}");
            }
        }
    }
}

/// Stderr of a tool run with trailing whitespace removed, if there is any.
pub(crate) fn diagnostic_text(output: &ToolOutput) -> Option<&str> {
    let text = output.stderr.trim_end();
    (!text.trim_start().is_empty()).then_some(text)
}
