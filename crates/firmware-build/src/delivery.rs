//! Sending a SysEx image to the device over MIDI.

use std::path::{Path, PathBuf};

use crate::artifact::{Artifact, ArtifactKind};
use crate::console::Console;
use crate::error::{BuildError, Result};
use crate::runner::{Invocation, Stage, ToolRunner};
use crate::toolchain::require_file;

/// Where the SYX handed to [`DeliveryAction::deliver`] comes from.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DeliverySource {
    /// The graph's freshly resolved `.syx`.
    Built,
    /// The factory image shipped with the platform; never built.
    Factory,
}

/// Wraps the transmission script: `python3 sendsysex.py -p <port> <syx>`.
#[derive(Clone, Debug)]
pub struct DeliveryAction {
    python: String,
    script: PathBuf,
    port: String,
    console: Console,
}

impl DeliveryAction {
    pub fn new(
        python: impl Into<String>,
        script: impl Into<PathBuf>,
        port: impl Into<String>,
        console: Console,
    ) -> Self {
        Self {
            python: python.into(),
            script: script.into(),
            port: port.into(),
            console,
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    /// The transmission script must exist.
    pub fn check(&self) -> Result<()> {
        require_file("SysEx transmission script", &self.script)
    }

    /// Transmit `syx`. A failed transfer is not retried; the device usually
    /// needs reconnecting or power-cycling into bootloader mode first.
    pub fn deliver(&self, syx: &Artifact, runner: &mut dyn ToolRunner) -> Result<()> {
        if syx.kind() != ArtifactKind::Syx {
            return Err(BuildError::config(format!(
                "only SYX artifacts can be delivered, got {} ({})",
                syx.kind(),
                syx.path().display()
            )));
        }

        let inv = Invocation::new(Stage::Deliver, self.python.as_str())
            .arg(&self.script)
            .args(["-p", self.port.as_str()])
            .arg(syx.path());
        self.console.announce("Uploading", syx.path(), &inv);

        let output = runner.run(&inv)?;
        if !output.success() {
            self.console.failure("Upload", &output);
            return Err(BuildError::Delivery {
                port: self.port.clone(),
                code: output.code,
            });
        }
        self.console.tool_output(&output);
        self.console.diagnostics(&output);
        tracing::info!(port = %self.port, syx = %syx.path().display(), "firmware delivered");
        Ok(())
    }
}
