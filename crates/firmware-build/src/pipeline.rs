//! One run's worth of wired-up components: the artifact graph plus the two
//! consumers that hang off it.

use std::path::Path;

use crate::artifact::{Artifact, ArtifactKind};
use crate::config::{platform, Settings};
use crate::console::Console;
use crate::converter::ConversionRule;
use crate::delivery::{DeliveryAction, DeliverySource};
use crate::error::Result;
use crate::graph::{BuildGraph, BuildMode};
use crate::runner::ToolRunner;
use crate::size::{SectionClassifier, SizeLimits, SizeReporter};
use crate::target::{Action, Target};
use crate::toolchain::{require_file, ToolchainConfig};

#[derive(Debug)]
pub struct Pipeline {
    pub graph: BuildGraph,
    pub size: SizeReporter,
    pub delivery: DeliveryAction,
    /// Bundled factory image used by `restore`.
    pub factory_firmware: Artifact,
}

impl Pipeline {
    /// Wire everything from validated settings. Fails on configuration errors
    /// only; no file is touched and no tool is run.
    pub fn from_settings(settings: &Settings, mode: BuildMode, console: Console) -> Result<Self> {
        settings.validate()?;
        let platform_dir = settings.platform_dir()?;

        let toolchain = ToolchainConfig::from_settings(settings, platform_dir);
        toolchain.validate()?;

        let size = SizeReporter::new(
            toolchain.size_tool.clone(),
            SectionClassifier::standard()?,
            SizeLimits {
                max_flash: settings.max_flash,
                max_ram: settings.max_ram,
            },
            console,
        );
        let delivery = DeliveryAction::new(
            settings.python.clone(),
            platform_dir.join(platform::SEND_SYSEX),
            settings.upload_port.clone(),
            console,
        );
        let hex_to_syx =
            ConversionRule::hex_to_syx(&settings.python, &platform_dir.join(platform::HEX_TO_SYX));
        let graph = BuildGraph::new(
            toolchain,
            hex_to_syx,
            &settings.src_dir,
            &settings.build_dir,
            mode,
            console,
        );

        Ok(Self {
            graph,
            size,
            delivery,
            factory_firmware: factory_firmware(platform_dir),
        })
    }

    pub fn mode(&self) -> BuildMode {
        self.graph.mode()
    }

    /// Configuration checks for `target`, run for every requested target
    /// before the first tool starts.
    pub fn preflight(&self, target: &Target) -> Result<()> {
        if let Some(kind) = target.artifact {
            self.graph.check_prerequisites(kind)?;
        }
        if let Action::Deliver(source) = target.action {
            self.delivery.check()?;
            if source == DeliverySource::Factory {
                require_file("factory firmware", self.factory_firmware.path())?;
            }
        }
        Ok(())
    }

    /// Ensure the target's artifact, then run its action.
    pub fn run(&mut self, target: &Target, runner: &mut dyn ToolRunner) -> Result<()> {
        let resolved = match target.artifact {
            Some(kind) => Some(self.graph.resolve(kind, runner)?),
            None => None,
        };

        match target.action {
            Action::None => {}
            Action::ReportSize => {
                let elf = self.artifact_of(resolved, ArtifactKind::Elf, runner)?;
                self.size.report(&elf, runner)?;
            }
            Action::Deliver(DeliverySource::Built) => {
                let syx = self.artifact_of(resolved, ArtifactKind::Syx, runner)?;
                self.delivery.deliver(&syx, runner)?;
            }
            Action::Deliver(DeliverySource::Factory) => {
                self.delivery.deliver(&self.factory_firmware, runner)?;
            }
        }
        Ok(())
    }

    fn artifact_of(
        &mut self,
        resolved: Option<Artifact>,
        kind: ArtifactKind,
        runner: &mut dyn ToolRunner,
    ) -> Result<Artifact> {
        match resolved {
            Some(artifact) if artifact.kind() == kind => Ok(artifact),
            _ => self.graph.resolve(kind, runner),
        }
    }
}

fn factory_firmware(platform_dir: &Path) -> Artifact {
    Artifact::new(ArtifactKind::Syx, platform_dir.join(platform::FACTORY_FIRMWARE))
}
