//! Reusable artifact conversion rules (ELF → HEX, HEX → SYX).

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::artifact::{Artifact, ArtifactKind};
use crate::console::Console;
use crate::error::{BuildError, Result};
use crate::graph::BuildMode;
use crate::runner::{run_stage, Invocation, Stage, ToolRunner};

/// One element of a rule's argument list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Arg {
    Literal(OsString),
    /// Expands to every input path, in order.
    Sources,
    /// Expands to the output path.
    Target,
}

impl Arg {
    pub fn literal(value: impl Into<OsString>) -> Self {
        Arg::Literal(value.into())
    }
}

/// `input kind → output kind` through one external program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversionRule {
    pub stage: Stage,
    pub input: ArtifactKind,
    pub output: ArtifactKind,
    pub program: String,
    pub template: Vec<Arg>,
    /// Script file the program runs, which must exist before the rule runs.
    pub script: Option<PathBuf>,
}

impl ConversionRule {
    /// `objcopy -O ihex <elf> <hex>`
    pub fn elf_to_hex(objcopy: &str) -> Self {
        Self {
            stage: Stage::ElfToHex,
            input: ArtifactKind::Elf,
            output: ArtifactKind::Hex,
            program: objcopy.to_string(),
            template: vec![
                Arg::literal("-O"),
                Arg::literal("ihex"),
                Arg::Sources,
                Arg::Target,
            ],
            script: None,
        }
    }

    /// `python3 hextosyx.py <hex> <syx>`
    pub fn hex_to_syx(python: &str, script: &Path) -> Self {
        Self {
            stage: Stage::HexToSyx,
            input: ArtifactKind::Hex,
            output: ArtifactKind::Syx,
            program: python.to_string(),
            template: vec![
                Arg::literal(script.as_os_str()),
                Arg::Sources,
                Arg::Target,
            ],
            script: Some(script.to_path_buf()),
        }
    }

    pub fn suffix(&self) -> &'static str {
        self.output.suffix()
    }

    pub fn script(&self) -> Option<&Path> {
        self.script.as_deref()
    }

    fn invocation(&self, inputs: &[Artifact], output: &Artifact) -> Invocation {
        let mut inv = Invocation::new(self.stage, self.program.as_str());
        for arg in &self.template {
            inv = match arg {
                Arg::Literal(value) => inv.arg(value),
                Arg::Sources => inv.args(inputs.iter().map(Artifact::path)),
                Arg::Target => inv.arg(output.path()),
            };
        }
        inv
    }
}

/// A [`ConversionRule`] bound to a build mode.
#[derive(Clone, Debug)]
pub struct ArtifactConverter {
    rule: ConversionRule,
    mode: BuildMode,
    console: Console,
}

impl ArtifactConverter {
    pub fn new(rule: ConversionRule, mode: BuildMode, console: Console) -> Self {
        Self {
            rule,
            mode,
            console,
        }
    }

    pub fn rule(&self) -> &ConversionRule {
        &self.rule
    }

    /// Produce `<output_base>.<suffix>` from `inputs`.
    ///
    /// In [`BuildMode::NoBuild`] nothing is run; the artifact value is returned
    /// as if the tool had succeeded.
    pub fn convert(
        &self,
        inputs: &[Artifact],
        output_base: &Path,
        runner: &mut dyn ToolRunner,
    ) -> Result<Artifact> {
        if inputs.is_empty() {
            return Err(BuildError::config(format!(
                "{} needs at least one {} input",
                self.rule.stage, self.rule.input
            )));
        }
        if let Some(wrong) = inputs.iter().find(|a| a.kind() != self.rule.input) {
            return Err(BuildError::config(format!(
                "{} expects {} input, got {} ({})",
                self.rule.stage,
                self.rule.input,
                wrong.kind(),
                wrong.path().display()
            )));
        }

        let output = Artifact::at_base(self.rule.output, output_base);

        match self.mode {
            BuildMode::NoBuild => {
                tracing::debug!(
                    artifact = %output.path().display(),
                    "nobuild: skipping {}",
                    self.rule.stage
                );
            }
            BuildMode::Normal => {
                let inv = self.rule.invocation(inputs, &output);
                self.console.announce("Building", output.path(), &inv);
                let result = run_stage(runner, &inv, &self.console)?;
                self.console.tool_output(&result);
            }
        }

        Ok(output)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::mocks::RecordingRunner;

    fn elf() -> Artifact {
        Artifact::new(ArtifactKind::Elf, "/out/fw.elf")
    }

    #[test]
    fn objcopy_receives_input_then_output() {
        let conv = ArtifactConverter::new(
            ConversionRule::elf_to_hex("arm-none-eabi-objcopy"),
            BuildMode::Normal,
            Console::default(),
        );
        let mut runner = RecordingRunner::new();
        let hex = conv.convert(&[elf()], Path::new("/out/fw"), &mut runner).unwrap();

        assert_eq!(hex, Artifact::new(ArtifactKind::Hex, "/out/fw.hex"));
        let inv = &runner.invocations()[0];
        assert_eq!(inv.program(), "arm-none-eabi-objcopy");
        assert_eq!(inv.arguments(), ["-O", "ihex", "/out/fw.elf", "/out/fw.hex"]);
    }

    #[test]
    fn nobuild_computes_path_without_running() {
        let conv = ArtifactConverter::new(
            ConversionRule::hex_to_syx("python3", Path::new("/opt/lpp/tools/hextosyx.py")),
            BuildMode::NoBuild,
            Console::default(),
        );
        let mut runner = RecordingRunner::new();
        let hex = Artifact::new(ArtifactKind::Hex, "/out/fw.hex");
        let syx = conv.convert(&[hex], Path::new("/out/fw"), &mut runner).unwrap();

        assert_eq!(syx.path(), Path::new("/out/fw.syx"));
        assert!(runner.invocations().is_empty());
    }

    #[test]
    fn wrong_input_kind_is_rejected() {
        let conv = ArtifactConverter::new(
            ConversionRule::hex_to_syx("python3", Path::new("hextosyx.py")),
            BuildMode::Normal,
            Console::default(),
        );
        let mut runner = RecordingRunner::new();
        let err = conv.convert(&[elf()], Path::new("/out/fw"), &mut runner).unwrap_err();
        assert!(matches!(err, BuildError::Configuration { .. }));
        assert!(runner.invocations().is_empty());
    }

    #[test]
    fn non_zero_exit_is_a_stage_error() {
        let conv = ArtifactConverter::new(
            ConversionRule::elf_to_hex("objcopy"),
            BuildMode::Normal,
            Console::default(),
        );
        let mut runner = RecordingRunner::new().fail_at(Stage::ElfToHex, 1);
        let err = conv.convert(&[elf()], Path::new("/out/fw"), &mut runner).unwrap_err();
        assert!(matches!(err, BuildError::Stage { stage: Stage::ElfToHex, code: Some(1) }));
    }

    #[test]
    fn script_is_recorded_on_the_rule() {
        let rule = ConversionRule::hex_to_syx("python3", Path::new("/opt/lpp/tools/hextosyx.py"));
        assert_eq!(rule.script(), Some(Path::new("/opt/lpp/tools/hextosyx.py")));
        assert_eq!(rule.script, Some(PathBuf::from("/opt/lpp/tools/hextosyx.py")));
        assert_eq!(ConversionRule::elf_to_hex("objcopy").script(), None);
    }
}
