//! Program size report for the linked ELF.
//!
//! The Berkeley-format table from `size -B -d` is printed as-is. The SysV
//! listing from `size -A -d` is then classified per section:
//!
//! - **program** (counts against flash): `.text`, `.data`, `.rodata`,
//!   `.text.align`, `.ARM.exidx`
//! - **data** (counts against RAM): `.data`, `.bss`, `.noinit`
//!
//! `.data` is in both: its initial values live in flash and are copied to RAM
//! at reset.

use colored::Colorize;
use regex::Regex;

use crate::artifact::Artifact;
use crate::console::Console;
use crate::error::{BuildError, Result};
use crate::runner::{run_stage, Invocation, Stage, ToolRunner};

pub const PROGRAM_SECTIONS: &str =
    r"^(?:\.text|\.data|\.rodata|\.text.align|\.ARM.exidx)\s+(\d+).*";
pub const DATA_SECTIONS: &str = r"^(?:\.data|\.bss|\.noinit)\s+(\d+).*";

/// The two section patterns. Each must capture the size as group 1.
#[derive(Clone, Debug)]
pub struct SectionClassifier {
    program: Regex,
    data: Regex,
}

impl SectionClassifier {
    pub fn new(program: &str, data: &str) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| BuildError::config(format!("bad section pattern `{pattern}`: {e}")))
        };
        Ok(Self {
            program: compile(program)?,
            data: compile(data)?,
        })
    }

    pub fn standard() -> Result<Self> {
        Self::new(PROGRAM_SECTIONS, DATA_SECTIONS)
    }

    /// Sum program and data sizes over a `size -A -d` listing.
    pub fn classify(&self, sysv_listing: &str) -> SectionSizes {
        let mut sizes = SectionSizes::default();
        for line in sysv_listing.lines() {
            if let Some(n) = captured_size(&self.program, line) {
                sizes.program = sizes.program.saturating_add(n);
            }
            if let Some(n) = captured_size(&self.data, line) {
                sizes.data = sizes.data.saturating_add(n);
            }
        }
        sizes
    }
}

fn captured_size(pattern: &Regex, line: &str) -> Option<u64> {
    pattern.captures(line)?.get(1)?.as_str().parse().ok()
}

/// Flash and RAM usage in bytes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SectionSizes {
    pub program: u64,
    pub data: u64,
}

/// Optional memory budgets.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SizeLimits {
    pub max_flash: Option<u64>,
    pub max_ram: Option<u64>,
}

impl SizeLimits {
    pub fn check(&self, sizes: &SectionSizes) -> Result<()> {
        let budgets = [
            ("flash", sizes.program, self.max_flash),
            ("RAM", sizes.data, self.max_ram),
        ];
        for (region, used, limit) in budgets {
            if let Some(limit) = limit {
                if used > limit {
                    return Err(BuildError::SizeLimit { region, used, limit });
                }
            }
        }
        Ok(())
    }
}

/// Runs the size tool against an ELF. Side effect only: the artifact graph is
/// never touched.
#[derive(Clone, Debug)]
pub struct SizeReporter {
    size_tool: String,
    classifier: SectionClassifier,
    limits: SizeLimits,
    console: Console,
}

impl SizeReporter {
    pub fn new(
        size_tool: impl Into<String>,
        classifier: SectionClassifier,
        limits: SizeLimits,
        console: Console,
    ) -> Self {
        Self {
            size_tool: size_tool.into(),
            classifier,
            limits,
            console,
        }
    }

    pub fn report(&self, elf: &Artifact, runner: &mut dyn ToolRunner) -> Result<SectionSizes> {
        let berkeley = Invocation::new(Stage::Size, self.size_tool.as_str())
            .args(["-B", "-d"])
            .arg(elf.path());
        self.console.announce("Calculating size", elf.path(), &berkeley);
        let output = run_stage(runner, &berkeley, &self.console)?;
        self.console.tool_output(&output);

        let sysv = Invocation::new(Stage::Size, self.size_tool.as_str())
            .args(["-A", "-d"])
            .arg(elf.path());
        let output = run_stage(runner, &sysv, &self.console)?;
        let sizes = self.classifier.classify(&output.stdout);

        println!(
            "{}",
            format!(
                "Flash used: {} bytes{}  RAM used: {} bytes{}",
                sizes.program,
                budget_suffix(self.limits.max_flash),
                sizes.data,
                budget_suffix(self.limits.max_ram)
            )
            .green()
        );
        tracing::info!(program = sizes.program, data = sizes.data, "size report");

        self.limits.check(&sizes)?;
        Ok(sizes)
    }
}

fn budget_suffix(limit: Option<u64>) -> String {
    limit.map(|l| format!(" of {l}")).unwrap_or_default()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactKind;
    use crate::mocks::RecordingRunner;

    const SYSV: &str = "\
.build/launchpad_pro.elf  :
section              size        addr
.isr_vector           304   134242304
.text               21844   134242608
.rodata              1020   134264452
.ARM.exidx              8   134265472
.data                 112   536870912
.bss                 3188   536871024
.noinit                64   536874212
.comment              126           0
.debug_info         40211           0
Total               66877
";

    #[test]
    fn classifies_program_and_data_sections() {
        let sizes = SectionClassifier::standard().unwrap().classify(SYSV);
        assert_eq!(sizes.program, 21844 + 1020 + 8 + 112);
        assert_eq!(sizes.data, 112 + 3188 + 64);
    }

    #[test]
    fn unrelated_sections_are_ignored() {
        let sizes = SectionClassifier::standard()
            .unwrap()
            .classify(".debug_line 900 0\n.comment 12 0\n");
        assert_eq!(sizes, SectionSizes::default());
    }

    #[test]
    fn bad_pattern_is_a_configuration_error() {
        let err = SectionClassifier::new("(", DATA_SECTIONS).unwrap_err();
        assert!(matches!(err, BuildError::Configuration { .. }));
    }

    #[test]
    fn limits_are_enforced() {
        let limits = SizeLimits {
            max_flash: Some(1000),
            max_ram: None,
        };
        let sizes = SectionSizes {
            program: 1001,
            data: 50_000,
        };
        let err = limits.check(&sizes).unwrap_err();
        assert!(matches!(
            err,
            BuildError::SizeLimit {
                region: "flash",
                used: 1001,
                limit: 1000
            }
        ));
        assert!(SizeLimits::default().check(&sizes).is_ok());
    }

    #[test]
    fn report_runs_berkeley_then_sysv() {
        let reporter = SizeReporter::new(
            "arm-none-eabi-size",
            SectionClassifier::standard().unwrap(),
            SizeLimits::default(),
            Console::default(),
        );
        let mut runner = RecordingRunner::new().respond(Stage::Size, SYSV);
        let elf = Artifact::new(ArtifactKind::Elf, "/out/fw.elf");

        let sizes = reporter.report(&elf, &mut runner).unwrap();

        let args: Vec<_> = runner.invocations().iter().map(|i| i.arguments().to_vec()).collect();
        assert_eq!(args, [["-B", "-d", "/out/fw.elf"], ["-A", "-d", "/out/fw.elf"]]);
        assert_eq!(sizes.data, 3364);
    }
}
