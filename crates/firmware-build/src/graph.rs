//! The fixed artifact chain: sources → ELF → HEX → SYX.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::artifact::{with_suffix, Artifact, ArtifactKind};
use crate::console::Console;
use crate::converter::{ArtifactConverter, ConversionRule};
use crate::error::{BuildError, Result};
use crate::runner::{run_stage, Invocation, Stage, ToolRunner};
use crate::toolchain::{require_file, ToolchainConfig};

/// Whether tools actually run. Decided once per invocation.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum BuildMode {
    #[default]
    Normal,
    /// Compute every artifact path but run nothing.
    NoBuild,
}

impl BuildMode {
    /// Target name that switches the whole run to [`BuildMode::NoBuild`].
    pub const NOBUILD_TARGET: &'static str = "nobuild";

    pub fn from_targets<S: AsRef<str>>(names: &[S]) -> Self {
        if names.iter().any(|n| n.as_ref() == Self::NOBUILD_TARGET) {
            BuildMode::NoBuild
        } else {
            BuildMode::Normal
        }
    }
}

/// Source language, picked from the file extension.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Language {
    C,
    Cxx,
    /// `.S` and `.s`, assembled by the C driver.
    Asm,
}

impl Language {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "c" => Some(Language::C),
            "cpp" | "cc" | "cxx" => Some(Language::Cxx),
            "S" | "s" => Some(Language::Asm),
            _ => None,
        }
    }
}

/// A translation unit and the object file it compiles to.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub object: PathBuf,
    pub language: Language,
}

/// Resolves artifacts on demand, producing each at most once per run.
#[derive(Debug)]
pub struct BuildGraph {
    toolchain: ToolchainConfig,
    src_dir: PathBuf,
    build_dir: PathBuf,
    mode: BuildMode,
    elf_to_hex: ArtifactConverter,
    hex_to_syx: ArtifactConverter,
    console: Console,
    resolved: BTreeMap<ArtifactKind, Artifact>,
}

impl BuildGraph {
    pub fn new(
        toolchain: ToolchainConfig,
        hex_to_syx: ConversionRule,
        src_dir: impl Into<PathBuf>,
        build_dir: impl Into<PathBuf>,
        mode: BuildMode,
        console: Console,
    ) -> Self {
        let elf_to_hex = ConversionRule::elf_to_hex(&toolchain.objcopy);
        Self {
            elf_to_hex: ArtifactConverter::new(elf_to_hex, mode, console),
            hex_to_syx: ArtifactConverter::new(hex_to_syx, mode, console),
            toolchain,
            src_dir: src_dir.into(),
            build_dir: build_dir.into(),
            mode,
            console,
            resolved: BTreeMap::new(),
        }
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    pub fn toolchain(&self) -> &ToolchainConfig {
        &self.toolchain
    }

    /// `<build_dir>/<program>`, the base every artifact path derives from.
    pub fn program_base(&self) -> PathBuf {
        self.build_dir.join(&self.toolchain.program_name)
    }

    /// Where `kind` lands, whether or not it has been built.
    pub fn expected(&self, kind: ArtifactKind) -> Artifact {
        Artifact::at_base(kind, &self.program_base())
    }

    /// Artifacts produced so far in this run, in stage order.
    pub fn resolved(&self) -> impl Iterator<Item = &Artifact> {
        self.resolved.values()
    }

    /// Configuration checks for everything `resolve(kind)` would run. Nothing
    /// is checked in no-build mode beyond the program name.
    pub fn check_prerequisites(&self, kind: ArtifactKind) -> Result<()> {
        self.toolchain.validate()?;
        if self.mode == BuildMode::NoBuild {
            return Ok(());
        }
        if !self.src_dir.is_dir() {
            return Err(BuildError::MissingPath {
                what: "source directory",
                path: self.src_dir.clone(),
            });
        }
        self.toolchain.check_link_inputs()?;
        for converter in [&self.elf_to_hex, &self.hex_to_syx] {
            if converter.rule().output <= kind {
                if let Some(script) = converter.rule().script() {
                    require_file("converter script", script)?;
                }
            }
        }
        Ok(())
    }

    /// Make sure the artifact of `kind` exists, producing every earlier stage
    /// it depends on. Stages already resolved in this run are reused.
    pub fn resolve(&mut self, kind: ArtifactKind, runner: &mut dyn ToolRunner) -> Result<Artifact> {
        let mut previous: Option<Artifact> = None;

        for stage in ArtifactKind::ALL.into_iter().filter(|k| *k <= kind) {
            if let Some(done) = self.resolved.get(&stage) {
                previous = Some(done.clone());
                continue;
            }

            let artifact = match (stage, previous.take()) {
                (ArtifactKind::Elf, _) => self.build_elf(runner)?,
                (_, Some(input)) => {
                    let base = self.program_base();
                    self.converter_for(stage)?
                        .convert(&[input], &base, runner)?
                }
                (_, None) => {
                    return Err(BuildError::config(format!("no input available for {stage}")));
                }
            };

            tracing::debug!(kind = %stage, path = %artifact.path().display(), "artifact resolved");
            self.resolved.insert(stage, artifact.clone());
            previous = Some(artifact);
        }

        previous.ok_or_else(|| BuildError::config(format!("cannot resolve {kind}")))
    }

    fn converter_for(&self, output: ArtifactKind) -> Result<&ArtifactConverter> {
        [&self.elf_to_hex, &self.hex_to_syx]
            .into_iter()
            .find(|c| c.rule().output == output)
            .ok_or_else(|| BuildError::config(format!("no conversion rule produces {output}")))
    }

    /// Source files under the source directory, sorted by path.
    pub fn sources(&self) -> Result<Vec<SourceFile>> {
        let object_root = self.build_dir.join("src");
        let mut sources = Vec::new();

        for entry in WalkDir::new(&self.src_dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(language) = Language::from_path(entry.path()) else {
                continue;
            };
            let relative = entry
                .path()
                .strip_prefix(&self.src_dir)
                .unwrap_or(entry.path());
            sources.push(SourceFile {
                object: with_suffix(&object_root.join(relative), "o"),
                path: entry.into_path(),
                language,
            });
        }

        Ok(sources)
    }

    fn build_elf(&mut self, runner: &mut dyn ToolRunner) -> Result<Artifact> {
        let elf = self.expected(ArtifactKind::Elf);
        if self.mode == BuildMode::NoBuild {
            tracing::debug!(artifact = %elf.path().display(), "nobuild: skipping compile and link");
            return Ok(elf);
        }

        let sources = self.sources()?;
        if sources.is_empty() {
            tracing::warn!(dir = %self.src_dir.display(), "no sources found; linking library only");
        }

        let mut objects = Vec::with_capacity(sources.len());
        for source in &sources {
            if let Some(parent) = source.object.parent() {
                std::fs::create_dir_all(parent).map_err(BuildError::io(parent))?;
            }
            let inv = self.compile_invocation(source);
            self.console.announce("Compiling", &source.object, &inv);
            let output = run_stage(runner, &inv, &self.console)?;
            self.console.tool_output(&output);
            objects.push(source.object.clone());
        }

        std::fs::create_dir_all(&self.build_dir).map_err(BuildError::io(&self.build_dir))?;
        let inv = self.link_invocation(&objects, elf.path());
        self.console.announce("Linking", elf.path(), &inv);
        let output = run_stage(runner, &inv, &self.console)?;
        self.console.tool_output(&output);

        Ok(elf)
    }

    fn compile_invocation(&self, source: &SourceFile) -> Invocation {
        let compile = &self.toolchain.compile;
        let (program, flags) = match source.language {
            Language::C => (&compile.c_compiler, &compile.c_flags),
            Language::Cxx => (&compile.cxx_compiler, &compile.cxx_flags),
            Language::Asm => (&compile.c_compiler, &compile.asm_flags),
        };
        let includes = compile.include_dirs.iter().map(|dir| {
            let mut flag = std::ffi::OsString::from("-I");
            flag.push(dir);
            flag
        });

        Invocation::new(Stage::Compile, program.as_str())
            .arg("-o")
            .arg(&source.object)
            .arg("-c")
            .args(flags)
            .args(includes)
            .arg(&source.path)
    }

    fn link_invocation(&self, objects: &[PathBuf], elf: &Path) -> Invocation {
        let link = &self.toolchain.link;
        Invocation::new(Stage::Link, link.linker.as_str())
            .arg("-o")
            .arg(elf)
            .args(&link.flags)
            .arg("-T")
            .arg(&link.script)
            .args(objects)
            .args(&link.libraries)
    }
}
