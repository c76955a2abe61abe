//! Typed, path-identified build outputs.

use std::fmt;
use std::path::{Path, PathBuf};

/// Artifact formats, ordered by pipeline stage.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub enum ArtifactKind {
    /// Linked executable image, straight from the linker.
    Elf,
    /// Intel HEX encoding of the image.
    Hex,
    /// MIDI system-exclusive payload wrapping the HEX data.
    Syx,
}

impl ArtifactKind {
    /// All kinds in stage order.
    pub const ALL: [ArtifactKind; 3] = [ArtifactKind::Elf, ArtifactKind::Hex, ArtifactKind::Syx];

    /// File extension, without the dot.
    pub const fn suffix(self) -> &'static str {
        match self {
            ArtifactKind::Elf => "elf",
            ArtifactKind::Hex => "hex",
            ArtifactKind::Syx => "syx",
        }
    }

    /// The kind produced from this one, if any.
    pub const fn next(self) -> Option<ArtifactKind> {
        match self {
            ArtifactKind::Elf => Some(ArtifactKind::Hex),
            ArtifactKind::Hex => Some(ArtifactKind::Syx),
            ArtifactKind::Syx => None,
        }
    }

    /// Short display name.
    pub const fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Elf => "ELF",
            ArtifactKind::Hex => "HEX",
            ArtifactKind::Syx => "SYX",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A build output: its format plus where it lives.
///
/// Identity is the path. Whether the file exists, or is up to date, is not
/// tracked here.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Artifact {
    kind: ArtifactKind,
    path: PathBuf,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// Artifact at `<base>.<suffix>`, e.g. `.build/launchpad_pro` → `.build/launchpad_pro.hex`.
    pub fn at_base(kind: ArtifactKind, base: &Path) -> Self {
        Self::new(kind, with_suffix(base, kind.suffix()))
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Append `.suffix` to `base` without touching any dot already in the file name.
pub(crate) fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut os = base.as_os_str().to_os_string();
    os.push(".");
    os.push(suffix);
    PathBuf::from(os)
}
