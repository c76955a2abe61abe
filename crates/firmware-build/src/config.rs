//! Build settings and project constants.
//!
//! Defaults live here as constants. A `firmware.toml` next to the project can
//! override any of them; the CLI layers its flags on top of that.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{BuildError, Result};

/// Device family this pipeline targets.
pub const DEVICE_NAME: &str = "Launchpad Pro";

/// Settings file looked up in the working directory when none is given.
pub const SETTINGS_FILE: &str = "firmware.toml";

pub const DEFAULT_PROGRAM_NAME: &str = "launchpad_pro";
pub const DEFAULT_BUILD_DIR: &str = ".build";
pub const DEFAULT_SRC_DIR: &str = "src";
pub const DEFAULT_UPLOAD_PORT: &str = "Launchpad Pro";
pub const DEFAULT_TOOLCHAIN_PREFIX: &str = "arm-none-eabi-";
pub const DEFAULT_PYTHON: &str = "python3";

/// Locations inside the platform install directory.
pub mod platform {
    pub const LINKER_SCRIPT: &str = "ld/stm32_flash.ld";
    pub const INCLUDE_DIR: &str = "include";
    pub const LIBRARY: &str = "lib/launchpad_pro.a";
    pub const HEX_TO_SYX: &str = "tools/hextosyx.py";
    pub const SEND_SYSEX: &str = "tools/sendsysex.py";
    pub const FACTORY_FIRMWARE: &str = "resources/Launchpad Pro.syx";
}

/// Everything configurable about one pipeline run.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Base name of every produced artifact.
    pub program_name: String,
    /// Platform install directory (linker script, headers, library, scripts).
    pub platform_dir: Option<PathBuf>,
    pub build_dir: PathBuf,
    pub src_dir: PathBuf,
    /// MIDI port name handed to the transmission script.
    pub upload_port: String,
    /// Interpreter for the converter and transmission scripts.
    pub python: String,
    /// Prepended to `gcc`, `g++`, `objcopy`, `size`.
    pub toolchain_prefix: String,
    pub extra_c_flags: Vec<String>,
    pub extra_cxx_flags: Vec<String>,
    pub extra_link_flags: Vec<String>,
    /// Flash budget in bytes; the size report fails above it.
    pub max_flash: Option<u64>,
    /// RAM budget in bytes.
    pub max_ram: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            program_name: DEFAULT_PROGRAM_NAME.to_string(),
            platform_dir: None,
            build_dir: PathBuf::from(DEFAULT_BUILD_DIR),
            src_dir: PathBuf::from(DEFAULT_SRC_DIR),
            upload_port: DEFAULT_UPLOAD_PORT.to_string(),
            python: DEFAULT_PYTHON.to_string(),
            toolchain_prefix: DEFAULT_TOOLCHAIN_PREFIX.to_string(),
            extra_c_flags: Vec::new(),
            extra_cxx_flags: Vec::new(),
            extra_link_flags: Vec::new(),
            max_flash: None,
            max_ram: None,
        }
    }
}

impl Settings {
    /// Parse settings from TOML text. `origin` is only used in error messages.
    pub fn parse(input: &str, origin: &Path) -> Result<Self> {
        toml::from_str(input).map_err(|source| BuildError::ConfigFile {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Read and parse a settings file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(BuildError::io(path))?;
        Self::parse(&text, path)
    }

    /// Load `path` if given, else `firmware.toml` in `dir` if present, else defaults.
    pub fn discover(path: Option<&Path>, dir: &Path) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let candidate = dir.join(SETTINGS_FILE);
                if candidate.is_file() {
                    tracing::debug!(path = %candidate.display(), "using settings file");
                    Self::load(&candidate)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// The platform directory, which every pipeline needs.
    pub fn platform_dir(&self) -> Result<&Path> {
        self.platform_dir.as_deref().ok_or_else(|| {
            BuildError::config(
                "platform directory not set (use --platform-dir, LPP_PLATFORM_DIR \
                 or `platform_dir` in firmware.toml)",
            )
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.platform_dir()?;
        if self.upload_port.trim().is_empty() {
            return Err(BuildError::config("upload port must not be empty"));
        }
        if self.python.trim().is_empty() {
            return Err(BuildError::config("python interpreter must not be empty"));
        }
        if self.build_dir.as_os_str().is_empty() {
            return Err(BuildError::config("build directory must not be empty"));
        }
        Ok(())
    }
}
