//! Cross-toolchain invocation parameters for the Launchpad Pro (STM32F103RB,
//! Cortex-M3).
//!
//! Pure data. [`BuildGraph`](crate::graph::BuildGraph) turns it into compiler
//! and linker command lines.

use std::path::{Path, PathBuf};

use crate::config::{platform, Settings};
use crate::error::{BuildError, Result};

/// Flags shared by the C and C++ front ends.
const COMMON_FLAGS: &[&str] = &[
    "-Os",
    "-Wall",
    "-D_STM32F103RBT6_",
    "-D_STM3x_",
    "-D_STM32x_",
    "-mthumb",
    "-mcpu=cortex-m3",
    "-fsigned-char",
    "-finline-small-functions",
    "-findirect-inlining",
    "-DSTM32F10X_MD",
    "-DUSE_STDPERIPH_DRIVER",
    "-DHSE_VALUE=6000000UL",
    "-DCMSIS",
    "-DUSE_GLOBAL_CONFIG",
    "-ffunction-sections",
];

const C_ONLY_FLAGS: &[&str] = &["-std=c99", "-mlittle-endian"];

const CXX_ONLY_FLAGS: &[&str] = &[
    "-std=c++17",
    "-ffreestanding",
    "-fno-exceptions",
    "-fno-non-call-exceptions",
    "-fno-rtti",
    "-fno-common",
    "-fdata-sections",
    "-mlittle-endian",
];

const LINK_FLAGS: &[&str] = &[
    "-u",
    "_start",
    "-u",
    "_Minimum_Stack_Size",
    "-mcpu=cortex-m3",
    "-mthumb",
    "-specs=nano.specs",
    "-specs=nosys.specs",
    "-nostdlib",
    "-Wl,-static",
    "-N",
    "-nostartfiles",
    "-Wl,--gc-sections",
];

/// Compile-role parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileConfig {
    pub c_compiler: String,
    pub cxx_compiler: String,
    pub c_flags: Vec<String>,
    pub cxx_flags: Vec<String>,
    /// Assembly goes through the C driver with the shared flags only.
    pub asm_flags: Vec<String>,
    pub include_dirs: Vec<PathBuf>,
}

/// Link-role parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkConfig {
    pub linker: String,
    pub flags: Vec<String>,
    pub script: PathBuf,
    pub libraries: Vec<PathBuf>,
}

/// Everything needed to turn sources into `<program>.elf`, plus the binutils
/// used further down the pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolchainConfig {
    pub program_name: String,
    pub compile: CompileConfig,
    pub link: LinkConfig,
    pub objcopy: String,
    pub size_tool: String,
}

impl ToolchainConfig {
    /// The fixed Launchpad Pro toolchain rooted at `platform_dir`, with the
    /// extra flags and tool prefix from `settings` applied.
    pub fn from_settings(settings: &Settings, platform_dir: &Path) -> Self {
        let prefix = settings.toolchain_prefix.as_str();
        let tool = |name: &str| format!("{prefix}{name}");

        let mut c_flags = owned(COMMON_FLAGS);
        c_flags.extend(owned(C_ONLY_FLAGS));
        c_flags.extend(settings.extra_c_flags.iter().cloned());

        let mut cxx_flags = owned(COMMON_FLAGS);
        cxx_flags.extend(owned(CXX_ONLY_FLAGS));
        cxx_flags.extend(settings.extra_cxx_flags.iter().cloned());

        let mut link_flags = owned(LINK_FLAGS);
        link_flags.extend(settings.extra_link_flags.iter().cloned());

        Self {
            program_name: settings.program_name.clone(),
            compile: CompileConfig {
                c_compiler: tool("gcc"),
                cxx_compiler: tool("g++"),
                c_flags,
                cxx_flags,
                asm_flags: owned(COMMON_FLAGS),
                include_dirs: vec![platform_dir.join(platform::INCLUDE_DIR)],
            },
            link: LinkConfig {
                linker: tool("g++"),
                flags: link_flags,
                script: platform_dir.join(platform::LINKER_SCRIPT),
                libraries: vec![platform_dir.join(platform::LIBRARY)],
            },
            objcopy: tool("objcopy"),
            size_tool: tool("size"),
        }
    }

    /// Structural checks that need no filesystem access.
    pub fn validate(&self) -> Result<()> {
        if self.program_name.trim().is_empty() {
            return Err(BuildError::config("program name must not be empty"));
        }
        if self
            .program_name
            .contains(|c: char| c == '/' || c == '\\')
        {
            return Err(BuildError::config(format!(
                "program name `{}` must not contain path separators",
                self.program_name
            )));
        }
        Ok(())
    }

    /// The platform files the compile/link step reads must exist.
    pub fn check_link_inputs(&self) -> Result<()> {
        require_file("linker script", &self.link.script)?;
        for lib in &self.link.libraries {
            require_file("static library", lib)?;
        }
        for dir in &self.compile.include_dirs {
            if !dir.is_dir() {
                return Err(BuildError::MissingPath {
                    what: "include directory",
                    path: dir.clone(),
                });
            }
        }
        Ok(())
    }
}

pub(crate) fn require_file(what: &'static str, path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(BuildError::MissingPath {
            what,
            path: path.to_path_buf(),
        })
    }
}

fn owned(flags: &[&str]) -> Vec<String> {
    flags.iter().map(|f| (*f).to_string()).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn toolchain() -> ToolchainConfig {
        ToolchainConfig::from_settings(&Settings::default(), Path::new("/opt/lpp"))
    }

    #[test]
    fn platform_paths_are_joined() {
        let tc = toolchain();
        assert_eq!(tc.link.script, Path::new("/opt/lpp/ld/stm32_flash.ld"));
        assert_eq!(tc.link.libraries, vec![PathBuf::from("/opt/lpp/lib/launchpad_pro.a")]);
        assert_eq!(tc.compile.include_dirs, vec![PathBuf::from("/opt/lpp/include")]);
    }

    #[test]
    fn c_and_cxx_flags_are_kept_apart() {
        let tc = toolchain();
        assert!(tc.compile.c_flags.iter().any(|f| f == "-std=c99"));
        assert!(!tc.compile.c_flags.iter().any(|f| f == "-std=c++17"));
        assert!(tc.compile.cxx_flags.iter().any(|f| f == "-fno-rtti"));
        assert!(tc.compile.cxx_flags.iter().any(|f| f == "-mcpu=cortex-m3"));
        assert!(tc.compile.asm_flags.iter().any(|f| f == "-mthumb"));
        assert!(!tc.compile.asm_flags.iter().any(|f| f.starts_with("-std=")));
    }

    #[test]
    fn extra_flags_and_prefix_apply() {
        let settings = Settings {
            toolchain_prefix: "/usr/local/bin/arm-none-eabi-".to_string(),
            extra_c_flags: vec!["-DLPP_DEBUG".to_string()],
            ..Settings::default()
        };
        let tc = ToolchainConfig::from_settings(&settings, Path::new("/opt/lpp"));
        assert_eq!(tc.objcopy, "/usr/local/bin/arm-none-eabi-objcopy");
        assert_eq!(tc.compile.c_flags.last().map(String::as_str), Some("-DLPP_DEBUG"));
    }

    #[test]
    fn validate_rejects_bad_program_names() {
        let mut tc = toolchain();
        tc.program_name = "  ".to_string();
        assert!(matches!(tc.validate(), Err(BuildError::Configuration { .. })));
        tc.program_name = "out/fw".to_string();
        assert!(tc.validate().is_err());
        tc.program_name = "fw".to_string();
        assert!(tc.validate().is_ok());
    }

    #[test]
    fn missing_linker_script_is_reported() {
        let err = toolchain().check_link_inputs().unwrap_err();
        assert!(matches!(err, BuildError::MissingPath { what: "linker script", .. }));
    }
}
