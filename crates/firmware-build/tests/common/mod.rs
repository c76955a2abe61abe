//! Shared fixtures: a fake platform install and a firmware source tree on disk.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::path::{Path, PathBuf};

use firmware_build::config::platform;
use firmware_build::{BuildMode, Console, Pipeline, Settings};
use tempfile::TempDir;

pub struct Project {
    pub root: TempDir,
}

impl Project {
    /// Platform files, one C source, empty build dir.
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        let platform_dir = root.path().join("platform");
        for file in [
            platform::LINKER_SCRIPT,
            platform::LIBRARY,
            platform::HEX_TO_SYX,
            platform::SEND_SYSEX,
            platform::FACTORY_FIRMWARE,
        ] {
            let path = platform_dir.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, b"").unwrap();
        }
        fs::create_dir_all(platform_dir.join(platform::INCLUDE_DIR)).unwrap();

        let src = root.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("app.c"), "void app_init(void) {}\n").unwrap();

        Self { root }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn platform_dir(&self) -> PathBuf {
        self.path().join("platform")
    }

    pub fn build_dir(&self) -> PathBuf {
        self.path().join("build")
    }

    pub fn settings(&self) -> Settings {
        Settings {
            program_name: "fw".to_string(),
            platform_dir: Some(self.platform_dir()),
            build_dir: self.build_dir(),
            src_dir: self.path().join("src"),
            ..Settings::default()
        }
    }

    pub fn pipeline(&self, mode: BuildMode) -> Pipeline {
        Pipeline::from_settings(&self.settings(), mode, Console::default()).unwrap()
    }
}
