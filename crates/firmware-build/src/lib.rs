//! Build driver for Launchpad Pro firmware.
//!
//! Sources are compiled and linked into an ELF with the ARM cross toolchain,
//! converted to Intel HEX with `objcopy`, wrapped into a MIDI SysEx image by
//! the platform's `hextosyx.py`, and optionally sent to the device with
//! `sendsysex.py`.
//!
//! # Modules
//!
//! - [`toolchain`]: compiler and linker parameters
//! - [`converter`]: ELF → HEX and HEX → SYX rules
//! - [`graph`]: the artifact chain and [`BuildMode`]
//! - [`size`]: section size report
//! - [`delivery`]: SysEx transmission
//! - [`target`]: named targets and their execution
//! - [`runner`]: the external-process seam
//!
//! ```no_run
//! use firmware_build::{BuildMode, Console, Pipeline, Settings, SystemRunner, TargetRegistry};
//!
//! # fn main() -> firmware_build::Result<()> {
//! let settings = Settings {
//!     platform_dir: Some("/opt/launchpad-pro".into()),
//!     ..Settings::default()
//! };
//! let names = ["build", "size"];
//! let mut pipeline = Pipeline::from_settings(&settings, BuildMode::from_targets(&names), Console::default())?;
//! TargetRegistry::standard().invoke(&names, &mut pipeline, &mut SystemRunner)?;
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]
#![allow(missing_docs)]

pub mod artifact;
pub mod config;
pub mod console;
pub mod converter;
pub mod delivery;
pub mod error;
pub mod graph;
pub mod mocks;
pub mod pipeline;
pub mod runner;
pub mod size;
pub mod target;
pub mod toolchain;

pub use artifact::{Artifact, ArtifactKind};
pub use config::Settings;
pub use console::Console;
pub use converter::{ArtifactConverter, ConversionRule};
pub use delivery::{DeliveryAction, DeliverySource};
pub use error::{BuildError, Result};
pub use graph::{BuildGraph, BuildMode};
pub use pipeline::Pipeline;
pub use runner::{Invocation, Stage, SystemRunner, ToolOutput, ToolRunner};
pub use size::{SectionClassifier, SectionSizes, SizeLimits, SizeReporter};
pub use target::{Action, Target, TargetRegistry};
pub use toolchain::ToolchainConfig;
