use anyhow::{Context, Result};
use colored::Colorize;
use firmware_build::config::DEVICE_NAME;
use firmware_build::{BuildMode, Console, Pipeline, Settings, SystemRunner, TargetRegistry};
use std::path::PathBuf;
use std::time::Instant;

/// Settings that can be given on the command line. Each one, when present,
/// wins over `firmware.toml`.
#[derive(Debug, Default, clap::Args)]
pub struct Overrides {
    /// Settings file (default: ./firmware.toml if present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Platform install directory (linker script, headers, library, tools)
    #[arg(long, env = "LPP_PLATFORM_DIR", value_name = "DIR")]
    pub platform_dir: Option<PathBuf>,

    /// Output directory for objects and artifacts
    #[arg(long, value_name = "DIR")]
    pub build_dir: Option<PathBuf>,

    /// Firmware source directory
    #[arg(long, value_name = "DIR")]
    pub src_dir: Option<PathBuf>,

    /// MIDI port the device is connected on
    #[arg(long, env = "LPP_UPLOAD_PORT", value_name = "NAME")]
    pub port: Option<String>,
}

impl Overrides {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(dir) = &self.platform_dir {
            settings.platform_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.build_dir {
            settings.build_dir = dir.clone();
        }
        if let Some(dir) = &self.src_dir {
            settings.src_dir = dir.clone();
        }
        if let Some(port) = &self.port {
            settings.upload_port = port.clone();
        }
    }
}

pub fn run(registry: &TargetRegistry, names: &[String], overrides: &Overrides, verbose: bool) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let mut settings = Settings::discover(overrides.config.as_deref(), &cwd)
        .context("Failed to load build settings")?;
    overrides.apply(&mut settings);
    tracing::debug!(
        program = %settings.program_name,
        platform_dir = %settings
            .platform_dir
            .as_deref()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|| "<unset>".to_string()),
        build_dir = %settings.build_dir.display(),
        src_dir = %settings.src_dir.display(),
        port = %settings.upload_port,
        "resolved settings"
    );

    let mode = BuildMode::from_targets(names);
    let shown = if names.is_empty() {
        registry.defaults().join(" ")
    } else {
        names.join(" ")
    };

    println!();
    println!(
        "{}",
        format!("🔨 {DEVICE_NAME} firmware: {shown}").cyan().bold()
    );
    if mode == BuildMode::NoBuild {
        println!("   {}", "nobuild: computing artifact paths only".dimmed());
    }
    println!();

    let start = Instant::now();
    let mut pipeline = Pipeline::from_settings(&settings, mode, Console::new(verbose))
        .context("Invalid build configuration")?;

    if let Err(err) = registry.invoke(names, &mut pipeline, &mut SystemRunner) {
        eprintln!();
        eprintln!("{}", "✗ Firmware pipeline failed".red().bold());
        return Err(err).context(format!("Target(s) `{shown}` did not complete"));
    }

    println!();
    println!(
        "{}",
        format!("✓ Done in {:.2}s", start.elapsed().as_secs_f64())
            .green()
            .bold()
    );
    for artifact in pipeline.graph.resolved() {
        println!("   {}", artifact.path().display().to_string().dimmed());
    }
    println!();

    Ok(())
}
