//! Target registry behaviour end to end, with tools replaced by a recorder.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]

mod common;

use std::path::{Path, PathBuf};

use common::Project;
use firmware_build::config::platform;
use firmware_build::mocks::RecordingRunner;
use firmware_build::{BuildError, BuildMode, Console, Pipeline, Settings, Stage, TargetRegistry};

fn invoke(
    project: &Project,
    names: &[&str],
    runner: &mut RecordingRunner,
) -> firmware_build::Result<Pipeline> {
    let mut pipeline = project.pipeline(BuildMode::from_targets(names));
    TargetRegistry::standard().invoke(names, &mut pipeline, runner)?;
    Ok(pipeline)
}

#[test]
fn every_registered_target_runs() {
    let registry = TargetRegistry::standard();
    for target in registry.targets() {
        let project = Project::new();
        let mut runner = RecordingRunner::new();
        let result = invoke(&project, &[target.name], &mut runner);
        assert!(result.is_ok(), "`{}` failed: {:?}", target.name, result.err());
    }
}

#[test]
fn unknown_target_runs_nothing() {
    let project = Project::new();
    let mut runner = RecordingRunner::new();

    let err = invoke(&project, &["build", "flash", "size"], &mut runner).unwrap_err();

    assert!(matches!(err, BuildError::UnknownTarget { ref name, .. } if name == "flash"));
    assert!(runner.invocations().is_empty());
}

#[test]
fn defaults_build_then_report_size() {
    let project = Project::new();
    let mut runner = RecordingRunner::new();

    invoke(&project, &[], &mut runner).unwrap();

    assert_eq!(
        runner.stages(),
        [
            Stage::Compile,
            Stage::Link,
            Stage::ElfToHex,
            Stage::HexToSyx,
            Stage::Size,
            Stage::Size
        ]
    );
}

#[test]
fn size_reruns_every_time_but_builds_once() {
    let project = Project::new();
    let mut runner = RecordingRunner::new();

    invoke(&project, &["size", "size"], &mut runner).unwrap();

    assert_eq!(runner.count(Stage::Link), 1);
    // Two tool runs (Berkeley + SysV) per report.
    assert_eq!(runner.count(Stage::Size), 4);
}

#[test]
fn repeated_build_target_is_not_rerun() {
    let project = Project::new();
    let mut runner = RecordingRunner::new();

    invoke(&project, &["build", "build"], &mut runner).unwrap();

    assert_eq!(runner.count(Stage::Compile), 1);
    assert_eq!(runner.count(Stage::HexToSyx), 1);
}

#[test]
fn upload_sends_the_built_syx() {
    let project = Project::new();
    let mut runner = RecordingRunner::new();

    invoke(&project, &["upload"], &mut runner).unwrap();

    let last = runner.invocations().last().unwrap();
    assert_eq!(last.stage(), Stage::Deliver);
    assert_eq!(last.arguments()[1], "-p");
    assert_eq!(last.arguments()[2], "Launchpad Pro");
    assert_eq!(
        last.arguments()[3],
        project.build_dir().join("fw.syx").as_os_str()
    );
}

#[test]
fn restore_sends_factory_image_even_after_a_build() {
    let project = Project::new();
    let mut runner = RecordingRunner::new();

    invoke(&project, &["build", "restore"], &mut runner).unwrap();

    assert_eq!(runner.count(Stage::HexToSyx), 1);
    let delivered = runner.invocations().last().unwrap().arguments().last().unwrap().clone();
    let factory = project.platform_dir().join(platform::FACTORY_FIRMWARE);
    assert_eq!(PathBuf::from(delivered), factory);
}

#[test]
fn restore_alone_never_touches_the_graph() {
    let project = Project::new();
    let mut runner = RecordingRunner::new();

    let pipeline = invoke(&project, &["restore"], &mut runner).unwrap();

    assert_eq!(runner.stages(), [Stage::Deliver]);
    assert_eq!(pipeline.graph.resolved().count(), 0);
}

#[test]
fn nobuild_yields_all_paths_without_tools() {
    let settings = Settings {
        program_name: "fw".to_string(),
        platform_dir: Some("/opt/lpp".into()),
        build_dir: "/out".into(),
        ..Settings::default()
    };
    let names = ["nobuild"];
    let mut pipeline =
        Pipeline::from_settings(&settings, BuildMode::from_targets(&names), Console::default()).unwrap();
    let mut runner = RecordingRunner::new();

    TargetRegistry::standard()
        .invoke(&names, &mut pipeline, &mut runner)
        .unwrap();

    let paths: Vec<&Path> = pipeline.graph.resolved().map(|a| a.path()).collect();
    assert_eq!(
        paths,
        [
            Path::new("/out/fw.elf"),
            Path::new("/out/fw.hex"),
            Path::new("/out/fw.syx")
        ]
    );
    assert!(runner.invocations().is_empty());
}

#[test]
fn nobuild_upload_sends_expected_path_without_building() {
    let project = Project::new();
    let mut runner = RecordingRunner::new();

    invoke(&project, &["nobuild", "upload"], &mut runner).unwrap();

    assert_eq!(runner.stages(), [Stage::Deliver]);
    assert_eq!(
        runner.invocations()[0].arguments()[3],
        project.build_dir().join("fw.syx").as_os_str()
    );
}

#[test]
fn build_failure_stops_later_targets() {
    let project = Project::new();
    let mut runner = RecordingRunner::new().fail_at(Stage::HexToSyx, 2);

    let err = invoke(&project, &["upload", "restore"], &mut runner).unwrap_err();

    assert!(matches!(err, BuildError::Stage { stage: Stage::HexToSyx, code: Some(2) }));
    assert_eq!(runner.count(Stage::Deliver), 0);
}

#[test]
fn delivery_failure_is_reported_with_port() {
    let project = Project::new();
    let mut runner = RecordingRunner::new().fail_at(Stage::Deliver, 1);

    let err = invoke(&project, &["restore"], &mut runner).unwrap_err();

    match err {
        BuildError::Delivery { port, code } => {
            assert_eq!(port, "Launchpad Pro");
            assert_eq!(code, Some(1));
        }
        other => panic!("expected delivery error, got {other}"),
    }
}

#[test]
fn missing_factory_image_fails_before_any_tool() {
    let project = Project::new();
    std::fs::remove_file(project.platform_dir().join(platform::FACTORY_FIRMWARE)).unwrap();
    let mut runner = RecordingRunner::new();

    let err = invoke(&project, &["build", "restore"], &mut runner).unwrap_err();

    assert!(matches!(err, BuildError::MissingPath { what: "factory firmware", .. }));
    assert!(runner.invocations().is_empty());
}

#[test]
fn missing_linker_script_fails_before_any_tool() {
    let project = Project::new();
    std::fs::remove_file(project.platform_dir().join(platform::LINKER_SCRIPT)).unwrap();
    let mut runner = RecordingRunner::new();

    let err = invoke(&project, &["size"], &mut runner).unwrap_err();

    assert!(matches!(err, BuildError::MissingPath { what: "linker script", .. }));
    assert!(runner.invocations().is_empty());
}

#[test]
fn missing_converter_script_fails_before_any_tool() {
    let project = Project::new();
    std::fs::remove_file(project.platform_dir().join(platform::HEX_TO_SYX)).unwrap();
    let mut runner = RecordingRunner::new();

    let err = invoke(&project, &["build"], &mut runner).unwrap_err();

    assert!(matches!(
        err,
        BuildError::MissingPath { what: "converter script", ref path }
            if *path == project.platform_dir().join(platform::HEX_TO_SYX)
    ));
    assert!(runner.invocations().is_empty());

    // `size` stops at the ELF and never needs the converter.
    invoke(&project, &["size"], &mut runner).unwrap();
    assert_eq!(runner.count(Stage::HexToSyx), 0);
}

#[test]
fn missing_transmission_script_fails_before_any_tool() {
    let project = Project::new();
    std::fs::remove_file(project.platform_dir().join(platform::SEND_SYSEX)).unwrap();
    let mut runner = RecordingRunner::new();

    let err = invoke(&project, &["build", "restore"], &mut runner).unwrap_err();

    assert!(matches!(
        err,
        BuildError::MissingPath { what: "SysEx transmission script", .. }
    ));
    assert!(runner.invocations().is_empty());
}

#[test]
fn size_limit_is_enforced() {
    let project = Project::new();
    let settings = Settings {
        max_flash: Some(100),
        ..project.settings()
    };
    let mut pipeline = Pipeline::from_settings(&settings, BuildMode::Normal, Console::default()).unwrap();
    let mut runner = RecordingRunner::new().respond(Stage::Size, ".text   4096   134242608\n");

    let err = TargetRegistry::standard()
        .invoke(&["size"], &mut pipeline, &mut runner)
        .unwrap_err();

    assert!(matches!(err, BuildError::SizeLimit { region: "flash", used: 4096, limit: 100 }));
}
