//! User-invocable targets and their execution order.

use std::collections::HashSet;

use crate::artifact::ArtifactKind;
use crate::delivery::DeliverySource;
use crate::error::{BuildError, Result};
use crate::graph::BuildMode;
use crate::pipeline::Pipeline;
use crate::runner::ToolRunner;

/// What a target does once its artifact is in place.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Action {
    None,
    ReportSize,
    Deliver(DeliverySource),
}

/// A named entry point.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Target {
    pub name: &'static str,
    /// Artifact that must be resolved first, if any.
    pub artifact: Option<ArtifactKind>,
    pub action: Action,
    pub title: &'static str,
    pub description: &'static str,
    /// Run the action every time the target is requested, even twice in one
    /// run. Set for targets whose effect (printing, transmitting) is not
    /// captured by any artifact.
    pub force_always: bool,
}

/// The closed set of targets, built once at startup.
#[derive(Clone, Debug)]
pub struct TargetRegistry {
    targets: Vec<Target>,
    defaults: Vec<&'static str>,
}

impl Default for TargetRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl TargetRegistry {
    pub fn standard() -> Self {
        let targets = vec![
            Target {
                name: "build",
                artifact: Some(ArtifactKind::Syx),
                action: Action::None,
                title: "Build",
                description: "Build firmware and convert it to SysEx",
                force_always: false,
            },
            Target {
                name: BuildMode::NOBUILD_TARGET,
                artifact: Some(ArtifactKind::Syx),
                action: Action::None,
                title: "No Build",
                description: "Compute artifact paths without building anything",
                force_always: true,
            },
            Target {
                name: "size",
                artifact: Some(ArtifactKind::Elf),
                action: Action::ReportSize,
                title: "Program Size",
                description: "Calculate program size",
                force_always: true,
            },
            Target {
                name: "upload",
                artifact: Some(ArtifactKind::Syx),
                action: Action::Deliver(DeliverySource::Built),
                title: "Upload",
                description: "Send firmware to Launchpad Pro over MIDI",
                force_always: true,
            },
            Target {
                name: "restore",
                artifact: None,
                action: Action::Deliver(DeliverySource::Factory),
                title: "Restore",
                description: "Restore Launchpad Pro original firmware",
                force_always: true,
            },
        ];

        Self {
            targets,
            defaults: vec!["build", "size"],
        }
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Targets run when none are named.
    pub fn defaults(&self) -> &[&'static str] {
        &self.defaults
    }

    pub fn get(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name == name)
    }

    pub fn lookup(&self, name: &str) -> Result<&Target> {
        self.get(name).ok_or_else(|| BuildError::UnknownTarget {
            name: name.to_string(),
            available: self
                .targets
                .iter()
                .map(|t| t.name)
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// Run `names` (or the defaults when empty) in order.
    ///
    /// Every name is looked up and every target preflighted before anything
    /// runs, so an unknown name or a missing platform file means no tool is
    /// started. After that the first failure ends the run.
    pub fn invoke<S: AsRef<str>>(
        &self,
        names: &[S],
        pipeline: &mut Pipeline,
        runner: &mut dyn ToolRunner,
    ) -> Result<()> {
        let requested: Vec<&str> = if names.is_empty() {
            self.defaults.clone()
        } else {
            names.iter().map(AsRef::as_ref).collect()
        };

        let targets = requested
            .iter()
            .map(|name| self.lookup(name))
            .collect::<Result<Vec<_>>>()?;

        for target in &targets {
            pipeline.preflight(target)?;
        }

        let mut completed = HashSet::new();
        for target in targets {
            let first_time = completed.insert(target.name);
            if !first_time && !target.force_always {
                tracing::debug!(target_name = target.name, "already up to date in this run");
                continue;
            }
            tracing::debug!(target_name = target.name, "running target");
            pipeline.run(target, runner)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique() {
        let registry = TargetRegistry::standard();
        let names: HashSet<_> = registry.targets().iter().map(|t| t.name).collect();
        assert_eq!(names.len(), registry.targets().len());
    }

    #[test]
    fn defaults_are_registered() {
        let registry = TargetRegistry::standard();
        for name in registry.defaults() {
            assert!(registry.get(name).is_some(), "default `{name}` is not registered");
        }
    }

    #[test]
    fn side_effect_targets_always_run() {
        let registry = TargetRegistry::standard();
        for name in ["size", "upload", "restore", "nobuild"] {
            assert!(registry.get(name).unwrap().force_always, "{name}");
        }
        assert!(!registry.get("build").unwrap().force_always);
    }

    #[test]
    fn restore_has_no_graph_artifact() {
        let restore = TargetRegistry::standard().get("restore").cloned().unwrap();
        assert_eq!(restore.artifact, None);
        assert_eq!(restore.action, Action::Deliver(DeliverySource::Factory));
    }

    #[test]
    fn unknown_name_lists_alternatives() {
        let err = TargetRegistry::standard().lookup("flash").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("`flash`"));
        assert!(message.contains("upload"));
    }
}
