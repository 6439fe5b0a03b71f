//! Batch build: the root module first, then every other module in lock-step.
//!
//! All modules of the batch finish a stage before any of them starts the next,
//! so a module's `preBuild` and `build` can rely on every sibling's output
//! slots already existing. A failing stage aborts the batch: every module of
//! the batch is dismantled in reverse order and the error names the module and
//! the stage. The root module is not rolled back.

use crate::config::prefs::RigConfig;
use crate::foundation::error::{RigError, RigResult};
use crate::graph::scene::SceneGraph;
use crate::module::base::ModuleBase;
use crate::module::lifecycle::{Module, Stage, run_stage};
use crate::module::registry::ModuleType;
use crate::rig::context::RigContext;
use crate::scaffold::discovery::module_roots;
use crate::scaffold::scaffold::{Scaffold, ScaffoldInfo};

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
/// What happened to one module.
pub enum ModuleOutcome {
    /// All five stages ran.
    Built,
    /// Not built; the reason says why.
    Skipped {
        /// Validation message, unreadable tag or "already built".
        reason: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
/// Report line for one module.
pub struct ModuleReport {
    /// Module nice name (or root joint name when the tags are unreadable).
    pub name: String,
    /// Module type, when it could be read.
    pub module_type: Option<ModuleType>,
    /// Outcome.
    pub outcome: ModuleOutcome,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
/// Per-module result of [`batch_build`].
pub struct BuildReport {
    /// One line per discovered module root, root module first.
    pub modules: Vec<ModuleReport>,
}

impl BuildReport {
    fn push(
        &mut self,
        name: impl Into<String>,
        module_type: Option<ModuleType>,
        outcome: ModuleOutcome,
    ) {
        self.modules.push(ModuleReport {
            name: name.into(),
            module_type,
            outcome,
        });
    }

    fn skip(
        &mut self,
        name: impl Into<String>,
        module_type: Option<ModuleType>,
        reason: impl Into<String>,
    ) {
        self.push(
            name,
            module_type,
            ModuleOutcome::Skipped {
                reason: reason.into(),
            },
        );
    }

    /// Names of the modules that were built.
    pub fn built(&self) -> Vec<&str> {
        self.modules
            .iter()
            .filter(|m| m.outcome == ModuleOutcome::Built)
            .map(|m| m.name.as_str())
            .collect()
    }

    /// Names and reasons of the modules that were skipped.
    pub fn skipped(&self) -> Vec<(&str, &str)> {
        self.modules
            .iter()
            .filter_map(|m| match &m.outcome {
                ModuleOutcome::Skipped { reason } => Some((m.name.as_str(), reason.as_str())),
                ModuleOutcome::Built => None,
            })
            .collect()
    }
}

fn already_built(ctx: &RigContext, info: &ScaffoldInfo) -> bool {
    ctx.slot_for(info.root).is_some()
}

/// Build every unbuilt module in the scene.
#[tracing::instrument(skip_all)]
pub fn batch_build(scene: &mut dyn SceneGraph, config: &RigConfig) -> RigResult<BuildReport> {
    let mut ctx = RigContext::resolve(scene, config.clone())?;
    let mut report = BuildReport::default();

    let mut root: Option<ScaffoldInfo> = None;
    let mut others: Vec<ScaffoldInfo> = Vec::new();
    for node in module_roots(scene, config)? {
        let info = Scaffold::from_node(scene, node).and_then(|s| s.info(scene, config));
        match info {
            Ok(info) if info.module_type == ModuleType::Root => root = Some(info),
            Ok(info) => others.push(info),
            Err(e) => {
                let name = scene.node_name(node)?;
                tracing::warn!(
                    joint = %name,
                    error = %e,
                    "skipping module root with unreadable tags"
                );
                report.skip(name, None, e.to_string());
            }
        }
    }

    if let Some(info) = root {
        if already_built(&ctx, &info) {
            report.skip(&info.name, Some(info.module_type), "already built");
        } else {
            tracing::info!(module = %info.name, "building root module");
            let mut module = ModuleType::Root.instantiate(ModuleBase::new(&info));
            for stage in Stage::ALL {
                run_stage(module.as_mut(), stage, scene, &mut ctx)
                    .map_err(|e| RigError::build_failed(&info.name, stage.to_string(), e))?;
            }
            report.push(&info.name, Some(info.module_type), ModuleOutcome::Built);
        }
    }

    tracing::info!(modules = others.len(), "validating");
    let mut batch: Vec<Box<dyn Module>> = Vec::new();
    for info in others {
        if already_built(&ctx, &info) {
            report.skip(&info.name, Some(info.module_type), "already built");
            continue;
        }
        let module = info.module_type.instantiate(ModuleBase::new(&info));
        if let Err(e) = module.validate_chain() {
            tracing::warn!(module = %info.name, error = %e, "skipping module");
            report.skip(&info.name, Some(info.module_type), e.to_string());
            continue;
        }
        batch.push(module);
    }

    for stage in Stage::ALL {
        tracing::info!(stage = %stage, modules = batch.len(), "{}", stage.progress());
        for i in 0..batch.len() {
            if let Err(e) = run_stage(batch[i].as_mut(), stage, scene, &mut ctx) {
                let name = batch[i].base().name.clone();
                tracing::error!(
                    module = %name,
                    stage = %stage,
                    error = %e,
                    "stage failed, rolling back batch"
                );
                for module in batch.iter_mut().rev() {
                    module.dismantle(scene, &mut ctx);
                }
                return Err(RigError::build_failed(name, stage.to_string(), e));
            }
        }
    }

    for module in &batch {
        report.push(
            &module.base().name,
            Some(module.module_type()),
            ModuleOutcome::Built,
        );
    }
    tracing::info!(
        built = report.built().len(),
        skipped = report.skipped().len(),
        "completed"
    );
    Ok(report)
}

#[cfg(test)]
#[path = "../../tests/unit/builder/batch.rs"]
mod tests;
