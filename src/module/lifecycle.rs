use std::fmt;

use crate::foundation::error::{RigError, RigResult};
use crate::graph::scene::SceneGraph;
use crate::module::base::ModuleBase;
use crate::module::registry::ModuleType;
use crate::rig::context::RigContext;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
/// Where a module is in its build.
pub enum ModuleState {
    /// Bound to a scaffold, nothing created yet.
    Constructed,
    /// I/O groups and output slots exist.
    Registered,
    /// Controllers exist and follow the socket.
    PreBuilt,
    /// Output slots are driven.
    Built,
    /// Joints are driven from the output slots.
    PostBuilt,
    /// Published in a container.
    Encapsulated,
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModuleState::Constructed => "constructed",
            ModuleState::Registered => "registered",
            ModuleState::PreBuilt => "pre-built",
            ModuleState::Built => "built",
            ModuleState::PostBuilt => "post-built",
            ModuleState::Encapsulated => "encapsulated",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
/// One lifecycle stage.
pub enum Stage {
    /// `registerModule`
    Register,
    /// `preBuild`
    PreBuild,
    /// `build`
    Build,
    /// `postBuild`
    PostBuild,
    /// `encapsulate`
    Encapsulate,
}

impl Stage {
    /// Stages in execution order.
    pub const ALL: [Stage; 5] = [
        Stage::Register,
        Stage::PreBuild,
        Stage::Build,
        Stage::PostBuild,
        Stage::Encapsulate,
    ];

    /// State a module must be in before running this stage.
    pub fn requires(self) -> ModuleState {
        match self {
            Stage::Register => ModuleState::Constructed,
            Stage::PreBuild => ModuleState::Registered,
            Stage::Build => ModuleState::PreBuilt,
            Stage::PostBuild => ModuleState::Built,
            Stage::Encapsulate => ModuleState::PostBuilt,
        }
    }

    /// State a module is in after this stage succeeds.
    pub fn reaches(self) -> ModuleState {
        match self {
            Stage::Register => ModuleState::Registered,
            Stage::PreBuild => ModuleState::PreBuilt,
            Stage::Build => ModuleState::Built,
            Stage::PostBuild => ModuleState::PostBuilt,
            Stage::Encapsulate => ModuleState::Encapsulated,
        }
    }

    /// Progress verb used in logs.
    pub fn progress(self) -> &'static str {
        match self {
            Stage::Register => "registering",
            Stage::PreBuild => "pre-building",
            Stage::Build => "building",
            Stage::PostBuild => "post-building",
            Stage::Encapsulate => "encapsulating",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Register => "registerModule",
            Stage::PreBuild => "preBuild",
            Stage::Build => "build",
            Stage::PostBuild => "postBuild",
            Stage::Encapsulate => "encapsulate",
        };
        f.write_str(s)
    }
}

/// A rig module driven through the five build stages.
///
/// Every stage except [`Module::build`] defaults to the shared [`ModuleBase`]
/// behaviour; concrete modules override a stage and usually call the default
/// first. Stages must be run through [`run_stage`], which enforces ordering.
pub trait Module {
    /// Shared state.
    fn base(&self) -> &ModuleBase;

    /// Shared state, mutably.
    fn base_mut(&mut self) -> &mut ModuleBase;

    /// Type tag this module was created for.
    fn module_type(&self) -> ModuleType;

    /// Check the joint chain against this module's contract.
    fn validate_chain(&self) -> RigResult<()> {
        self.base().validate_non_empty()
    }

    /// Create I/O groups, socket plug and output slots.
    fn register_module(
        &mut self,
        scene: &mut dyn SceneGraph,
        ctx: &mut RigContext,
    ) -> RigResult<()> {
        self.base_mut().register(scene, ctx)
    }

    /// Clean the chain, connect the socket and create controllers.
    fn pre_build(&mut self, scene: &mut dyn SceneGraph, ctx: &mut RigContext) -> RigResult<()> {
        self.base_mut().pre_build(scene, ctx)
    }

    /// Emit the network that drives every output slot.
    fn build(&mut self, scene: &mut dyn SceneGraph, ctx: &mut RigContext) -> RigResult<()>;

    /// Drive the joints from the output slots.
    fn post_build(&mut self, scene: &mut dyn SceneGraph, ctx: &mut RigContext) -> RigResult<()> {
        self.base_mut().post_build(scene, ctx)
    }

    /// Publish controllers in a container.
    fn encapsulate(&mut self, scene: &mut dyn SceneGraph, _ctx: &mut RigContext) -> RigResult<()> {
        let ty = self.module_type();
        self.base_mut().encapsulate(scene, ty)
    }

    /// Best-effort teardown back to [`ModuleState::Constructed`].
    fn dismantle(&mut self, scene: &mut dyn SceneGraph, ctx: &mut RigContext) {
        self.base_mut().dismantle(scene, ctx)
    }
}

/// Run one stage on `module`, enforcing stage order.
///
/// Failures are attributed to the module by name.
pub fn run_stage(
    module: &mut dyn Module,
    stage: Stage,
    scene: &mut dyn SceneGraph,
    ctx: &mut RigContext,
) -> RigResult<()> {
    let name = module.base().name.clone();
    let state = module.base().state();
    if state != stage.requires() {
        return Err(RigError::lifecycle(
            name,
            format!(
                "cannot run {stage} while {state} (needs {})",
                stage.requires()
            ),
        ));
    }

    let span = tracing::debug_span!("stage", module = %name, stage = %stage);
    let _guard = span.enter();
    let result = match stage {
        Stage::Register => module.register_module(scene, ctx),
        Stage::PreBuild => module.pre_build(scene, ctx),
        Stage::Build => module.build(scene, ctx),
        Stage::PostBuild => module.post_build(scene, ctx),
        Stage::Encapsulate => module.encapsulate(scene, ctx),
    };
    result.map_err(|e| e.in_module(&name))?;
    module.base_mut().set_state(stage.reaches());
    tracing::debug!(state = %stage.reaches(), "stage complete");
    Ok(())
}

/// Run every remaining stage on one module.
pub fn run_all(
    module: &mut dyn Module,
    scene: &mut dyn SceneGraph,
    ctx: &mut RigContext,
) -> RigResult<()> {
    for stage in Stage::ALL {
        if module.base().state() < stage.reaches() {
            run_stage(module, stage, scene, ctx)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/module/lifecycle.rs"]
mod tests;
