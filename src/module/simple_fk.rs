use crate::foundation::error::{RigError, RigResult};
use crate::graph::scene::SceneGraph;
use crate::module::base::ModuleBase;
use crate::module::lifecycle::Module;
use crate::module::registry::ModuleType;
use crate::rig::context::RigContext;
use crate::rig::controller::{ControllerOptions, make_controller};

const FK_SIZE: f64 = 2.0;

/// One controller per joint, nested parent to child.
#[derive(Clone, Debug)]
pub struct SimpleFk {
    pub(crate) base: ModuleBase,
    pub(crate) offsets: Option<usize>,
}

impl SimpleFk {
    /// Wrap a base. Offset nulls follow the configured default.
    pub fn new(base: ModuleBase) -> Self {
        Self { base, offsets: None }
    }

    /// Give every controller `count` offset nulls.
    pub fn with_offsets(mut self, count: usize) -> Self {
        self.offsets = Some(count);
        self
    }

    /// Create the controller chain: `{name}_01`, `{name}_02`, ...
    pub(crate) fn make_controls(&mut self, scene: &mut dyn SceneGraph, ctx: &RigContext) -> RigResult<()> {
        let controls = self.base.globals()?.controls;
        let mut opts = ControllerOptions::default().size(FK_SIZE);
        opts.offsets = self.offsets;

        for i in 0..self.base.controlled_count() {
            let joint = self.base.chain[i];
            let name = format!("{}_{:02}", self.base.name, i + 1);
            let ctrl = make_controller(scene, ctx.config(), &name, &opts)?;
            let parent = match self.base.controllers.last() {
                Some(prev) => prev.shape,
                None => controls,
            };
            ctrl.parent_under(scene, parent)?;
            ctrl.match_to(scene, joint)?;
            self.base.controllers.push(ctrl);
        }
        Ok(())
    }

    /// Drive every slot from its controller, and an excluded end joint from the slot before it.
    pub(crate) fn drive_slots(&self, scene: &mut dyn SceneGraph) -> RigResult<()> {
        for (i, ctrl) in self.base.controllers.iter().enumerate() {
            self.base.drive_slot(scene, i, &ctrl.transform())?;
        }
        for i in self.base.controllers.len()..self.base.chain.len() {
            self.base.follow_previous_slot(scene, i)?;
        }
        Ok(())
    }
}

impl Module for SimpleFk {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }

    fn module_type(&self) -> ModuleType {
        ModuleType::SimpleFk
    }

    fn validate_chain(&self) -> RigResult<()> {
        self.base.validate_non_empty()?;
        if self.base.controlled_count() == 0 {
            return Err(RigError::validation(
                &self.base.name,
                "a single-joint chain must include its end joint",
            ));
        }
        Ok(())
    }

    fn pre_build(&mut self, scene: &mut dyn SceneGraph, ctx: &mut RigContext) -> RigResult<()> {
        self.base.pre_build(scene, ctx)?;
        self.make_controls(scene, ctx)
    }

    fn build(&mut self, scene: &mut dyn SceneGraph, _ctx: &mut RigContext) -> RigResult<()> {
        self.drive_slots(scene)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/module/simple_fk.rs"]
mod tests;
