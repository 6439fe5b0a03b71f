use crate::foundation::error::RigResult;
use crate::graph::scene::SceneGraph;
use crate::module::base::ModuleBase;
use crate::module::lifecycle::Module;
use crate::module::registry::ModuleType;
use crate::rig::context::RigContext;

/// Module for scaffolds with no type assigned yet.
///
/// Every output slot follows the socket with its rest offset, so the joints
/// hold their bind pose relative to whatever they hang from.
#[derive(Clone, Debug)]
pub struct Passthrough {
    base: ModuleBase,
}

impl Passthrough {
    /// Wrap a base.
    pub fn new(base: ModuleBase) -> Self {
        Self { base }
    }
}

impl Module for Passthrough {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }

    fn module_type(&self) -> ModuleType {
        ModuleType::Unassigned
    }

    fn build(&mut self, scene: &mut dyn SceneGraph, _ctx: &mut RigContext) -> RigResult<()> {
        tracing::debug!(
            module = %self.base.name,
            "no module type assigned; joints follow the socket"
        );
        let socket = self.base.socket_plug()?;
        for i in 0..self.base.chain.len() {
            self.base.drive_slot(scene, i, &socket)?;
        }
        Ok(())
    }
}
