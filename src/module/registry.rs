use std::fmt;
use std::str::FromStr;

use crate::foundation::error::{RigError, RigResult};
use crate::module::base::ModuleBase;
use crate::module::lifecycle::Module;
use crate::module::passthrough::Passthrough;
use crate::module::root::RootModule;
use crate::module::simple_fk::SimpleFk;
use crate::module::space_switch::SpaceSwitchChain;
use crate::module::two_bone_ik::TwoBoneIk;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// Module type tag stored on a scaffold root.
pub enum ModuleType {
    /// No behaviour chosen yet; joints keep their rest pose.
    Unassigned,
    /// The rig root: global controllers and cog.
    Root,
    /// One controller per joint.
    SimpleFk,
    /// FK chain whose last controller blends between local and global space.
    SpaceSwitchChain,
    /// Three-joint analytic IK.
    TwoBoneIk,
}

impl ModuleType {
    /// Every type, in tag order.
    pub const ALL: [ModuleType; 5] = [
        ModuleType::Unassigned,
        ModuleType::Root,
        ModuleType::SimpleFk,
        ModuleType::SpaceSwitchChain,
        ModuleType::TwoBoneIk,
    ];

    /// Tag string as stored in the scene.
    pub fn tag(self) -> &'static str {
        match self {
            ModuleType::Unassigned => "unassigned",
            ModuleType::Root => "root",
            ModuleType::SimpleFk => "simple_fk",
            ModuleType::SpaceSwitchChain => "space_switch_chain",
            ModuleType::TwoBoneIk => "two_bone_ik",
        }
    }

    /// Parse a stored tag.
    pub fn from_tag(tag: &str) -> RigResult<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.tag() == tag)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|t| t.tag()).collect();
                RigError::configuration(format!(
                    "unknown module type '{tag}' (expected one of: {})",
                    known.join(", ")
                ))
            })
    }

    /// Create the module implementation for this type.
    pub fn instantiate(self, base: ModuleBase) -> Box<dyn Module> {
        match self {
            ModuleType::Unassigned => Box::new(Passthrough::new(base)),
            ModuleType::Root => Box::new(RootModule::new(base)),
            ModuleType::SimpleFk => Box::new(SimpleFk::new(base)),
            ModuleType::SpaceSwitchChain => Box::new(SpaceSwitchChain::new(base)),
            ModuleType::TwoBoneIk => Box::new(TwoBoneIk::new(base)),
        }
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ModuleType {
    type Err = RigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/module/registry.rs"]
mod tests;
