//! 双足角色
//!
//! 骨骼引用识别、校验，以及组合四肢 / 脊柱 / 注视的双足求解器。

pub mod naming;
mod references;
mod biped_ik;

pub use references::{BipedReferences, HumanBone, HumanoidMapping, Limb, LimbReferences};
pub use biped_ik::BipedIk;
