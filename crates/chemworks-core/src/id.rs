use serde::{Serialize, Deserialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a machine placed in a [`Site`](crate::site::Site).
    pub struct MachineId;
}

/// Identifies a gas type in the host's gas registry. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GasTypeId(pub u32);

/// Identifies a conversion rule in a [`RuleCatalog`](crate::catalog::RuleCatalog).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecipeId(pub u32);
