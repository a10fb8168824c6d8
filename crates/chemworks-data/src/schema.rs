//! Serde data file structs for chemistry content.
//!
//! These structs define the on-disk format for gases, conversion rules, and
//! infuser tunables. They are deserialized from RON, JSON, or TOML data files
//! and then resolved into core types by the loader.

use chemworks_core::config::ActivityPolicy;
use serde::Deserialize;

// ===========================================================================
// Gases
// ===========================================================================

/// A gas type definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct GasData {
    pub name: String,
}

// ===========================================================================
// Rules
// ===========================================================================

/// One side of a rule, either as a `("gas", amount)` tuple or spelled out.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RuleStackData {
    Short(String, u32),
    Full { gas: String, amount: u32 },
}

impl RuleStackData {
    pub fn gas(&self) -> &str {
        match self {
            Self::Short(gas, _) | Self::Full { gas, .. } => gas,
        }
    }

    pub fn amount(&self) -> u32 {
        match self {
            Self::Short(_, amount) | Self::Full { amount, .. } => *amount,
        }
    }
}

/// A conversion rule definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleData {
    pub name: String,
    pub left: RuleStackData,
    pub right: RuleStackData,
    pub output: RuleStackData,
}

// ===========================================================================
// Machine
// ===========================================================================

/// Infuser tunables. Every field is optional and falls back to the
/// built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MachineData {
    pub tank_capacity: Option<u32>,
    pub gas_output: Option<u32>,
    pub energy_per_operation: Option<f64>,
    pub max_energy: Option<f64>,
    pub activity_policy: Option<ActivityPolicyData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityPolicyData {
    EnergyEdge,
    Strict,
}

impl From<ActivityPolicyData> for ActivityPolicy {
    fn from(data: ActivityPolicyData) -> Self {
        match data {
            ActivityPolicyData::EnergyEdge => ActivityPolicy::EnergyEdge,
            ActivityPolicyData::Strict => ActivityPolicy::Strict,
        }
    }
}

// ===========================================================================
// TOML wrappers
// ===========================================================================

/// TOML has no top-level arrays, so list files nest under a key.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlGases {
    pub gases: Vec<GasData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlRules {
    pub rules: Vec<RuleData>,
}
