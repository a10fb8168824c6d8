use crate::fixed::Fixed64;
use crate::machine::MachineError;
use serde::{Deserialize, Serialize};

/// Default capacity of each of the three tanks.
pub const DEFAULT_TANK_CAPACITY: u32 = 10_000;

/// Default amount pushed out of the output tank per tick.
pub const DEFAULT_GAS_OUTPUT: u32 = 256;

/// How the `active` flag falls back to `false` on a tick without work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityPolicy {
    /// Stay active while the energy reading rose since the previous tick,
    /// so externally arriving power does not flap the flag.
    #[default]
    EnergyEdge,
    /// Active exactly when the tick performed at least one application.
    Strict,
}

/// Tunables for one infuser.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InfuserConfig {
    pub tank_capacity: u32,
    /// Per-tick emission cap for the output tank.
    pub gas_output: u32,
    pub energy_per_operation: Fixed64,
    pub max_energy: Fixed64,
    pub activity_policy: ActivityPolicy,
}

impl Default for InfuserConfig {
    fn default() -> Self {
        Self {
            tank_capacity: DEFAULT_TANK_CAPACITY,
            gas_output: DEFAULT_GAS_OUTPUT,
            energy_per_operation: Fixed64::from_num(200),
            max_energy: Fixed64::from_num(20_000),
            activity_policy: ActivityPolicy::EnergyEdge,
        }
    }
}

impl InfuserConfig {
    pub fn validate(&self) -> Result<(), MachineError> {
        if self.tank_capacity == 0 {
            return Err(MachineError::InvalidConfig("tank_capacity must be positive"));
        }
        if self.gas_output == 0 {
            return Err(MachineError::InvalidConfig("gas_output must be positive"));
        }
        if self.energy_per_operation <= Fixed64::ZERO {
            return Err(MachineError::InvalidConfig(
                "energy_per_operation must be positive",
            ));
        }
        if self.max_energy < self.energy_per_operation {
            return Err(MachineError::InvalidConfig(
                "max_energy must cover at least one operation",
            ));
        }
        Ok(())
    }
}
