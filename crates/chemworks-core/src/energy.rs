use crate::fixed::Fixed64;
use serde::{Deserialize, Serialize};

/// A bounded store of energy, funded externally and drawn down by work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EnergyBufferData")]
pub struct EnergyBuffer {
    stored: Fixed64,
    capacity: Fixed64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stored energy {stored} outside 0..={capacity}")]
pub struct EnergyRangeError {
    pub stored: Fixed64,
    pub capacity: Fixed64,
}

#[derive(Serialize, Deserialize)]
struct EnergyBufferData {
    stored: Fixed64,
    capacity: Fixed64,
}

impl TryFrom<EnergyBufferData> for EnergyBuffer {
    type Error = EnergyRangeError;

    fn try_from(data: EnergyBufferData) -> Result<Self, Self::Error> {
        if data.stored < Fixed64::ZERO || data.stored > data.capacity {
            return Err(EnergyRangeError {
                stored: data.stored,
                capacity: data.capacity,
            });
        }
        Ok(Self {
            stored: data.stored,
            capacity: data.capacity,
        })
    }
}

impl EnergyBuffer {
    /// An empty buffer. Negative capacities are treated as zero.
    pub fn new(capacity: Fixed64) -> Self {
        Self {
            stored: Fixed64::ZERO,
            capacity: capacity.max(Fixed64::ZERO),
        }
    }

    pub fn stored(&self) -> Fixed64 {
        self.stored
    }

    pub fn capacity(&self) -> Fixed64 {
        self.capacity
    }

    /// Room left before the buffer is full.
    pub fn free(&self) -> Fixed64 {
        self.capacity - self.stored
    }

    /// Add up to `amount`. Returns the energy accepted.
    #[must_use = "returns the energy accepted, which may be less than offered"]
    pub fn fund(&mut self, amount: Fixed64) -> Fixed64 {
        if amount <= Fixed64::ZERO {
            return Fixed64::ZERO;
        }
        let accepted = amount.min(self.free());
        self.stored += accepted;
        accepted
    }

    /// Remove up to `amount`. Returns the energy removed.
    pub fn debit(&mut self, amount: Fixed64) -> Fixed64 {
        if amount <= Fixed64::ZERO {
            return Fixed64::ZERO;
        }
        let taken = amount.min(self.stored);
        self.stored -= taken;
        taken
    }
}
