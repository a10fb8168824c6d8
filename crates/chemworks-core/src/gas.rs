use crate::id::GasTypeId;
use serde::{Serialize, Deserialize};

/// A quantity of a single gas type. Transient: passed between tanks, items
/// and neighbours, never stored beyond a single call except inside a tank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GasStack {
    pub gas: GasTypeId,
    pub amount: u32,
}

impl GasStack {
    pub fn new(gas: GasTypeId, amount: u32) -> Self {
        Self { gas, amount }
    }

    /// Same gas, different amount.
    pub fn with_amount(self, amount: u32) -> Self {
        Self { gas: self.gas, amount }
    }

    pub fn is_empty(&self) -> bool {
        self.amount == 0
    }
}

/// Errors raised when a tank is restored from external data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GasError {
    #[error("{amount} units of gas {gas:?} exceed tank capacity {capacity}")]
    OverCapacity {
        gas: GasTypeId,
        amount: u32,
        capacity: u32,
    },
    #[error("tank capacity must be positive")]
    ZeroCapacity,
}

/// A bounded container holding zero or one gas type.
///
/// The held stack is `None` exactly when the tank is empty, so a tank can
/// never report a gas type with zero stored. Every mutation takes a
/// `commit` flag: with `commit = false` the call only reports what *would*
/// happen, which lets neighbours negotiate a transfer before committing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GasTankData")]
pub struct GasTank {
    stored: Option<GasStack>,
    max_gas: u32,
}

/// Wire shape of a [`GasTank`]; decoded data passes through `set_gas`.
#[derive(Serialize, Deserialize)]
struct GasTankData {
    stored: Option<GasStack>,
    max_gas: u32,
}

impl TryFrom<GasTankData> for GasTank {
    type Error = GasError;

    fn try_from(data: GasTankData) -> Result<Self, Self::Error> {
        if data.max_gas == 0 {
            return Err(GasError::ZeroCapacity);
        }
        let mut tank = GasTank::new(data.max_gas);
        tank.set_gas(data.stored)?;
        Ok(tank)
    }
}

impl GasTank {
    /// Create an empty tank. A capacity of 0 is clamped to 1.
    pub fn new(max_gas: u32) -> Self {
        Self {
            stored: None,
            max_gas: max_gas.max(1),
        }
    }

    pub fn max_gas(&self) -> u32 {
        self.max_gas
    }

    /// Amount currently held.
    pub fn stored(&self) -> u32 {
        self.stored.map(|s| s.amount).unwrap_or(0)
    }

    /// Remaining capacity.
    pub fn needed(&self) -> u32 {
        self.max_gas - self.stored()
    }

    /// The held stack, if any.
    pub fn gas(&self) -> Option<GasStack> {
        self.stored
    }

    pub fn gas_type(&self) -> Option<GasTypeId> {
        self.stored.map(|s| s.gas)
    }

    pub fn is_empty(&self) -> bool {
        self.stored.is_none()
    }

    pub fn is_full(&self) -> bool {
        self.stored() >= self.max_gas
    }

    /// Deposit gas. Returns the amount accepted.
    ///
    /// Accepts `min(stack.amount, needed)` when the tank is empty or already
    /// holds `stack.gas`, and nothing on a type mismatch.
    #[must_use = "returns the amount accepted, which may be less than offered"]
    pub fn receive(&mut self, stack: GasStack, commit: bool) -> u32 {
        if stack.is_empty() || !self.can_receive_type(stack.gas) {
            return 0;
        }
        let accepted = stack.amount.min(self.needed());
        if commit && accepted > 0 {
            let amount = self.stored() + accepted;
            self.stored = Some(GasStack::new(stack.gas, amount));
        }
        accepted
    }

    /// Withdraw up to `amount` of the held gas.
    #[must_use = "returns the gas actually drawn"]
    pub fn draw(&mut self, amount: u32, commit: bool) -> Option<GasStack> {
        let held = self.stored?;
        let taken = amount.min(held.amount);
        if taken == 0 {
            return None;
        }
        if commit {
            let remaining = held.amount - taken;
            self.stored = (remaining > 0).then(|| held.with_amount(remaining));
        }
        Some(held.with_amount(taken))
    }

    /// Whether the tank is empty or already holds `gas`, ignoring headroom.
    pub fn can_receive_type(&self, gas: GasTypeId) -> bool {
        match self.stored {
            None => true,
            Some(held) => held.gas == gas,
        }
    }

    /// Whether a deposit of `gas` could be accepted right now. `None` asks
    /// about any gas.
    pub fn can_receive(&self, gas: Option<GasTypeId>) -> bool {
        if self.needed() == 0 {
            return false;
        }
        match (self.stored, gas) {
            (Some(held), Some(gas)) => held.gas == gas,
            _ => true,
        }
    }

    /// Whether gas of type `gas` can be drawn. `None` asks about any gas.
    pub fn can_draw(&self, gas: Option<GasTypeId>) -> bool {
        match (self.stored, gas) {
            (None, _) => false,
            (Some(held), Some(gas)) => held.gas == gas,
            (Some(_), None) => true,
        }
    }

    /// Replace the tank contents wholesale, e.g. when restoring a save or
    /// applying a replicated packet. A zero-amount stack empties the tank.
    pub fn set_gas(&mut self, stack: Option<GasStack>) -> Result<(), GasError> {
        Self::check_fits(stack, self.max_gas)?;
        self.stored = stack.filter(|s| !s.is_empty());
        Ok(())
    }

    /// Validate that `stack` would fit a tank of `capacity` without touching
    /// any tank. Lets callers restore several tanks all-or-nothing.
    pub fn check_fits(stack: Option<GasStack>, capacity: u32) -> Result<(), GasError> {
        match stack {
            Some(s) if s.amount > capacity => Err(GasError::OverCapacity {
                gas: s.gas,
                amount: s.amount,
                capacity,
            }),
            _ => Ok(()),
        }
    }
}
