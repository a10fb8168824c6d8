//! Item adapters: gas-holding items, charge items, and the slot bundle a
//! machine borrows for one tick.

use crate::fixed::Fixed64;
use crate::gas::{GasStack, GasTank};
use crate::id::GasTypeId;
use serde::{Deserialize, Serialize};

/// An item that can give up gas, such as a filled canister.
pub trait GasItemSource {
    fn is_empty(&self) -> bool;

    /// Remove up to `max` gas. `kind = None` accepts whatever the item holds.
    fn try_extract(&mut self, kind: Option<GasTypeId>, max: u32) -> Option<GasStack>;
}

/// An item that can take gas in.
pub trait GasItemSink {
    /// Returns the amount accepted.
    fn try_insert(&mut self, stack: GasStack, commit: bool) -> u32;
}

/// An item that can discharge energy into a machine.
pub trait ChargeSource {
    /// Give up to `max` energy. Returns what was given.
    fn discharge(&mut self, max: Fixed64) -> Fixed64;
}

/// A portable gas container. Works as both a source and a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasCanister {
    tank: GasTank,
}

impl GasCanister {
    pub fn new(capacity: u32) -> Self {
        Self {
            tank: GasTank::new(capacity),
        }
    }

    /// A canister pre-filled with `stack`, capped at `capacity`.
    pub fn filled(capacity: u32, stack: GasStack) -> Self {
        let mut canister = Self::new(capacity);
        let _ = canister.tank.receive(stack, true);
        canister
    }

    pub fn tank(&self) -> &GasTank {
        &self.tank
    }
}

impl GasItemSource for GasCanister {
    fn is_empty(&self) -> bool {
        self.tank.is_empty()
    }

    fn try_extract(&mut self, kind: Option<GasTypeId>, max: u32) -> Option<GasStack> {
        if !self.tank.can_draw(kind) {
            return None;
        }
        self.tank.draw(max, true)
    }
}

impl GasItemSink for GasCanister {
    fn try_insert(&mut self, stack: GasStack, commit: bool) -> u32 {
        self.tank.receive(stack, commit)
    }
}

/// A charge item with a fixed per-tick discharge rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Battery {
    pub charge: Fixed64,
    pub max_output: Fixed64,
}

impl Battery {
    pub fn new(charge: Fixed64, max_output: Fixed64) -> Self {
        Self { charge, max_output }
    }
}

impl ChargeSource for Battery {
    fn discharge(&mut self, max: Fixed64) -> Fixed64 {
        let given = max
            .min(self.max_output)
            .min(self.charge)
            .max(Fixed64::ZERO);
        self.charge -= given;
        given
    }
}

/// Items currently sitting in a machine's slots, borrowed for one tick.
#[derive(Default)]
pub struct MachineSlots<'a> {
    pub left_input: Option<&'a mut dyn GasItemSource>,
    pub right_input: Option<&'a mut dyn GasItemSource>,
    pub output: Option<&'a mut dyn GasItemSink>,
    pub charge: Option<&'a mut dyn ChargeSource>,
}

impl<'a> MachineSlots<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_left(mut self, source: &'a mut dyn GasItemSource) -> Self {
        self.left_input = Some(source);
        self
    }

    pub fn with_right(mut self, source: &'a mut dyn GasItemSource) -> Self {
        self.right_input = Some(source);
        self
    }

    pub fn with_output(mut self, sink: &'a mut dyn GasItemSink) -> Self {
        self.output = Some(sink);
        self
    }

    pub fn with_charge(mut self, source: &'a mut dyn ChargeSource) -> Self {
        self.charge = Some(source);
        self
    }
}
