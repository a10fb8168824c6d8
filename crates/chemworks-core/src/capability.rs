//! Narrow interfaces a machine exposes to its neighbours and host.
//!
//! Each capability is a small trait. The host asks a machine which
//! capabilities it offers on a given side with
//! [`ChemicalInfuser::supports`](crate::machine::ChemicalInfuser::supports)
//! and then borrows the matching trait object.

use crate::gas::{GasStack, GasTank};
use crate::id::GasTypeId;
use crate::serialize::TankRecord;
use crate::side::Direction;
use serde::{Deserialize, Serialize};

/// Capabilities a machine can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    GasHandler,
    TubeConnection,
    TankManager,
    UpgradeInfo,
    SustainedData,
}

/// Side-aware gas transfer, the interface neighbours and pipes use.
///
/// Every mutating call takes a `commit` flag. Callers negotiate with
/// `commit = false` first and then commit the agreed amount.
pub trait GasHandler {
    fn can_receive_gas(&self, side: Direction, kind: GasTypeId) -> bool;

    /// Returns the amount accepted.
    fn receive_gas(&mut self, side: Direction, stack: GasStack, commit: bool) -> u32;

    fn can_draw_gas(&self, side: Direction, kind: Option<GasTypeId>) -> bool;

    fn draw_gas(&mut self, side: Direction, amount: u32, commit: bool) -> Option<GasStack>;
}

pub trait TubeConnection {
    fn can_tube_connect(&self, side: Direction) -> bool;
}

pub trait TankManager {
    /// All tanks, in left, right, center order.
    fn tanks(&self) -> [&GasTank; 3];
}

pub trait UpgradeInfo {
    fn speed_multiplier(&self) -> u32;
    fn upgrade_info(&self) -> Vec<String>;
}

/// Data carried by the item form of a machine when it is picked up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SustainedTag {
    pub tanks: Option<TankRecord>,
}

pub trait SustainedData {
    fn write_sustained(&self, tag: &mut SustainedTag);

    /// Restore from `tag`. A tag without tank data leaves the machine as is.
    fn read_sustained(&mut self, tag: &SustainedTag) -> Result<(), crate::gas::GasError>;
}

// ---------------------------------------------------------------------------
// Output sinks
// ---------------------------------------------------------------------------

/// Where a machine pushes the gas emitted from its output tank each tick.
pub trait OutputSink {
    /// Offer `stack`. Returns the amount taken, which is committed.
    fn offer(&mut self, stack: GasStack) -> u32;
}

/// A sink that accepts nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn offer(&mut self, _stack: GasStack) -> u32 {
        0
    }
}

/// Adapts a neighbour's [`GasHandler`] into an [`OutputSink`], using the
/// simulate-then-commit protocol on the given side.
pub struct HandlerSink<'a> {
    pub handler: &'a mut dyn GasHandler,
    pub side: Direction,
}

impl<'a> HandlerSink<'a> {
    pub fn new(handler: &'a mut dyn GasHandler, side: Direction) -> Self {
        Self { handler, side }
    }
}

impl OutputSink for HandlerSink<'_> {
    fn offer(&mut self, stack: GasStack) -> u32 {
        if !self.handler.can_receive_gas(self.side, stack.gas) {
            return 0;
        }
        let agreed = self.handler.receive_gas(self.side, stack, false);
        if agreed == 0 {
            return 0;
        }
        self.handler
            .receive_gas(self.side, stack.with_amount(agreed), true)
    }
}
