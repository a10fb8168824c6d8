use crate::machine::ChemicalInfuser;

/// Decides whether a machine may run its rule this tick.
///
/// Consulted after the rule and energy checks pass. A closed gate yields
/// zero applications for the tick; refill and emission still happen.
pub trait OperateGate {
    fn may_operate(&self, machine: &ChemicalInfuser) -> bool;
}

/// Gate driven by the machine's own redstone control mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedstoneGate;

impl OperateGate for RedstoneGate {
    fn may_operate(&self, machine: &ChemicalInfuser) -> bool {
        machine.redstone().can_function()
    }
}

/// Gate that never blocks, ignoring redstone entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOpen;

impl OperateGate for AlwaysOpen {
    fn may_operate(&self, _machine: &ChemicalInfuser) -> bool {
        true
    }
}

impl<F> OperateGate for F
where
    F: Fn(&ChemicalInfuser) -> bool,
{
    fn may_operate(&self, machine: &ChemicalInfuser) -> bool {
        self(machine)
    }
}
