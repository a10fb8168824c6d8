//! A group of infusers ticked together, with output piped between them.
//!
//! Machines tick one at a time in insertion order. A machine with an
//! emission link pushes its output into the linked machine's
//! [`GasHandler`](crate::capability::GasHandler) on the linked side, using
//! the same simulate-then-commit negotiation a pipe would.

use crate::capability::{Capability, HandlerSink, NullSink};
use crate::catalog::RuleLookup;
use crate::fixed::Ticks;
use crate::id::MachineId;
use crate::machine::{ChemicalInfuser, TickContext, TickReport};
use crate::side::Direction;
use crate::slot::{Battery, ChargeSource, GasCanister, GasItemSink, GasItemSource, MachineSlots};
use slotmap::{SecondaryMap, SlotMap};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SiteError {
    #[error("unknown machine {0:?}")]
    UnknownMachine(MachineId),
    #[error("machine {0:?} cannot emit into itself")]
    SelfLink(MachineId),
    #[error("machine {target:?} accepts no gas on side {side:?}")]
    NoGasHandler { target: MachineId, side: Direction },
}

/// Where a machine's output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmissionLink {
    pub target: MachineId,
    pub side: Direction,
}

/// Items sitting in one machine's slots between ticks.
#[derive(Debug, Clone, Default)]
pub struct MachineItems {
    pub left: Option<GasCanister>,
    pub right: Option<GasCanister>,
    pub output: Option<GasCanister>,
    pub charge: Option<Battery>,
}

impl MachineItems {
    pub fn slots(&mut self) -> MachineSlots<'_> {
        MachineSlots {
            left_input: self.left.as_mut().map(|c| c as &mut dyn GasItemSource),
            right_input: self.right.as_mut().map(|c| c as &mut dyn GasItemSource),
            output: self.output.as_mut().map(|c| c as &mut dyn GasItemSink),
            charge: self.charge.as_mut().map(|b| b as &mut dyn ChargeSource),
        }
    }
}

#[derive(Debug, Default)]
pub struct Site {
    machines: SlotMap<MachineId, ChemicalInfuser>,
    order: Vec<MachineId>,
    links: SecondaryMap<MachineId, EmissionLink>,
    items: SecondaryMap<MachineId, MachineItems>,
    ticks: Ticks,
}

impl Site {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_machine(&mut self, machine: ChemicalInfuser) -> MachineId {
        let id = self.machines.insert(machine);
        self.order.push(id);
        self.items.insert(id, MachineItems::default());
        id
    }

    /// Remove a machine along with every link into or out of it.
    pub fn remove_machine(&mut self, id: MachineId) -> Result<ChemicalInfuser, SiteError> {
        let machine = self
            .machines
            .remove(id)
            .ok_or(SiteError::UnknownMachine(id))?;
        self.order.retain(|&other| other != id);
        self.items.remove(id);
        self.links.remove(id);
        self.links.retain(|_, link| link.target != id);
        Ok(machine)
    }

    pub fn get(&self, id: MachineId) -> Option<&ChemicalInfuser> {
        self.machines.get(id)
    }

    pub fn get_mut(&mut self, id: MachineId) -> Option<&mut ChemicalInfuser> {
        self.machines.get_mut(id)
    }

    pub fn items_mut(&mut self, id: MachineId) -> Option<&mut MachineItems> {
        self.items.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    pub fn tick_count(&self) -> Ticks {
        self.ticks
    }

    /// Route `from`'s output into `target` through `side`. Replaces any
    /// existing link from `from`.
    pub fn link(
        &mut self,
        from: MachineId,
        target: MachineId,
        side: Direction,
    ) -> Result<(), SiteError> {
        if !self.machines.contains_key(from) {
            return Err(SiteError::UnknownMachine(from));
        }
        let target_machine = self
            .machines
            .get(target)
            .ok_or(SiteError::UnknownMachine(target))?;
        if from == target {
            return Err(SiteError::SelfLink(from));
        }
        if !target_machine.supports(Capability::GasHandler, side) {
            return Err(SiteError::NoGasHandler { target, side });
        }
        tracing::debug!(?from, ?target, ?side, "emission link added");
        self.links.insert(from, EmissionLink { target, side });
        Ok(())
    }

    pub fn unlink(&mut self, from: MachineId) -> Option<EmissionLink> {
        self.links.remove(from)
    }

    pub fn link_of(&self, from: MachineId) -> Option<EmissionLink> {
        self.links.get(from).copied()
    }

    /// Tick every machine once, in insertion order.
    pub fn step(&mut self, catalog: &dyn RuleLookup) -> Vec<(MachineId, TickReport)> {
        let mut reports = Vec::with_capacity(self.order.len());

        for &id in &self.order {
            let slots = self
                .items
                .get_mut(id)
                .map(MachineItems::slots)
                .unwrap_or_default();

            let report = match self.links.get(id).copied() {
                Some(link) => {
                    let Some([machine, target]) =
                        self.machines.get_disjoint_mut([id, link.target])
                    else {
                        continue;
                    };
                    let mut sink = HandlerSink::new(target, link.side);
                    machine.tick(&mut TickContext::new(catalog, &mut sink).with_slots(slots))
                }
                None => {
                    let Some(machine) = self.machines.get_mut(id) else {
                        continue;
                    };
                    machine.tick(&mut TickContext::new(catalog, &mut NullSink).with_slots(slots))
                }
            };
            reports.push((id, report));
        }

        self.ticks += 1;
        reports
    }
}
