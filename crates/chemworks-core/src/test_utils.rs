//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::capability::OutputSink;
use crate::catalog::{RuleCatalog, RuleCatalogBuilder};
use crate::config::InfuserConfig;
use crate::fixed::Fixed64;
use crate::gas::GasStack;
use crate::id::GasTypeId;
use crate::machine::ChemicalInfuser;
use crate::side::TankSlot;

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Gas constructors (registration order of `sample_catalog`)
// ===========================================================================

pub fn hydrogen() -> GasTypeId {
    GasTypeId(0)
}
pub fn chlorine() -> GasTypeId {
    GasTypeId(1)
}
pub fn hydrogen_chloride() -> GasTypeId {
    GasTypeId(2)
}
pub fn oxygen() -> GasTypeId {
    GasTypeId(3)
}
pub fn sulfur_dioxide() -> GasTypeId {
    GasTypeId(4)
}
pub fn sulfur_trioxide() -> GasTypeId {
    GasTypeId(5)
}
pub fn water_vapor() -> GasTypeId {
    GasTypeId(6)
}

// ===========================================================================
// Catalog
// ===========================================================================

/// Three rules:
///
/// - `hydrogen_chloride`: hydrogen 1 + chlorine 1 -> hydrogen chloride 1
/// - `sulfur_trioxide`: oxygen 1 + sulfur dioxide 2 -> sulfur trioxide 2
/// - `water_vapor`: hydrogen 2 + oxygen 1 -> water vapor 3
pub fn sample_catalog() -> RuleCatalog {
    let mut b = RuleCatalogBuilder::new();
    for name in [
        "hydrogen",
        "chlorine",
        "hydrogen_chloride",
        "oxygen",
        "sulfur_dioxide",
        "sulfur_trioxide",
        "water_vapor",
    ] {
        b.register_gas(name);
    }

    let rules = [
        ("hydrogen_chloride", (hydrogen(), 1), (chlorine(), 1), (hydrogen_chloride(), 1)),
        ("sulfur_trioxide", (oxygen(), 1), (sulfur_dioxide(), 2), (sulfur_trioxide(), 2)),
        ("water_vapor", (hydrogen(), 2), (oxygen(), 1), (water_vapor(), 3)),
    ];
    for (name, left, right, output) in rules {
        b.register_rule(
            name,
            GasStack::new(left.0, left.1),
            GasStack::new(right.0, right.1),
            GasStack::new(output.0, output.1),
        )
        .expect("sample rule is valid");
    }
    b.build().expect("sample catalog is valid")
}

// ===========================================================================
// Machine helpers
// ===========================================================================

/// Default tanks and emission cap, 10 energy per operation.
pub fn scenario_config() -> InfuserConfig {
    InfuserConfig {
        energy_per_operation: fixed(10.0),
        ..InfuserConfig::default()
    }
}

/// An infuser facing north with [`scenario_config`].
pub fn make_infuser() -> ChemicalInfuser {
    ChemicalInfuser::new(scenario_config()).expect("scenario config is valid")
}

/// Put gas straight into the left and right tanks.
pub fn fill_inputs(
    machine: &mut ChemicalInfuser,
    left: GasTypeId,
    left_amount: u32,
    right: GasTypeId,
    right_amount: u32,
) {
    let _ = machine.fill(TankSlot::Left, GasStack::new(left, left_amount));
    let _ = machine.fill(TankSlot::Right, GasStack::new(right, right_amount));
}

pub fn fund(machine: &mut ChemicalInfuser, amount: i32) {
    let _ = machine.fund_energy(Fixed64::from_num(amount));
}

// ===========================================================================
// Sinks
// ===========================================================================

/// Records everything offered to it, accepting up to `limit` per offer.
#[derive(Debug, Clone)]
pub struct CollectingSink {
    pub received: Vec<GasStack>,
    pub limit: u32,
}

impl Default for CollectingSink {
    fn default() -> Self {
        Self::with_limit(u32::MAX)
    }
}

impl CollectingSink {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            received: Vec::new(),
            limit,
        }
    }

    pub fn total(&self) -> u64 {
        self.received.iter().map(|s| s.amount as u64).sum()
    }
}

impl OutputSink for CollectingSink {
    fn offer(&mut self, stack: GasStack) -> u32 {
        let accepted = stack.amount.min(self.limit);
        if accepted > 0 {
            self.received.push(stack.with_amount(accepted));
        }
        accepted
    }
}
