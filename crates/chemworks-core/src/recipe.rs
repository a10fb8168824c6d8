//! Conversion rules: two input gases combine into one output gas.

use crate::gas::{GasStack, GasTank};
use crate::id::GasTypeId;
use serde::{Serialize, Deserialize};

// ---------------------------------------------------------------------------
// Input pair
// ---------------------------------------------------------------------------

/// The pair of gas types currently held by the left and right tanks.
///
/// Matching is order-insensitive: `(a, b)` matches `(b, a)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChemicalPair {
    pub left: GasTypeId,
    pub right: GasTypeId,
}

impl ChemicalPair {
    pub fn new(left: GasTypeId, right: GasTypeId) -> Self {
        Self { left, right }
    }

    /// The pair observed in two tanks, or `None` if either is empty.
    pub fn from_tanks(left: &GasTank, right: &GasTank) -> Option<Self> {
        Some(Self::new(left.gas_type()?, right.gas_type()?))
    }

    /// Order-insensitive equality.
    pub fn matches(&self, other: &ChemicalPair) -> bool {
        self == other || self.swapped() == *other
    }

    pub fn swapped(self) -> Self {
        Self::new(self.right, self.left)
    }

    /// Sorted key, identical for both orderings.
    pub fn canonical(self) -> (GasTypeId, GasTypeId) {
        if self.left <= self.right {
            (self.left, self.right)
        } else {
            (self.right, self.left)
        }
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// Which tank feeds which rule input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Left tank supplies `left_input`, right tank supplies `right_input`.
    Direct,
    /// Left tank supplies `right_input`, right tank supplies `left_input`.
    Swapped,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("rule amounts must be positive")]
    ZeroAmount,
    #[error("rule inputs must be two distinct gases, got {0:?} twice")]
    IdenticalInputs(GasTypeId),
}

/// An immutable conversion rule: `left_input + right_input -> output`.
///
/// Constructed only through [`ConversionRule::new`], which rejects zero
/// amounts; every throughput cap divides by these amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ConversionRuleData")]
pub struct ConversionRule {
    left_input: GasStack,
    right_input: GasStack,
    output: GasStack,
}

#[derive(Serialize, Deserialize)]
struct ConversionRuleData {
    left_input: GasStack,
    right_input: GasStack,
    output: GasStack,
}

impl TryFrom<ConversionRuleData> for ConversionRule {
    type Error = RuleError;

    fn try_from(data: ConversionRuleData) -> Result<Self, Self::Error> {
        ConversionRule::new(data.left_input, data.right_input, data.output)
    }
}

impl ConversionRule {
    pub fn new(
        left_input: GasStack,
        right_input: GasStack,
        output: GasStack,
    ) -> Result<Self, RuleError> {
        if left_input.is_empty() || right_input.is_empty() || output.is_empty() {
            return Err(RuleError::ZeroAmount);
        }
        if left_input.gas == right_input.gas {
            return Err(RuleError::IdenticalInputs(left_input.gas));
        }
        Ok(Self {
            left_input,
            right_input,
            output,
        })
    }

    pub fn left_input(&self) -> GasStack {
        self.left_input
    }

    pub fn right_input(&self) -> GasStack {
        self.right_input
    }

    pub fn output(&self) -> GasStack {
        self.output
    }

    pub fn input_pair(&self) -> ChemicalPair {
        ChemicalPair::new(self.left_input.gas, self.right_input.gas)
    }

    /// How the two held gas types line up against this rule's inputs.
    pub fn orientation(&self, left: GasTypeId, right: GasTypeId) -> Option<Orientation> {
        if left == self.left_input.gas && right == self.right_input.gas {
            Some(Orientation::Direct)
        } else if left == self.right_input.gas && right == self.left_input.gas {
            Some(Orientation::Swapped)
        } else {
            None
        }
    }

    /// Per-application amounts drawn from (left tank, right tank).
    fn oriented_inputs(&self, orientation: Orientation) -> (GasStack, GasStack) {
        match orientation {
            Orientation::Direct => (self.left_input, self.right_input),
            Orientation::Swapped => (self.right_input, self.left_input),
        }
    }

    fn tank_orientation(&self, left: &GasTank, right: &GasTank) -> Option<Orientation> {
        self.orientation(left.gas_type()?, right.gas_type()?)
    }

    fn output_headroom(&self, center: &GasTank) -> u32 {
        if center.can_receive_type(self.output.gas) {
            center.needed()
        } else {
            0
        }
    }

    /// Whether `applications` applications fit the current tank contents.
    pub fn feasible(
        &self,
        applications: u32,
        left: &GasTank,
        right: &GasTank,
        center: &GasTank,
    ) -> bool {
        let Some(orientation) = self.tank_orientation(left, right) else {
            return false;
        };
        let (from_left, from_right) = self.oriented_inputs(orientation);
        let fits = |per: u32, available: u32| {
            per.checked_mul(applications)
                .is_some_and(|needed| available >= needed)
        };
        fits(from_left.amount, left.stored())
            && fits(from_right.amount, right.stored())
            && fits(self.output.amount, self.output_headroom(center))
    }

    /// The largest application count the reagents and output headroom allow.
    pub fn max_applications(&self, left: &GasTank, right: &GasTank, center: &GasTank) -> u32 {
        let Some(orientation) = self.tank_orientation(left, right) else {
            return 0;
        };
        let (from_left, from_right) = self.oriented_inputs(orientation);
        (left.stored() / from_left.amount)
            .min(right.stored() / from_right.amount)
            .min(self.output_headroom(center) / self.output.amount)
    }

    /// Perform `applications` applications in one step.
    ///
    /// Returns `false` and leaves every tank untouched if the count is not
    /// [`feasible`](Self::feasible); there is no partial application.
    #[must_use = "returns whether the rule was applied"]
    pub fn apply(
        &self,
        applications: u32,
        left: &mut GasTank,
        right: &mut GasTank,
        center: &mut GasTank,
    ) -> bool {
        if !self.feasible(applications, left, right, center) {
            return false;
        }
        let Some(orientation) = self.tank_orientation(left, right) else {
            return false;
        };
        if applications == 0 {
            return true;
        }
        let (from_left, from_right) = self.oriented_inputs(orientation);
        let _ = left.draw(from_left.amount * applications, true);
        let _ = right.draw(from_right.amount * applications, true);
        let produced = self.output.with_amount(self.output.amount * applications);
        let accepted = center.receive(produced, true);
        debug_assert_eq!(accepted, produced.amount);
        true
    }
}
