//! The chemical infuser: two input tanks, one output tank, and the per-tick
//! processing loop that combines them.
//!
//! # Tick order
//!
//! 1. Discharge the charge item into the energy buffer.
//! 2. Refill the left and right tanks from their item slots.
//! 3. Fill the output item from the center tank.
//! 4. Resolve the conversion rule for the held input pair (cached).
//! 5. Gate: rule feasible once, one operation's energy available, operate
//!    gate open.
//! 6. Apply as many operations as every cap allows, in one step.
//! 7. Push up to the emission cap from the center tank into the output sink.
//! 8. Remember the energy reading for the next tick's activity check and
//!    latch the redstone signal for pulse detection.
//!
//! Every failure inside a tick is a zero-operation outcome reported through
//! [`TickReport`]; `tick` itself cannot fail.

use crate::cache::RuleCache;
use crate::capability::{
    Capability, GasHandler, OutputSink, SustainedData, SustainedTag, TankManager,
    TubeConnection, UpgradeInfo,
};
use crate::catalog::RuleLookup;
use crate::config::{ActivityPolicy, InfuserConfig};
use crate::energy::EnergyBuffer;
use crate::fixed::{Fixed64, fixed64_to_f64, whole_quotient};
use crate::gas::{GasError, GasStack, GasTank};
use crate::gate::{OperateGate, RedstoneGate};
use crate::id::{GasTypeId, RecipeId};
use crate::recipe::{ChemicalPair, ConversionRule};
use crate::redstone::RedstoneState;
use crate::serialize::{
    DeserializeError, SerializeError, TankRecord, decode_record, encode_record,
};
use crate::side::{Direction, TankSlot, reservoir_for_side};
use crate::slot::{ChargeSource, GasItemSink, GasItemSource, MachineSlots};
use crate::sync::{DeltaPacket, SyncError, SyncPacket, SyncTracker};
use crate::upgrade::UpgradeComponent;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MachineError {
    #[error("machines cannot face {0:?}")]
    InvalidFacing(Direction),
    #[error("invalid machine configuration: {0}")]
    InvalidConfig(&'static str),
}

// ---------------------------------------------------------------------------
// Tick context and report
// ---------------------------------------------------------------------------

/// Everything outside the machine that one tick touches.
pub struct TickContext<'a> {
    pub catalog: &'a dyn RuleLookup,
    pub slots: MachineSlots<'a>,
    pub sink: &'a mut dyn OutputSink,
    pub gate: &'a dyn OperateGate,
}

impl<'a> TickContext<'a> {
    /// A context with empty item slots and the redstone gate.
    pub fn new(catalog: &'a dyn RuleLookup, sink: &'a mut dyn OutputSink) -> Self {
        Self {
            catalog,
            slots: MachineSlots::default(),
            sink,
            gate: &RedstoneGate,
        }
    }

    pub fn with_slots(mut self, slots: MachineSlots<'a>) -> Self {
        self.slots = slots;
        self
    }

    pub fn with_gate(mut self, gate: &'a dyn OperateGate) -> Self {
        self.gate = gate;
        self
    }
}

/// Why a tick performed no operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleReason {
    /// An input tank is empty or the catalog has no rule for the pair.
    NoRule,
    /// Not enough of either input for one operation.
    MissingReagents,
    /// The center tank cannot take one operation's output.
    OutputFull,
    /// Less energy stored than one operation costs.
    NoEnergy,
    /// The operate gate is closed.
    GateClosed,
}

/// Result of one [`ChemicalInfuser::tick`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub applications: u32,
    pub idle: Option<IdleReason>,
    pub refilled_left: u32,
    pub refilled_right: u32,
    /// Gas moved from the center tank into the output item.
    pub filled_item: u32,
    /// Gas pushed into the output sink.
    pub emitted: Option<GasStack>,
    pub energy_charged: Fixed64,
    pub energy_used: Fixed64,
    /// Whether the `active` flag flipped this tick.
    pub state_changed: bool,
}

// ---------------------------------------------------------------------------
// Throughput
// ---------------------------------------------------------------------------

/// Number of operations to perform this tick: the minimum of the speed
/// cap, both reagent caps, the output headroom cap, and the energy cap.
///
/// Every cap is a saturating integer; an energy cost of zero does not limit.
pub fn compute_throughput(
    speed_multiplier: u32,
    rule: &ConversionRule,
    left: &GasTank,
    right: &GasTank,
    center: &GasTank,
    energy: Fixed64,
    cost: Fixed64,
) -> u32 {
    speed_multiplier
        .min(rule.max_applications(left, right, center))
        .min(whole_quotient(energy, cost))
}

// ---------------------------------------------------------------------------
// Machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ChemicalInfuser {
    left: GasTank,
    right: GasTank,
    center: GasTank,
    energy: EnergyBuffer,
    upgrades: UpgradeComponent,
    redstone: RedstoneState,
    facing: Direction,
    config: InfuserConfig,
    rule_cache: RuleCache,
    active: bool,
    prev_energy: Fixed64,
    last_energy_used: Fixed64,
    sync: SyncTracker,
}

impl Default for ChemicalInfuser {
    fn default() -> Self {
        Self::from_valid_config(InfuserConfig::default())
    }
}

impl ChemicalInfuser {
    pub fn new(config: InfuserConfig) -> Result<Self, MachineError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: InfuserConfig) -> Self {
        Self {
            left: GasTank::new(config.tank_capacity),
            right: GasTank::new(config.tank_capacity),
            center: GasTank::new(config.tank_capacity),
            energy: EnergyBuffer::new(config.max_energy),
            upgrades: UpgradeComponent::default(),
            redstone: RedstoneState::default(),
            facing: Direction::North,
            config,
            rule_cache: RuleCache::Empty,
            active: false,
            prev_energy: Fixed64::ZERO,
            last_energy_used: Fixed64::ZERO,
            sync: SyncTracker::new(),
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn config(&self) -> &InfuserConfig {
        &self.config
    }

    pub fn left(&self) -> &GasTank {
        &self.left
    }

    pub fn right(&self) -> &GasTank {
        &self.right
    }

    pub fn center(&self) -> &GasTank {
        &self.center
    }

    pub fn tank(&self, slot: TankSlot) -> &GasTank {
        match slot {
            TankSlot::Left => &self.left,
            TankSlot::Right => &self.right,
            TankSlot::Center => &self.center,
        }
    }

    fn tank_mut(&mut self, slot: TankSlot) -> &mut GasTank {
        match slot {
            TankSlot::Left => &mut self.left,
            TankSlot::Right => &mut self.right,
            TankSlot::Center => &mut self.center,
        }
    }

    pub fn energy(&self) -> &EnergyBuffer {
        &self.energy
    }

    pub fn upgrades(&self) -> &UpgradeComponent {
        &self.upgrades
    }

    pub fn upgrades_mut(&mut self) -> &mut UpgradeComponent {
        &mut self.upgrades
    }

    pub fn redstone(&self) -> &RedstoneState {
        &self.redstone
    }

    pub fn redstone_mut(&mut self) -> &mut RedstoneState {
        &mut self.redstone
    }

    /// Feed this tick's redstone signal.
    pub fn set_powered(&mut self, powered: bool) {
        self.redstone.set_powered(powered);
    }

    pub fn facing(&self) -> Direction {
        self.facing
    }

    /// Turn the machine. Only horizontal facings are allowed.
    pub fn set_facing(&mut self, facing: Direction) -> Result<(), MachineError> {
        if !facing.is_horizontal() {
            return Err(MachineError::InvalidFacing(facing));
        }
        self.facing = facing;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Energy spent by the most recent tick.
    pub fn last_energy_used(&self) -> Fixed64 {
        self.last_energy_used
    }

    /// The rule resolved for the current input pair, if cached.
    pub fn current_rule(&self) -> Option<(RecipeId, &ConversionRule)> {
        self.rule_cache.current()
    }

    pub fn rule_cache(&self) -> &RuleCache {
        &self.rule_cache
    }

    // -- external mutation --------------------------------------------------

    /// Add energy from an external source. Returns the energy accepted.
    #[must_use = "returns the energy accepted, which may be less than offered"]
    pub fn fund_energy(&mut self, amount: Fixed64) -> Fixed64 {
        self.energy.fund(amount)
    }

    /// Deposit directly into a tank, bypassing side rules. Host-side setup
    /// and item interactions use this; pipes go through [`GasHandler`].
    #[must_use = "returns the amount accepted, which may be less than offered"]
    pub fn fill(&mut self, slot: TankSlot, stack: GasStack) -> u32 {
        let accepted = self.tank_mut(slot).receive(stack, true);
        if accepted > 0 {
            self.sync.mark_tank(slot);
        }
        accepted
    }

    /// Empty one tank entirely, returning what it held.
    pub fn dump(&mut self, slot: TankSlot) -> Option<GasStack> {
        let tank = self.tank_mut(slot);
        let amount = tank.stored();
        let held = tank.draw(amount, true);
        if held.is_some() {
            self.sync.mark_tank(slot);
        }
        held
    }

    // -- tick ---------------------------------------------------------------

    pub fn tick(&mut self, ctx: &mut TickContext<'_>) -> TickReport {
        let mut report = TickReport {
            energy_charged: self.charge(ctx.slots.charge.as_deref_mut()),
            ..TickReport::default()
        };

        report.refilled_left = refill(&mut self.left, ctx.slots.left_input.as_deref_mut());
        if report.refilled_left > 0 {
            self.sync.mark_tank(TankSlot::Left);
        }
        report.refilled_right = refill(&mut self.right, ctx.slots.right_input.as_deref_mut());
        if report.refilled_right > 0 {
            self.sync.mark_tank(TankSlot::Right);
        }
        report.filled_item = fill_item(&mut self.center, ctx.slots.output.as_deref_mut());
        if report.filled_item > 0 {
            self.sync.mark_tank(TankSlot::Center);
        }

        let observed = ChemicalPair::from_tanks(&self.left, &self.right);
        let rule = self.rule_cache.resolve(observed, ctx.catalog);

        let cost = self.config.energy_per_operation;
        let applications = match rule {
            None => {
                report.idle = Some(IdleReason::NoRule);
                0
            }
            Some(rule) => match self.gate_check(&rule, ctx.gate) {
                Err(reason) => {
                    report.idle = Some(reason);
                    0
                }
                Ok(()) => compute_throughput(
                    self.upgrades.speed_multiplier(),
                    &rule,
                    &self.left,
                    &self.right,
                    &self.center,
                    self.energy.stored(),
                    cost,
                ),
            },
        };

        let applied = applications > 0
            && rule.is_some_and(|rule| {
                rule.apply(
                    applications,
                    &mut self.left,
                    &mut self.right,
                    &mut self.center,
                )
            });

        let was_active = self.active;
        let energy_used = if applied {
            report.applications = applications;
            self.sync.mark_tank(TankSlot::Left);
            self.sync.mark_tank(TankSlot::Right);
            self.sync.mark_tank(TankSlot::Center);
            self.active = true;
            self.energy
                .debit(cost.saturating_mul(Fixed64::saturating_from_num(applications)))
        } else {
            match self.config.activity_policy {
                ActivityPolicy::EnergyEdge => {
                    if self.prev_energy >= self.energy.stored() {
                        self.active = false;
                    }
                }
                ActivityPolicy::Strict => self.active = false,
            }
            Fixed64::ZERO
        };
        report.energy_used = energy_used;
        if self.last_energy_used != energy_used {
            self.last_energy_used = energy_used;
            self.sync.mark_energy();
        }
        if self.active != was_active {
            report.state_changed = true;
            self.sync.mark_active();
            tracing::debug!(active = self.active, "infuser activity changed");
        }

        report.emitted = self.emit(ctx.sink);
        self.prev_energy = self.energy.stored();
        self.redstone.advance();

        tracing::trace!(
            applications = report.applications,
            idle = ?report.idle,
            "infuser tick"
        );
        report
    }

    fn charge(&mut self, source: Option<&mut (dyn ChargeSource + '_)>) -> Fixed64 {
        let Some(source) = source else {
            return Fixed64::ZERO;
        };
        let free = self.energy.free();
        if free <= Fixed64::ZERO {
            return Fixed64::ZERO;
        }
        let given = source.discharge(free);
        self.energy.fund(given)
    }

    fn gate_check(&self, rule: &ConversionRule, gate: &dyn OperateGate) -> Result<(), IdleReason> {
        if !rule.feasible(1, &self.left, &self.right, &self.center) {
            let output = rule.output();
            let output_blocked = !self.center.can_receive_type(output.gas)
                || self.center.needed() < output.amount;
            return Err(if output_blocked {
                IdleReason::OutputFull
            } else {
                IdleReason::MissingReagents
            });
        }
        if self.energy.stored() < self.config.energy_per_operation {
            return Err(IdleReason::NoEnergy);
        }
        if !gate.may_operate(self) {
            return Err(IdleReason::GateClosed);
        }
        Ok(())
    }

    fn emit(&mut self, sink: &mut (dyn OutputSink + '_)) -> Option<GasStack> {
        let held = self.center.gas()?;
        let offered = held.with_amount(held.amount.min(self.config.gas_output));
        let accepted = sink.offer(offered).min(offered.amount);
        let drawn = self.center.draw(accepted, true)?;
        self.sync.mark_tank(TankSlot::Center);
        Some(drawn)
    }

    // -- capabilities -------------------------------------------------------

    /// Whether `cap` is offered on `side`.
    pub fn supports(&self, cap: Capability, side: Direction) -> bool {
        match cap {
            Capability::GasHandler | Capability::TubeConnection => {
                reservoir_for_side(self.facing, side).is_some()
            }
            Capability::TankManager | Capability::UpgradeInfo | Capability::SustainedData => true,
        }
    }

    pub fn gas_handler(&mut self, side: Direction) -> Option<&mut dyn GasHandler> {
        if self.supports(Capability::GasHandler, side) {
            Some(self)
        } else {
            None
        }
    }

    pub fn tube_connection(&self, side: Direction) -> Option<&dyn TubeConnection> {
        if self.supports(Capability::TubeConnection, side) {
            Some(self)
        } else {
            None
        }
    }

    // -- persistence --------------------------------------------------------

    pub fn to_record(&self) -> TankRecord {
        TankRecord::from_tanks(&self.left, &self.right, &self.center)
    }

    /// Replace all three tanks. Nothing changes unless every stack fits.
    pub fn restore(&mut self, record: &TankRecord) -> Result<(), GasError> {
        record.check_fits(self.config.tank_capacity)?;
        self.left.set_gas(record.left)?;
        self.right.set_gas(record.right)?;
        self.center.set_gas(record.center)?;
        self.rule_cache.invalidate();
        self.sync.mark_all();
        Ok(())
    }

    pub fn save(&self) -> Result<Vec<u8>, SerializeError> {
        encode_record(&self.to_record())
    }

    pub fn load(&mut self, data: &[u8]) -> Result<(), DeserializeError> {
        let record = decode_record(data, self.config.tank_capacity)?;
        self.restore(&record)?;
        Ok(())
    }

    // -- replication --------------------------------------------------------

    pub fn sync_packet(&self) -> SyncPacket {
        SyncPacket {
            energy_used: fixed64_to_f64(self.last_energy_used),
            left: self.left.gas(),
            center: self.center.gas(),
            right: self.right.gas(),
        }
    }

    /// Overwrite observer-side state from a full packet. All-or-nothing.
    pub fn apply_sync_packet(&mut self, packet: &SyncPacket) -> Result<(), SyncError> {
        let capacity = self.config.tank_capacity;
        GasTank::check_fits(packet.left, capacity)?;
        GasTank::check_fits(packet.center, capacity)?;
        GasTank::check_fits(packet.right, capacity)?;
        let energy_used = energy_from_wire(packet.energy_used)?;

        self.left.set_gas(packet.left)?;
        self.center.set_gas(packet.center)?;
        self.right.set_gas(packet.right)?;
        self.last_energy_used = energy_used;
        Ok(())
    }

    /// Whether any replicated field changed since the last sync.
    pub fn is_dirty(&self) -> bool {
        self.sync.is_dirty()
    }

    pub fn mark_synced(&mut self) {
        self.sync.mark_clean();
    }

    /// Build a packet of the fields changed since the last sync and mark
    /// them clean. `None` when nothing changed.
    pub fn take_delta(&mut self) -> Option<DeltaPacket> {
        if !self.sync.is_dirty() {
            return None;
        }
        let fields = self.sync;
        let tank = |slot: TankSlot| fields.is_tank_dirty(slot).then(|| self.tank(slot).gas());
        let delta = DeltaPacket {
            left: tank(TankSlot::Left),
            center: tank(TankSlot::Center),
            right: tank(TankSlot::Right),
            active: fields.is_active_dirty().then_some(self.active),
            energy_used: fields
                .is_energy_dirty()
                .then(|| fixed64_to_f64(self.last_energy_used)),
        };
        self.sync.mark_clean();
        Some(delta)
    }

    /// Apply a delta on the observer side. All-or-nothing.
    pub fn apply_delta(&mut self, delta: &DeltaPacket) -> Result<(), SyncError> {
        let capacity = self.config.tank_capacity;
        for tank in [delta.left, delta.center, delta.right].into_iter().flatten() {
            GasTank::check_fits(tank, capacity)?;
        }
        let energy_used = delta.energy_used.map(energy_from_wire).transpose()?;

        if let Some(stack) = delta.left {
            self.left.set_gas(stack)?;
        }
        if let Some(stack) = delta.center {
            self.center.set_gas(stack)?;
        }
        if let Some(stack) = delta.right {
            self.right.set_gas(stack)?;
        }
        if let Some(active) = delta.active {
            self.active = active;
        }
        if let Some(energy_used) = energy_used {
            self.last_energy_used = energy_used;
        }
        Ok(())
    }
}

fn energy_from_wire(value: f64) -> Result<Fixed64, SyncError> {
    if !value.is_finite() {
        return Err(SyncError::InvalidEnergy(value));
    }
    Fixed64::checked_from_num(value).ok_or(SyncError::InvalidEnergy(value))
}

/// Move gas from an input item into its tank. Returns the amount moved.
fn refill(tank: &mut GasTank, source: Option<&mut (dyn GasItemSource + '_)>) -> u32 {
    let Some(source) = source else {
        return 0;
    };
    if source.is_empty() || tank.is_full() {
        return 0;
    }
    let Some(extracted) = source.try_extract(tank.gas_type(), tank.needed()) else {
        return 0;
    };
    let accepted = tank.receive(extracted, true);
    if accepted < extracted.amount {
        tracing::warn!(
            extracted = extracted.amount,
            accepted,
            gas = ?extracted.gas,
            "input item returned gas the tank could not hold"
        );
    }
    accepted
}

/// Move gas from the center tank into the output item. Returns the amount.
fn fill_item(center: &mut GasTank, item: Option<&mut (dyn GasItemSink + '_)>) -> u32 {
    let (Some(item), Some(held)) = (item, center.gas()) else {
        return 0;
    };
    let agreed = item.try_insert(held, false).min(held.amount);
    if agreed == 0 {
        return 0;
    }
    // Only what the item actually took leaves the tank.
    let committed = item.try_insert(held.with_amount(agreed), true).min(agreed);
    center.draw(committed, true).map_or(0, |drawn| drawn.amount)
}

// ---------------------------------------------------------------------------
// Capability impls
// ---------------------------------------------------------------------------

impl GasHandler for ChemicalInfuser {
    fn can_receive_gas(&self, side: Direction, kind: GasTypeId) -> bool {
        match reservoir_for_side(self.facing, side) {
            Some(TankSlot::Left) => self.left.can_receive(Some(kind)),
            Some(TankSlot::Right) => self.right.can_receive(Some(kind)),
            _ => false,
        }
    }

    fn receive_gas(&mut self, side: Direction, stack: GasStack, commit: bool) -> u32 {
        let slot = match reservoir_for_side(self.facing, side) {
            Some(slot @ (TankSlot::Left | TankSlot::Right)) => slot,
            _ => return 0,
        };
        let accepted = self.tank_mut(slot).receive(stack, commit);
        if commit && accepted > 0 {
            self.sync.mark_tank(slot);
        }
        accepted
    }

    fn can_draw_gas(&self, side: Direction, kind: Option<GasTypeId>) -> bool {
        reservoir_for_side(self.facing, side) == Some(TankSlot::Center)
            && self.center.can_draw(kind)
    }

    fn draw_gas(&mut self, side: Direction, amount: u32, commit: bool) -> Option<GasStack> {
        if reservoir_for_side(self.facing, side) != Some(TankSlot::Center) {
            return None;
        }
        let drawn = self.center.draw(amount, commit)?;
        if commit {
            self.sync.mark_tank(TankSlot::Center);
        }
        Some(drawn)
    }
}

impl TubeConnection for ChemicalInfuser {
    fn can_tube_connect(&self, side: Direction) -> bool {
        reservoir_for_side(self.facing, side).is_some()
    }
}

impl TankManager for ChemicalInfuser {
    fn tanks(&self) -> [&GasTank; 3] {
        [&self.left, &self.right, &self.center]
    }
}

impl UpgradeInfo for ChemicalInfuser {
    fn speed_multiplier(&self) -> u32 {
        self.upgrades.speed_multiplier()
    }

    fn upgrade_info(&self) -> Vec<String> {
        self.upgrades.info_lines()
    }
}

impl SustainedData for ChemicalInfuser {
    fn write_sustained(&self, tag: &mut SustainedTag) {
        tag.tanks = Some(self.to_record());
    }

    fn read_sustained(&mut self, tag: &SustainedTag) -> Result<(), GasError> {
        match &tag.tanks {
            Some(record) => self.restore(record),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::NullSink;
    use crate::gate::AlwaysOpen;
    use crate::redstone::RedstoneControl;
    use crate::slot::{Battery, GasCanister};
    use crate::test_utils::*;

    fn fx(v: i32) -> Fixed64 {
        Fixed64::from_num(v)
    }

    fn run(m: &mut ChemicalInfuser) -> TickReport {
        let catalog = sample_catalog();
        let mut sink = NullSink;
        m.tick(&mut TickContext::new(&catalog, &mut sink))
    }

    // -----------------------------------------------------------------------
    // Test 1: Throughput takes the tightest cap
    // -----------------------------------------------------------------------
    #[test]
    fn throughput_takes_minimum_cap() {
        let catalog = sample_catalog();
        let (_, rule) = catalog
            .lookup(ChemicalPair::new(hydrogen(), oxygen()))
            .unwrap();
        let mut left = GasTank::new(10_000);
        let mut right = GasTank::new(10_000);
        let center = GasTank::new(10_000);
        let _ = left.receive(GasStack::new(hydrogen(), 100), true);
        let _ = right.receive(GasStack::new(oxygen(), 100), true);

        // speed cap
        assert_eq!(
            compute_throughput(1, rule, &left, &right, &center, fx(1000), fx(10)),
            1
        );
        // energy cap
        assert_eq!(
            compute_throughput(8, rule, &left, &right, &center, fx(15), fx(10)),
            1
        );
        // reagent cap: 100 hydrogen / 2
        assert_eq!(
            compute_throughput(256, rule, &left, &right, &center, fx(100_000), fx(1)),
            50
        );
        // no energy
        assert_eq!(
            compute_throughput(8, rule, &left, &right, &center, fx(9), fx(10)),
            0
        );
    }

    // -----------------------------------------------------------------------
    // Test 2: Vertical facing rejected
    // -----------------------------------------------------------------------
    #[test]
    fn vertical_facing_rejected() {
        let mut m = make_infuser();
        assert_eq!(
            m.set_facing(Direction::Up),
            Err(MachineError::InvalidFacing(Direction::Up))
        );
        assert_eq!(m.facing(), Direction::North);
        m.set_facing(Direction::West).unwrap();
        assert_eq!(m.facing(), Direction::West);
    }

    #[test]
    fn invalid_config_rejected() {
        let cfg = InfuserConfig {
            gas_output: 0,
            ..InfuserConfig::default()
        };
        assert!(matches!(
            ChemicalInfuser::new(cfg),
            Err(MachineError::InvalidConfig(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Test 3: Gas handler is scoped by side
    // -----------------------------------------------------------------------
    #[test]
    fn gas_handler_side_scoping() {
        let mut m = make_infuser();
        // facing north: east = left, west = right, north = center
        let h = GasStack::new(hydrogen(), 100);

        assert!(m.can_receive_gas(Direction::East, hydrogen()));
        assert_eq!(m.receive_gas(Direction::East, h, true), 100);
        assert_eq!(m.left().stored(), 100);

        assert_eq!(m.receive_gas(Direction::North, h, true), 0, "center never accepts");
        assert_eq!(m.receive_gas(Direction::South, h, true), 0, "back is closed");
        assert!(m.draw_gas(Direction::East, 10, true).is_none(), "inputs never provide");

        let _ = m.fill(TankSlot::Center, GasStack::new(water_vapor(), 30));
        assert!(m.can_draw_gas(Direction::North, Some(water_vapor())));
        assert_eq!(
            m.draw_gas(Direction::North, 10, true),
            Some(GasStack::new(water_vapor(), 10))
        );
        assert_eq!(m.center().stored(), 20);
    }

    #[test]
    fn capability_queries() {
        let mut m = make_infuser();
        assert!(m.supports(Capability::GasHandler, Direction::East));
        assert!(!m.supports(Capability::GasHandler, Direction::Up));
        assert!(m.supports(Capability::TankManager, Direction::Up));
        assert!(m.gas_handler(Direction::South).is_none());
        assert!(m.gas_handler(Direction::West).is_some());
        assert!(m.tube_connection(Direction::North).is_some());
        assert!(m.tube_connection(Direction::Down).is_none());
        assert_eq!(m.tanks().len(), 3);
    }

    #[test]
    fn simulated_receive_does_not_mark_dirty() {
        let mut m = make_infuser();
        let _ = m.receive_gas(Direction::East, GasStack::new(hydrogen(), 10), false);
        assert!(!m.is_dirty());
        let _ = m.receive_gas(Direction::East, GasStack::new(hydrogen(), 10), true);
        assert!(m.is_dirty());
    }

    // -----------------------------------------------------------------------
    // Test 4: Refill respects the tank's held kind
    // -----------------------------------------------------------------------
    #[test]
    fn refill_from_items() {
        let catalog = sample_catalog();
        let mut m = make_infuser();
        let _ = m.fill(TankSlot::Left, GasStack::new(hydrogen(), 9_950));

        let mut left_item = GasCanister::filled(1_000, GasStack::new(hydrogen(), 500));
        let mut right_item = GasCanister::filled(1_000, GasStack::new(oxygen(), 500));
        let mut sink = NullSink;
        let report = m.tick(
            &mut TickContext::new(&catalog, &mut sink).with_slots(
                MachineSlots::new()
                    .with_left(&mut left_item)
                    .with_right(&mut right_item),
            ),
        );

        assert_eq!(report.refilled_left, 50);
        assert_eq!(report.refilled_right, 500);
        assert_eq!(left_item.tank().stored(), 450, "excess stays in the item");
        assert!(right_item.tank().is_empty());
    }

    #[test]
    fn refill_skips_mismatched_item() {
        let catalog = sample_catalog();
        let mut m = make_infuser();
        let _ = m.fill(TankSlot::Left, GasStack::new(hydrogen(), 10));

        let mut item = GasCanister::filled(1_000, GasStack::new(chlorine(), 500));
        let mut sink = NullSink;
        let report = m.tick(
            &mut TickContext::new(&catalog, &mut sink)
                .with_slots(MachineSlots::new().with_left(&mut item)),
        );
        assert_eq!(report.refilled_left, 0);
        assert_eq!(item.tank().stored(), 500);
    }

    // -----------------------------------------------------------------------
    // Test 5: Output item and charge slots
    // -----------------------------------------------------------------------
    #[test]
    fn output_item_filled_from_center() {
        let catalog = sample_catalog();
        let mut m = make_infuser();
        let _ = m.fill(TankSlot::Center, GasStack::new(water_vapor(), 300));

        let mut canister = GasCanister::new(100);
        let mut sink = NullSink;
        let report = m.tick(
            &mut TickContext::new(&catalog, &mut sink)
                .with_slots(MachineSlots::new().with_output(&mut canister)),
        );
        assert_eq!(report.filled_item, 100);
        assert_eq!(canister.tank().stored(), 100);
        assert_eq!(m.center().stored(), 200);
    }

    /// Promises more in the dry run than it takes on commit.
    struct ShortchangingItem {
        promised: u32,
        taken: u32,
        received: u32,
    }

    impl GasItemSink for ShortchangingItem {
        fn try_insert(&mut self, stack: GasStack, commit: bool) -> u32 {
            if !commit {
                return stack.amount.min(self.promised);
            }
            let accepted = stack.amount.min(self.taken);
            self.received += accepted;
            accepted
        }
    }

    #[test]
    fn output_item_shortfall_stays_in_center() {
        let catalog = sample_catalog();
        let mut m = make_infuser();
        let _ = m.fill(TankSlot::Center, GasStack::new(water_vapor(), 300));

        let mut item = ShortchangingItem {
            promised: 100,
            taken: 30,
            received: 0,
        };
        let mut sink = NullSink;
        let report = m.tick(
            &mut TickContext::new(&catalog, &mut sink)
                .with_slots(MachineSlots::new().with_output(&mut item)),
        );
        assert_eq!(report.filled_item, 30);
        assert_eq!(item.received, 30);
        assert_eq!(m.center().stored(), 270, "no gas lost to the shortfall");
    }

    #[test]
    fn battery_charges_energy() {
        let catalog = sample_catalog();
        let mut m = make_infuser();
        let mut battery = Battery::new(fx(1_000), fx(400));
        let mut sink = NullSink;
        let report = m.tick(
            &mut TickContext::new(&catalog, &mut sink)
                .with_slots(MachineSlots::new().with_charge(&mut battery)),
        );
        assert_eq!(report.energy_charged, fx(400));
        assert_eq!(m.energy().stored(), fx(400));
        assert_eq!(battery.charge, fx(600));
    }

    // -----------------------------------------------------------------------
    // Test 6: Idle reasons
    // -----------------------------------------------------------------------
    #[test]
    fn idle_reasons() {
        let mut m = make_infuser();
        assert_eq!(run(&mut m).idle, Some(IdleReason::NoRule));

        fill_inputs(&mut m, hydrogen(), 1, oxygen(), 100);
        assert_eq!(run(&mut m).idle, Some(IdleReason::MissingReagents));

        let _ = m.fill(TankSlot::Left, GasStack::new(hydrogen(), 100));
        assert_eq!(run(&mut m).idle, Some(IdleReason::NoEnergy));

        fund(&mut m, 1_000);
        let _ = m.fill(TankSlot::Center, GasStack::new(chlorine(), 1));
        assert_eq!(run(&mut m).idle, Some(IdleReason::OutputFull));

        m.dump(TankSlot::Center);
        m.redstone_mut().control = RedstoneControl::High;
        assert_eq!(run(&mut m).idle, Some(IdleReason::GateClosed));

        m.set_powered(true);
        let report = run(&mut m);
        assert_eq!(report.idle, None);
        assert_eq!(report.applications, 1);
    }

    #[test]
    fn custom_gate_overrides_redstone() {
        let catalog = sample_catalog();
        let mut m = make_infuser();
        fill_inputs(&mut m, hydrogen(), 100, oxygen(), 100);
        fund(&mut m, 1_000);
        m.redstone_mut().control = RedstoneControl::High;

        let mut sink = NullSink;
        let report = m.tick(&mut TickContext::new(&catalog, &mut sink).with_gate(&AlwaysOpen));
        assert_eq!(report.applications, 1);

        let closed = |_: &ChemicalInfuser| false;
        let report = m.tick(&mut TickContext::new(&catalog, &mut sink).with_gate(&closed));
        assert_eq!(report.idle, Some(IdleReason::GateClosed));
    }

    #[test]
    fn pulse_runs_one_tick_per_rising_edge() {
        let mut m = make_infuser();
        fill_inputs(&mut m, hydrogen(), 100, oxygen(), 100);
        fund(&mut m, 1_000);
        m.redstone_mut().control = RedstoneControl::Pulse;

        m.set_powered(true);
        let applications: u32 = (0..3).map(|_| run(&mut m).applications).sum();
        assert_eq!(applications, 1, "a held signal is a single pulse");

        m.set_powered(false);
        assert_eq!(run(&mut m).idle, Some(IdleReason::GateClosed));
        m.set_powered(true);
        assert_eq!(run(&mut m).applications, 1);
        assert_eq!(run(&mut m).idle, Some(IdleReason::GateClosed));
    }

    // -----------------------------------------------------------------------
    // Test 7: Activity policy
    // -----------------------------------------------------------------------
    #[test]
    fn energy_edge_keeps_active_while_funded() {
        let mut m = make_infuser();
        fill_inputs(&mut m, hydrogen(), 2, oxygen(), 1);
        fund(&mut m, 1_000);

        let report = run(&mut m);
        assert_eq!(report.applications, 1);
        assert!(m.is_active());

        // Inputs are gone; energy rose since last tick.
        fund(&mut m, 100);
        let report = run(&mut m);
        assert_eq!(report.applications, 0);
        assert!(m.is_active(), "rising energy suppresses the fall");
        assert!(!report.state_changed);

        let report = run(&mut m);
        assert!(!m.is_active());
        assert!(report.state_changed);
    }

    #[test]
    fn strict_policy_drops_immediately() {
        let config = InfuserConfig {
            activity_policy: ActivityPolicy::Strict,
            ..scenario_config()
        };
        let mut m = ChemicalInfuser::new(config).unwrap();
        fill_inputs(&mut m, hydrogen(), 2, oxygen(), 1);
        fund(&mut m, 1_000);

        run(&mut m);
        assert!(m.is_active());

        fund(&mut m, 100);
        let report = run(&mut m);
        assert!(!m.is_active());
        assert!(report.state_changed);
    }

    #[test]
    fn last_energy_used_resets_when_idle() {
        let mut m = make_infuser();
        fill_inputs(&mut m, hydrogen(), 2, oxygen(), 1);
        fund(&mut m, 1_000);
        run(&mut m);
        assert_eq!(m.last_energy_used(), fx(10));
        run(&mut m);
        assert_eq!(m.last_energy_used(), Fixed64::ZERO);
    }

    // -----------------------------------------------------------------------
    // Test 8: Rule cache follows the input pair
    // -----------------------------------------------------------------------
    #[test]
    fn rule_cache_follows_inputs() {
        let catalog = sample_catalog();
        let mut m = make_infuser();
        fill_inputs(&mut m, hydrogen(), 100, chlorine(), 100);
        run(&mut m);
        assert_eq!(
            m.current_rule().map(|(id, _)| id),
            catalog.rule_id("hydrogen_chloride")
        );

        m.dump(TankSlot::Right);
        run(&mut m);
        assert!(m.current_rule().is_none());

        let _ = m.fill(TankSlot::Right, GasStack::new(oxygen(), 100));
        run(&mut m);
        assert_eq!(
            m.current_rule().map(|(id, _)| id),
            catalog.rule_id("water_vapor")
        );
    }

    #[test]
    fn swapped_inputs_resolve_same_rule() {
        let mut m = make_infuser();
        fill_inputs(&mut m, oxygen(), 100, hydrogen(), 100);
        fund(&mut m, 1_000);
        let report = run(&mut m);
        assert_eq!(report.applications, 1);
        assert_eq!(m.left().stored(), 99, "oxygen side draws 1");
        assert_eq!(m.right().stored(), 98, "hydrogen side draws 2");
        assert_eq!(m.center().gas(), Some(GasStack::new(water_vapor(), 3)));
    }

    // -----------------------------------------------------------------------
    // Test 9: Emission
    // -----------------------------------------------------------------------
    #[test]
    fn emission_capped_per_tick() {
        let catalog = sample_catalog();
        let mut m = make_infuser();
        let _ = m.fill(TankSlot::Center, GasStack::new(water_vapor(), 1_000));

        let mut sink = CollectingSink::default();
        let report = m.tick(&mut TickContext::new(&catalog, &mut sink));
        assert_eq!(report.emitted, Some(GasStack::new(water_vapor(), 256)));
        assert_eq!(m.center().stored(), 744);
        assert_eq!(sink.total(), 256);
    }

    #[test]
    fn emission_draws_only_what_sink_accepts() {
        let catalog = sample_catalog();
        let mut m = make_infuser();
        let _ = m.fill(TankSlot::Center, GasStack::new(water_vapor(), 1_000));

        let mut sink = CollectingSink::with_limit(40);
        let report = m.tick(&mut TickContext::new(&catalog, &mut sink));
        assert_eq!(report.emitted, Some(GasStack::new(water_vapor(), 40)));
        assert_eq!(m.center().stored(), 960);

        let mut closed = NullSink;
        let report = m.tick(&mut TickContext::new(&catalog, &mut closed));
        assert_eq!(report.emitted, None);
        assert_eq!(m.center().stored(), 960);
    }

    // -----------------------------------------------------------------------
    // Test 10: Persistence and replication
    // -----------------------------------------------------------------------
    #[test]
    fn save_load_round_trip() {
        let mut m = make_infuser();
        fill_inputs(&mut m, hydrogen(), 1_234, oxygen(), 56);
        let _ = m.fill(TankSlot::Center, GasStack::new(water_vapor(), 9));

        let bytes = m.save().unwrap();
        let mut restored = make_infuser();
        restored.load(&bytes).unwrap();
        assert_eq!(restored.to_record(), m.to_record());
    }

    #[test]
    fn restore_is_all_or_nothing() {
        let mut m = make_infuser();
        fill_inputs(&mut m, hydrogen(), 10, oxygen(), 10);
        let before = m.to_record();

        let bad = TankRecord {
            left: None,
            right: None,
            center: Some(GasStack::new(water_vapor(), 10_001)),
        };
        assert!(m.restore(&bad).is_err());
        assert_eq!(m.to_record(), before);
    }

    #[test]
    fn sustained_data_round_trip() {
        let mut m = make_infuser();
        fill_inputs(&mut m, hydrogen(), 10, oxygen(), 20);
        let mut tag = SustainedTag::default();
        m.write_sustained(&mut tag);

        let mut placed = make_infuser();
        placed.read_sustained(&tag).unwrap();
        assert_eq!(placed.to_record(), m.to_record());

        placed.read_sustained(&SustainedTag::default()).unwrap();
        assert_eq!(placed.to_record(), m.to_record());
    }

    #[test]
    fn sync_packet_applies_to_observer() {
        let mut m = make_infuser();
        fill_inputs(&mut m, hydrogen(), 100, oxygen(), 100);
        fund(&mut m, 1_000);
        run(&mut m);

        let bytes = m.sync_packet().encode();
        let mut observer = make_infuser();
        observer
            .apply_sync_packet(&SyncPacket::decode(&bytes).unwrap())
            .unwrap();
        assert_eq!(observer.to_record(), m.to_record());
        assert_eq!(observer.last_energy_used(), fx(10));
    }

    #[test]
    fn delta_only_carries_changed_tanks() {
        let mut m = make_infuser();
        m.mark_synced();
        assert!(m.take_delta().is_none());

        let _ = m.fill(TankSlot::Right, GasStack::new(oxygen(), 5));
        let delta = m.take_delta().unwrap();
        assert_eq!(delta.right, Some(Some(GasStack::new(oxygen(), 5))));
        assert_eq!(delta.left, None);
        assert_eq!(delta.center, None);
        assert!(!m.is_dirty());

        let mut observer = make_infuser();
        observer.apply_delta(&delta).unwrap();
        assert_eq!(observer.right().gas(), Some(GasStack::new(oxygen(), 5)));
    }

    #[test]
    fn over_capacity_packet_rejected() {
        let mut observer = make_infuser();
        let packet = SyncPacket {
            energy_used: 0.0,
            left: Some(GasStack::new(hydrogen(), 5)),
            center: None,
            right: Some(GasStack::new(oxygen(), 20_000)),
        };
        assert!(matches!(
            observer.apply_sync_packet(&packet),
            Err(SyncError::Gas(GasError::OverCapacity { .. }))
        ));
        assert!(observer.left().is_empty(), "nothing applied");
    }
}
