//! Property-based tests for the chemworks processing core.
//!
//! Uses proptest to generate random tank contents and operation sequences,
//! then verify the tank and throughput invariants hold.

use chemworks_core::fixed::Fixed64;
use chemworks_core::gas::{GasStack, GasTank};
use chemworks_core::id::GasTypeId;
use chemworks_core::machine::compute_throughput;
use chemworks_core::recipe::ConversionRule;
use chemworks_core::serialize::{TankRecord, decode_record, encode_record};
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

#[derive(Debug, Clone)]
enum TankOp {
    Receive { gas: u32, amount: u32, commit: bool },
    Draw { amount: u32, commit: bool },
}

fn arb_tank_ops(max_ops: usize) -> impl Strategy<Value = Vec<TankOp>> {
    proptest::collection::vec(
        prop_oneof![
            (0..3u32, 0..5_000u32, any::<bool>()).prop_map(|(gas, amount, commit)| {
                TankOp::Receive {
                    gas,
                    amount,
                    commit,
                }
            }),
            (0..5_000u32, any::<bool>()).prop_map(|(amount, commit)| TankOp::Draw {
                amount,
                commit
            }),
        ],
        1..=max_ops,
    )
}

fn arb_stack() -> impl Strategy<Value = Option<GasStack>> {
    proptest::option::of((0..8u32, 1..=10_000u32).prop_map(|(g, a)| GasStack::new(GasTypeId(g), a)))
}

/// Rule (gas 0 : a, gas 1 : b -> gas 2 : c) with positive amounts.
fn arb_rule() -> impl Strategy<Value = ConversionRule> {
    (1..20u32, 1..20u32, 1..20u32).prop_map(|(a, b, c)| {
        ConversionRule::new(
            GasStack::new(GasTypeId(0), a),
            GasStack::new(GasTypeId(1), b),
            GasStack::new(GasTypeId(2), c),
        )
        .unwrap()
    })
}

fn tank(gas: u32, amount: u32) -> GasTank {
    let mut t = GasTank::new(10_000);
    let _ = t.receive(GasStack::new(GasTypeId(gas), amount), true);
    t
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Tank invariants hold after any sequence of receives and draws.
    #[test]
    fn tank_invariants_hold(ops in arb_tank_ops(64)) {
        let mut t = GasTank::new(10_000);
        for op in ops {
            match op {
                TankOp::Receive { gas, amount, commit } => {
                    let before = t.stored();
                    let accepted = t.receive(GasStack::new(GasTypeId(gas), amount), commit);
                    prop_assert!(accepted <= amount);
                    if commit {
                        prop_assert_eq!(t.stored(), before + accepted);
                    } else {
                        prop_assert_eq!(t.stored(), before);
                    }
                }
                TankOp::Draw { amount, commit } => {
                    let before = t.stored();
                    let drawn = t.draw(amount, commit).map(|s| s.amount).unwrap_or(0);
                    prop_assert!(drawn <= amount.min(before));
                    if commit {
                        prop_assert_eq!(t.stored(), before - drawn);
                    }
                }
            }
            prop_assert!(t.stored() <= t.max_gas());
            prop_assert_eq!(t.gas_type().is_none(), t.stored() == 0);
        }
    }

    /// A simulated receive never mutates and is idempotent.
    #[test]
    fn dry_run_receive_idempotent(held in 0..10_000u32, offer in 0..20_000u32, gas in 0..2u32) {
        let mut t = tank(0, held);
        let snapshot = t.clone();
        let first = t.receive(GasStack::new(GasTypeId(gas), offer), false);
        let second = t.receive(GasStack::new(GasTypeId(gas), offer), false);
        prop_assert_eq!(first, second);
        prop_assert_eq!(t, snapshot);
    }

    /// A feasible application count moves exactly the rule's amounts.
    #[test]
    fn feasible_apply_conserves(
        rule in arb_rule(),
        left_amount in 0..2_000u32,
        right_amount in 0..2_000u32,
        n in 0..50u32,
    ) {
        let mut left = tank(0, left_amount);
        let mut right = tank(1, right_amount);
        let mut center = GasTank::new(10_000);

        if rule.feasible(n, &left, &right, &center) {
            prop_assert!(rule.apply(n, &mut left, &mut right, &mut center));
            prop_assert_eq!(left.stored(), left_amount - rule.left_input().amount * n);
            prop_assert_eq!(right.stored(), right_amount - rule.right_input().amount * n);
            prop_assert_eq!(center.stored(), rule.output().amount * n);
        } else {
            let before = (left.clone(), right.clone(), center.clone());
            prop_assert!(!rule.apply(n, &mut left, &mut right, &mut center));
            prop_assert_eq!((left, right, center), before);
        }
    }

    /// A non-zero throughput is always feasible and affordable.
    #[test]
    fn throughput_is_feasible(
        rule in arb_rule(),
        left_amount in 0..10_000u32,
        right_amount in 0..10_000u32,
        center_amount in 0..10_000u32,
        speed in 0..=8u32,
        energy in 0..100_000i32,
        cost in 1..500i32,
    ) {
        let left = tank(0, left_amount);
        let right = tank(1, right_amount);
        let center = tank(2, center_amount);
        let n = compute_throughput(
            1 << speed, &rule, &left, &right, &center,
            Fixed64::from_num(energy), Fixed64::from_num(cost),
        );
        prop_assert!(n <= 1 << speed);
        prop_assert!(n == 0 || rule.feasible(n, &left, &right, &center));
        prop_assert!(Fixed64::from_num(cost) * Fixed64::from_num(n) <= Fixed64::from_num(energy));
    }

    /// More stock never lowers throughput; higher cost never raises it.
    #[test]
    fn throughput_monotone(
        rule in arb_rule(),
        left_amount in 0..5_000u32,
        right_amount in 0..5_000u32,
        extra in 0..5_000u32,
        speed in 0..=8u32,
        energy in 0..10_000i32,
        cost in 1..200i32,
        extra_cost in 0..200i32,
    ) {
        let center = GasTank::new(10_000);
        let e = Fixed64::from_num(energy);
        let run = |l: u32, r: u32, c: i32| compute_throughput(
            1 << speed, &rule, &tank(0, l), &tank(1, r), &center, e, Fixed64::from_num(c),
        );

        let base = run(left_amount, right_amount, cost);
        prop_assert!(run(left_amount + extra, right_amount, cost) >= base);
        prop_assert!(run(left_amount, right_amount + extra, cost) >= base);
        prop_assert!(run(left_amount, right_amount, cost + extra_cost) <= base);
    }

    /// Tank records survive encode and decode.
    #[test]
    fn record_round_trip(left in arb_stack(), right in arb_stack(), center in arb_stack()) {
        let record = TankRecord { left, right, center };
        let bytes = encode_record(&record).unwrap();
        prop_assert_eq!(decode_record(&bytes, 10_000).unwrap(), record);
    }
}
