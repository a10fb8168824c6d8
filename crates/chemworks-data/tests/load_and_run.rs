//! Loads a chemistry directory from disk and drives an infuser with it.

use chemworks_core::capability::NullSink;
use chemworks_core::fixed::Fixed64;
use chemworks_core::gas::GasStack;
use chemworks_core::machine::{ChemicalInfuser, TickContext};
use chemworks_core::test_utils::{fill_inputs, fund};
use chemworks_data::load_chemistry;
use std::fs;

// ===========================================================================
// Test 1: Loaded rules and settings drive a tick
// ===========================================================================

#[test]
fn loaded_chemistry_runs_an_infuser() {
    let dir = std::env::temp_dir().join(format!("chemworks_data_run_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();

    fs::write(
        dir.join("gases.ron"),
        r#"[(name: "hydrogen"), (name: "oxygen"), (name: "water_vapor")]"#,
    )
    .unwrap();
    fs::write(
        dir.join("rules.ron"),
        r#"[(name: "water_vapor", left: ("hydrogen", 2), right: ("oxygen", 1), output: ("water_vapor", 3))]"#,
    )
    .unwrap();
    fs::write(
        dir.join("machine.toml"),
        "energy_per_operation = 10.0\nactivity_policy = \"strict\"\n",
    )
    .unwrap();

    let chemistry = load_chemistry(&dir).unwrap();
    let _ = fs::remove_dir_all(&dir);

    let hydrogen = chemistry.catalog.gas_id("hydrogen").unwrap();
    let oxygen = chemistry.catalog.gas_id("oxygen").unwrap();
    let water_vapor = chemistry.catalog.gas_id("water_vapor").unwrap();

    let mut m = ChemicalInfuser::new(chemistry.config).unwrap();
    m.upgrades_mut().add_speed(2);
    // oxygen on the left: the rule matches in swapped orientation
    fill_inputs(&mut m, oxygen, 100, hydrogen, 100);
    fund(&mut m, 1_000);

    let mut sink = NullSink;
    let report = m.tick(&mut TickContext::new(&chemistry.catalog, &mut sink));

    assert_eq!(report.applications, 4);
    assert_eq!(m.center().gas(), Some(GasStack::new(water_vapor, 12)));
    assert_eq!(m.left().stored(), 96);
    assert_eq!(m.right().stored(), 92);
    assert_eq!(m.energy().stored(), Fixed64::from_num(960));
    assert!(m.is_active());
}
