//! Chemworks Core -- the processing core of a two-input chemical infuser.
//!
//! An infuser holds three bounded gas tanks. Each tick it refills the two
//! input tanks from their item slots, looks up the conversion rule for the
//! pair of gases it holds, works out how many times that rule can run under
//! every constraint at once, runs it that many times in a single step, and
//! pushes part of the output tank to a neighbour.
//!
//! # Tick Pipeline
//!
//! Each call to [`machine::ChemicalInfuser::tick`] runs:
//!
//! 1. **Charge** -- Discharge the energy item into the buffer.
//! 2. **Refill** -- Move gas from the input items into the left and right tanks.
//! 3. **Resolve** -- Look up the rule for the held pair, cached until it changes.
//! 4. **Gate** -- Rule feasible once, energy for one operation, gate open.
//! 5. **Apply** -- Run `min(speed, reagents, headroom, energy)` operations.
//! 6. **Emit** -- Offer up to the emission cap to the output sink.
//!
//! ```rust,ignore
//! let catalog = builder.build()?;
//! let mut infuser = ChemicalInfuser::new(InfuserConfig::default())?;
//! let mut sink = NullSink;
//! let report = infuser.tick(&mut TickContext::new(&catalog, &mut sink));
//! ```
//!
//! # Key Types
//!
//! - [`gas::GasTank`] -- Bounded single-kind tank with simulate/commit transfers.
//! - [`recipe::ConversionRule`] -- Validated `a + b -> c` rule with atomic apply.
//! - [`catalog::RuleCatalog`] -- Immutable, order-insensitive rule table.
//! - [`machine::ChemicalInfuser`] -- The machine and its tick algorithm.
//! - [`capability`] -- Narrow traits neighbours use to reach the tanks.
//! - [`sync`] -- Full and delta replication packets for observers.
//! - [`serialize`] -- Versioned tank records via bitcode.
//! - [`site::Site`] -- Several machines ticked together with piped output.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic energy.

pub mod cache;
pub mod capability;
pub mod catalog;
pub mod config;
pub mod energy;
pub mod fixed;
pub mod gas;
pub mod gate;
pub mod id;
pub mod machine;
pub mod recipe;
pub mod redstone;
pub mod serialize;
pub mod side;
pub mod site;
pub mod slot;
pub mod sync;
pub mod upgrade;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
