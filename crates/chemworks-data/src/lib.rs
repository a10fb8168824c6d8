//! Data-file loading for chemworks: gases, conversion rules, and infuser
//! settings from RON, TOML, or JSON.

pub mod loader;
pub mod schema;

pub use loader::{Chemistry, DataLoadError, load_chemistry};
