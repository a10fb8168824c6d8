//! Loading pipeline: reads data files, resolves gas names, builds the catalog.
//!
//! A chemistry directory holds up to three files, each in RON, TOML, or JSON:
//!
//! - `gases` (required): the gas types, in registration order.
//! - `rules` (required): conversion rules referring to gases by name.
//! - `machine` (optional): infuser tunables; missing fields keep defaults.

use crate::schema::{GasData, MachineData, RuleData, RuleStackData};
use chemworks_core::catalog::{CatalogError, RuleCatalog, RuleCatalogBuilder};
use chemworks_core::config::InfuserConfig;
use chemworks_core::fixed::Fixed64;
use chemworks_core::gas::GasStack;
use chemworks_core::id::{GasTypeId, RecipeId};
use chemworks_core::machine::MachineError;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The rules parsed but the catalog refused them.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("invalid machine settings in {file}: {source}")]
    InvalidMachine {
        file: PathBuf,
        #[source]
        source: MachineError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// more than one format exists for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if !candidate.exists() {
            continue;
        }
        if let Some(existing) = found {
            return Err(DataLoadError::ConflictingFormats {
                a: existing,
                b: candidate,
            });
        }
        found = Some(candidate);
    }

    Ok(found)
}

/// Like [`find_data_file`], but a missing file is an error.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its extension.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list. TOML files nest the array under `toml_key`; RON and
/// JSON files hold the array at the top level.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    if detect_format(path)? != Format::Toml {
        return deserialize_file(path);
    }

    let content = std::fs::read_to_string(path)?;
    let table: toml::Value = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
    let array = table
        .get(toml_key)
        .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
        .clone();
    array
        .try_into()
        .map_err(|e: toml::de::Error| parse_error(path, e))
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Fail with `DuplicateName` if `name` is already in the map.
pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

// ===========================================================================
// Machine settings
// ===========================================================================

fn energy_setting(value: f64, field: &'static str) -> Result<Fixed64, MachineError> {
    Fixed64::checked_from_num(value).ok_or(MachineError::InvalidConfig(field))
}

/// Overlay the fields present in `data` onto `base` and validate the result.
pub fn apply_machine_data(
    base: InfuserConfig,
    data: &MachineData,
) -> Result<InfuserConfig, MachineError> {
    let mut config = base;
    if let Some(capacity) = data.tank_capacity {
        config.tank_capacity = capacity;
    }
    if let Some(output) = data.gas_output {
        config.gas_output = output;
    }
    if let Some(cost) = data.energy_per_operation {
        config.energy_per_operation =
            energy_setting(cost, "energy_per_operation is not representable")?;
    }
    if let Some(max) = data.max_energy {
        config.max_energy = energy_setting(max, "max_energy is not representable")?;
    }
    if let Some(policy) = data.activity_policy {
        config.activity_policy = policy.into();
    }
    config.validate()?;
    Ok(config)
}

// ===========================================================================
// Full pipeline
// ===========================================================================

/// Everything a chemistry directory defines.
#[derive(Debug)]
pub struct Chemistry {
    pub catalog: RuleCatalog,
    pub config: InfuserConfig,
}

/// Load gases, rules, and optional machine settings from `dir`.
pub fn load_chemistry(dir: &Path) -> Result<Chemistry, DataLoadError> {
    let mut builder = RuleCatalogBuilder::new();

    // Gases
    let gases_path = require_data_file(dir, "gases")?;
    let gases: Vec<GasData> = deserialize_list(&gases_path, "gases")?;
    let mut gas_ids: HashMap<String, GasTypeId> = HashMap::with_capacity(gases.len());
    for gas in &gases {
        check_duplicate(&gas_ids, &gas.name, &gases_path)?;
        let id = builder.register_gas(&gas.name);
        gas_ids.insert(gas.name.clone(), id);
    }

    // Rules
    let rules_path = require_data_file(dir, "rules")?;
    let rules: Vec<RuleData> = deserialize_list(&rules_path, "rules")?;
    let mut rule_ids: HashMap<String, RecipeId> = HashMap::with_capacity(rules.len());
    for rule in &rules {
        check_duplicate(&rule_ids, &rule.name, &rules_path)?;
        let stack = |data: &RuleStackData| -> Result<GasStack, DataLoadError> {
            let gas = resolve_name(&gas_ids, data.gas(), &rules_path, "gas")?;
            Ok(GasStack::new(*gas, data.amount()))
        };
        let id = builder.register_rule(
            &rule.name,
            stack(&rule.left)?,
            stack(&rule.right)?,
            stack(&rule.output)?,
        )?;
        rule_ids.insert(rule.name.clone(), id);
    }

    let catalog = builder.build()?;

    // Machine
    let config = match find_data_file(dir, "machine")? {
        Some(path) => {
            let data: MachineData = deserialize_file(&path)?;
            apply_machine_data(InfuserConfig::default(), &data).map_err(|source| {
                tracing::warn!(file = %path.display(), %source, "rejected machine settings");
                DataLoadError::InvalidMachine { file: path, source }
            })?
        }
        None => InfuserConfig::default(),
    };

    tracing::debug!(
        dir = %dir.display(),
        gases = catalog.gas_count(),
        rules = catalog.rule_count(),
        "chemistry loaded"
    );

    Ok(Chemistry { catalog, config })
}

// ===========================================================================
// Tests
// ===========================================================================
