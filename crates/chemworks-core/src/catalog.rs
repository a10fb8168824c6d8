//! Rule catalog: the frozen table of conversion rules a machine looks up.
//!
//! Built in two phases like the rest of the content tables: gases and rules
//! are registered on a [`RuleCatalogBuilder`], then [`RuleCatalogBuilder::build`]
//! validates every reference and freezes the result into a [`RuleCatalog`].
//! A malformed rule can never reach a machine: zero amounts are rejected by
//! [`ConversionRule::new`] and duplicate input pairs by `build`.

use crate::gas::GasStack;
use crate::id::{GasTypeId, RecipeId};
use crate::recipe::{ChemicalPair, ConversionRule, RuleError};
use std::collections::HashMap;

/// Source of conversion rules for a machine.
///
/// Implementations must be pure and total: unknown pairs return `None`,
/// and `(a, b)` resolves to the same rule as `(b, a)`.
pub trait RuleLookup {
    fn lookup(&self, pair: ChemicalPair) -> Option<(RecipeId, &ConversionRule)>;
}

/// A gas type definition.
#[derive(Debug, Clone)]
pub struct GasDef {
    pub name: String,
}

/// A named conversion rule.
#[derive(Debug, Clone)]
pub struct RuleDef {
    pub name: String,
    pub rule: ConversionRule,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid rule '{name}': {source}")]
    InvalidRule {
        name: String,
        #[source]
        source: RuleError,
    },
    #[error("rules '{first}' and '{second}' share the input pair {pair:?}")]
    DuplicatePair {
        first: String,
        second: String,
        pair: (GasTypeId, GasTypeId),
    },
    #[error("rule '{rule}' references unknown gas {gas:?}")]
    InvalidGasRef { rule: String, gas: GasTypeId },
}

/// Builder for constructing an immutable [`RuleCatalog`].
#[derive(Debug, Default)]
pub struct RuleCatalogBuilder {
    gases: Vec<GasDef>,
    gas_name_to_id: HashMap<String, GasTypeId>,
    rules: Vec<RuleDef>,
    rule_name_to_id: HashMap<String, RecipeId>,
}

impl RuleCatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a gas type. Registering an existing name returns its ID.
    pub fn register_gas(&mut self, name: &str) -> GasTypeId {
        if let Some(&id) = self.gas_name_to_id.get(name) {
            return id;
        }
        let id = GasTypeId(self.gases.len() as u32);
        self.gases.push(GasDef {
            name: name.to_string(),
        });
        self.gas_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Register a rule from its three stacks. Returns its ID.
    pub fn register_rule(
        &mut self,
        name: &str,
        left: GasStack,
        right: GasStack,
        output: GasStack,
    ) -> Result<RecipeId, CatalogError> {
        let rule = ConversionRule::new(left, right, output).map_err(|source| {
            CatalogError::InvalidRule {
                name: name.to_string(),
                source,
            }
        })?;
        Ok(self.add_rule(name, rule))
    }

    /// Register an already-validated rule. Returns its ID.
    pub fn add_rule(&mut self, name: &str, rule: ConversionRule) -> RecipeId {
        let id = RecipeId(self.rules.len() as u32);
        self.rules.push(RuleDef {
            name: name.to_string(),
            rule,
        });
        self.rule_name_to_id.insert(name.to_string(), id);
        id
    }

    pub fn gas_id(&self, name: &str) -> Option<GasTypeId> {
        self.gas_name_to_id.get(name).copied()
    }

    pub fn rule_id(&self, name: &str) -> Option<RecipeId> {
        self.rule_name_to_id.get(name).copied()
    }

    /// Validate gas references and input-pair uniqueness, then freeze.
    pub fn build(self) -> Result<RuleCatalog, CatalogError> {
        let mut by_pair: HashMap<(GasTypeId, GasTypeId), RecipeId> = HashMap::new();

        for (index, def) in self.rules.iter().enumerate() {
            let rule = &def.rule;
            for stack in [rule.left_input(), rule.right_input(), rule.output()] {
                if stack.gas.0 as usize >= self.gases.len() {
                    return Err(CatalogError::InvalidGasRef {
                        rule: def.name.clone(),
                        gas: stack.gas,
                    });
                }
            }

            let key = rule.input_pair().canonical();
            if let Some(existing) = by_pair.get(&key) {
                return Err(CatalogError::DuplicatePair {
                    first: self.rules[existing.0 as usize].name.clone(),
                    second: def.name.clone(),
                    pair: key,
                });
            }
            by_pair.insert(key, RecipeId(index as u32));
        }

        tracing::debug!(
            gases = self.gases.len(),
            rules = self.rules.len(),
            "rule catalog frozen"
        );

        Ok(RuleCatalog {
            gases: self.gases,
            gas_name_to_id: self.gas_name_to_id,
            rules: self.rules,
            rule_name_to_id: self.rule_name_to_id,
            by_pair,
        })
    }
}

/// Immutable rule catalog. Frozen after build(). Safe to share.
#[derive(Debug)]
pub struct RuleCatalog {
    gases: Vec<GasDef>,
    gas_name_to_id: HashMap<String, GasTypeId>,
    rules: Vec<RuleDef>,
    rule_name_to_id: HashMap<String, RecipeId>,
    by_pair: HashMap<(GasTypeId, GasTypeId), RecipeId>,
}

impl RuleCatalog {
    pub fn get_gas(&self, id: GasTypeId) -> Option<&GasDef> {
        self.gases.get(id.0 as usize)
    }

    pub fn get_rule(&self, id: RecipeId) -> Option<&RuleDef> {
        self.rules.get(id.0 as usize)
    }

    pub fn gas_id(&self, name: &str) -> Option<GasTypeId> {
        self.gas_name_to_id.get(name).copied()
    }

    pub fn rule_id(&self, name: &str) -> Option<RecipeId> {
        self.rule_name_to_id.get(name).copied()
    }

    pub fn gas_count(&self) -> usize {
        self.gases.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl RuleLookup for RuleCatalog {
    fn lookup(&self, pair: ChemicalPair) -> Option<(RecipeId, &ConversionRule)> {
        let id = *self.by_pair.get(&pair.canonical())?;
        self.rules.get(id.0 as usize).map(|def| (id, &def.rule))
    }
}
