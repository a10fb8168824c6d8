//! Cached rule resolution.
//!
//! A machine looks up its rule every tick, but the answer only changes when
//! the pair of gas types in its input tanks changes. [`RuleCache`] keeps the
//! last answer together with the pair it was resolved for and requeries the
//! catalog only when the observed pair no longer matches.

use crate::catalog::RuleLookup;
use crate::id::RecipeId;
use crate::recipe::{ChemicalPair, ConversionRule};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RuleCache {
    #[default]
    Empty,
    Cached {
        id: RecipeId,
        rule: ConversionRule,
        observed: ChemicalPair,
    },
}

impl RuleCache {
    /// The rule for the currently observed input pair.
    ///
    /// `observed` is `None` when either input tank is empty, which always
    /// clears the cache. A pair that matches the cached one in either order
    /// is a hit; anything else requeries `catalog`.
    pub fn resolve(
        &mut self,
        observed: Option<ChemicalPair>,
        catalog: &dyn RuleLookup,
    ) -> Option<ConversionRule> {
        let Some(observed) = observed else {
            self.invalidate();
            return None;
        };

        if let RuleCache::Cached {
            rule,
            observed: cached,
            ..
        } = self
            && cached.matches(&observed)
        {
            return Some(*rule);
        }

        match catalog.lookup(observed) {
            Some((id, rule)) => {
                tracing::debug!(?id, ?observed, "rule cache resolved");
                *self = RuleCache::Cached {
                    id,
                    rule: *rule,
                    observed,
                };
                Some(*rule)
            }
            None => {
                self.invalidate();
                None
            }
        }
    }

    /// The cached rule, if any, without consulting a catalog.
    pub fn current(&self) -> Option<(RecipeId, &ConversionRule)> {
        match self {
            RuleCache::Empty => None,
            RuleCache::Cached { id, rule, .. } => Some((*id, rule)),
        }
    }

    pub fn invalidate(&mut self) {
        if let RuleCache::Cached { id, .. } = self {
            tracing::debug!(?id, "rule cache invalidated");
        }
        *self = RuleCache::Empty;
    }
}
