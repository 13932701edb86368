//! Immutable definition snapshots.

use std::collections::BTreeMap;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::currency::{
    validate_definitions, CompositeCurrency, CurrencyDefinition, CurrencyId, PrimitiveCurrency,
};
use crate::error::{CurrencyError, Result};
use crate::index::DependencyIndex;

/// One generation of currency definitions plus its dependency index.
///
/// Never mutated after construction. Every evaluation pass reads exactly one
/// `DefinitionSet`; edits produce a new one with a higher generation.
#[derive(Debug, Clone)]
pub struct DefinitionSet {
    generation: u64,
    definitions: BTreeMap<CurrencyId, CurrencyDefinition>,
    by_name: BTreeMap<String, CurrencyId>,
    index: DependencyIndex,
    fingerprint: String,
}

impl DefinitionSet {
    /// An empty set at generation 0.
    pub fn empty() -> Self {
        Self {
            generation: 0,
            definitions: BTreeMap::new(),
            by_name: BTreeMap::new(),
            index: DependencyIndex::new(),
            fingerprint: fingerprint_of(&BTreeMap::new()).unwrap_or_default(),
        }
    }

    /// Validate `definitions` and build generation 0.
    ///
    /// Blocking issues (duplicates, zero counts, cycles) are rejected;
    /// warnings such as unknown references are accepted.
    pub fn new(definitions: Vec<CurrencyDefinition>) -> Result<Self> {
        Self::with_generation(0, definitions)
    }

    /// Validate `definitions` and build the given generation.
    pub fn with_generation(generation: u64, definitions: Vec<CurrencyDefinition>) -> Result<Self> {
        validate_definitions(&definitions).into_result()?;
        Self::unchecked(generation, definitions)
    }

    /// Build without validating.
    ///
    /// For data loaded from elsewhere that must still be evaluated even
    /// if it is malformed. Cycles and unknown references become evaluation
    /// diagnostics; a later duplicate id replaces an earlier one.
    pub fn unchecked(generation: u64, definitions: Vec<CurrencyDefinition>) -> Result<Self> {
        let mut by_id = BTreeMap::new();
        for def in definitions {
            by_id.insert(def.id().clone(), def);
        }
        let by_name = by_id
            .values()
            .map(|d| (d.name().to_string(), d.id().clone()))
            .collect();
        let index = DependencyIndex::build(by_id.values());
        let fingerprint = fingerprint_of(&by_id)?;

        Ok(Self {
            generation,
            definitions: by_id,
            by_name,
            index,
            fingerprint,
        })
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Hex SHA-256 over the canonical JSON of every definition, in id order.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn get(&self, id: &CurrencyId) -> Option<&CurrencyDefinition> {
        self.definitions.get(id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&CurrencyDefinition> {
        self.by_name.get(name).and_then(|id| self.definitions.get(id))
    }

    pub fn contains(&self, id: &CurrencyId) -> bool {
        self.definitions.contains_key(id)
    }

    /// All definitions in id order.
    pub fn definitions(&self) -> impl Iterator<Item = &CurrencyDefinition> {
        self.definitions.values()
    }

    /// Definitions as an owned list, in id order.
    pub fn to_vec(&self) -> Vec<CurrencyDefinition> {
        self.definitions.values().cloned().collect()
    }

    pub fn list_primitives(&self) -> Vec<&PrimitiveCurrency> {
        self.definitions.values().filter_map(|d| d.as_primitive()).collect()
    }

    pub fn list_composites(&self) -> Vec<&CompositeCurrency> {
        self.definitions.values().filter_map(|d| d.as_composite()).collect()
    }

    pub fn index(&self) -> &DependencyIndex {
        &self.index
    }

    pub fn by_id(&self) -> &BTreeMap<CurrencyId, CurrencyDefinition> {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

fn fingerprint_of(definitions: &BTreeMap<CurrencyId, CurrencyDefinition>) -> Result<String> {
    #[derive(Serialize)]
    struct Canonical<'a> {
        definitions: Vec<&'a CurrencyDefinition>,
    }

    let canonical = Canonical {
        definitions: definitions.values().collect(),
    };
    let bytes = serde_json::to_vec(&canonical)
        .map_err(|e| CurrencyError::SerializationError(e.to_string()))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}
