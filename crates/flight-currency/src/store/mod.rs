//! Definition store: generations of currency definitions behind an `Arc`.
//!
//! The store module provides:
//! - Immutable [`DefinitionSet`] snapshots with a dependency index
//! - Wholesale replacement (save-all) with validation
//! - Single-composite edits guarded against reference cycles
//! - Deletion guarded by the dependency index
//!
//! Readers take a snapshot and keep it for the whole evaluation pass. A
//! writer builds the next generation off to the side and swaps the pointer,
//! so a pass never observes a half-applied edit.

pub mod set;

pub use set::DefinitionSet;

use std::sync::{Arc, RwLock, RwLockWriteGuard};

use log::info;

use crate::currency::{CompositeCurrency, CurrencyDefinition, CurrencyId};
use crate::error::{CurrencyError, Result};

/// Shared holder of the current [`DefinitionSet`] generation.
#[derive(Debug)]
pub struct DefinitionStore {
    current: RwLock<Arc<DefinitionSet>>,
}

impl DefinitionStore {
    /// Create a store seeded with `set`.
    pub fn new(set: DefinitionSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(set)),
        }
    }

    /// Create an empty store at generation 0.
    pub fn empty() -> Self {
        Self::new(DefinitionSet::empty())
    }

    /// The current generation.
    pub fn snapshot(&self) -> Result<Arc<DefinitionSet>> {
        let guard = self
            .current
            .read()
            .map_err(|_| CurrencyError::StorageError("definition store lock poisoned".into()))?;
        Ok(Arc::clone(&guard))
    }

    /// Replace every definition wholesale.
    ///
    /// The new set is validated before the swap; on error the current
    /// generation stays in place. Dropping a currency that a composite in
    /// the new set still references fails with [`CurrencyError::InUse`].
    pub fn save_all(&self, definitions: Vec<CurrencyDefinition>) -> Result<Arc<DefinitionSet>> {
        let mut guard = self.write()?;
        commit(&mut guard, definitions)
    }

    /// Insert or replace one composite.
    ///
    /// Rejected with [`CurrencyError::CycleRejected`] when the new tree would
    /// make the composite reachable from itself, and with
    /// [`CurrencyError::InvalidDefinition`] when the id belongs to a primitive.
    pub fn save_composite(&self, composite: CompositeCurrency) -> Result<Arc<DefinitionSet>> {
        let mut guard = self.write()?;
        if let Some(CurrencyDefinition::Primitive(_)) = guard.get(&composite.id) {
            return Err(CurrencyError::InvalidDefinition {
                id: composite.id.0.clone(),
                reason: "id belongs to a primitive currency".into(),
            });
        }
        if let Some(path) = guard.index().cycle_path(&composite.id, &composite.logic_tree) {
            return Err(CurrencyError::CycleRejected {
                id: composite.id.0.clone(),
                path: path.into_iter().map(|id| id.0).collect(),
            });
        }

        let mut definitions: Vec<CurrencyDefinition> = guard
            .definitions()
            .filter(|d| d.id() != &composite.id)
            .cloned()
            .collect();
        definitions.push(composite.into());
        commit(&mut guard, definitions)
    }

    /// Delete one definition.
    ///
    /// Fails with [`CurrencyError::InUse`] naming every composite that still
    /// references it, and with [`CurrencyError::NotFound`] for unknown ids.
    pub fn delete(&self, id: &CurrencyId) -> Result<Arc<DefinitionSet>> {
        let mut guard = self.write()?;
        let Some(target) = guard.get(id) else {
            return Err(CurrencyError::NotFound(id.to_string()));
        };

        let referenced_by = guard.index().references_of(id);
        if !referenced_by.is_empty() {
            return Err(CurrencyError::InUse {
                id: id.to_string(),
                name: target.name().to_string(),
                referenced_by,
            });
        }

        let remaining: Vec<CurrencyDefinition> =
            guard.definitions().filter(|d| d.id() != id).cloned().collect();
        // Removing an unreferenced definition cannot introduce new problems.
        let next = Arc::new(DefinitionSet::unchecked(guard.generation() + 1, remaining)?);
        info!(
            "definition store: deleted '{}', generation {} -> {}",
            id,
            guard.generation(),
            next.generation()
        );
        *guard = Arc::clone(&next);
        Ok(next)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Arc<DefinitionSet>>> {
        self.current
            .write()
            .map_err(|_| CurrencyError::StorageError("definition store lock poisoned".into()))
    }
}

impl Default for DefinitionStore {
    fn default() -> Self {
        Self::empty()
    }
}

/// Validate `definitions` as the next generation and swap it in under `guard`.
fn commit(
    guard: &mut RwLockWriteGuard<'_, Arc<DefinitionSet>>,
    definitions: Vec<CurrencyDefinition>,
) -> Result<Arc<DefinitionSet>> {
    let next = Arc::new(DefinitionSet::with_generation(
        guard.generation() + 1,
        definitions,
    )?);
    check_dropped_referents(&***guard, &next)?;
    info!(
        "definition store: generation {} -> {} ({} definitions, fingerprint {})",
        guard.generation(),
        next.generation(),
        next.len(),
        next.fingerprint().get(..12).unwrap_or_default()
    );
    **guard = Arc::clone(&next);
    Ok(next)
}

/// A currency leaving the set must not be referenced by anything staying in it.
///
/// References that were already dangling before the save stay warnings.
fn check_dropped_referents(current: &DefinitionSet, next: &DefinitionSet) -> Result<()> {
    for def in current.definitions().filter(|d| !next.contains(d.id())) {
        let referenced_by = next.index().references_of(def.id());
        if !referenced_by.is_empty() {
            return Err(CurrencyError::InUse {
                id: def.id().to_string(),
                name: def.name().to_string(),
                referenced_by,
            });
        }
    }
    Ok(())
}
