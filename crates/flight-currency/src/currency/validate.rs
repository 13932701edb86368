//! Definition-set validation.
//!
//! Runs before a definition set is accepted by the store. Issues split into
//! errors, which block a save, and warnings, which the evaluator already
//! tolerates at run time (it reports them as diagnostics instead).

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{CurrencyError, Result};
use crate::index::find_cycles;

use super::types::{CurrencyDefinition, CurrencyId};

/// One problem found in a definition set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    DuplicateId { id: CurrencyId },
    DuplicateName { name: String, id: CurrencyId },
    ZeroRequiredCount { id: CurrencyId },
    ZeroValidityDays { id: CurrencyId },
    Cycle { path: Vec<CurrencyId> },
    UnknownReference { composite: CurrencyId, reference: CurrencyId },
    EmptyGroup { composite: CurrencyId },
    NoEventCodes { id: CurrencyId },
}

impl ValidationIssue {
    /// Errors block a save; everything else is a warning.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ValidationIssue::DuplicateId { .. }
                | ValidationIssue::DuplicateName { .. }
                | ValidationIssue::ZeroRequiredCount { .. }
                | ValidationIssue::ZeroValidityDays { .. }
                | ValidationIssue::Cycle { .. }
        )
    }

    /// Convert into the matching [`CurrencyError`].
    pub fn into_error(self) -> CurrencyError {
        match self {
            ValidationIssue::DuplicateId { id } => CurrencyError::DuplicateId(id.0),
            ValidationIssue::DuplicateName { name, .. } => CurrencyError::DuplicateName(name),
            ValidationIssue::Cycle { path } => CurrencyError::CycleRejected {
                id: path.first().map(|id| id.0.clone()).unwrap_or_default(),
                path: path.into_iter().map(|id| id.0).collect(),
            },
            other => {
                let id = match &other {
                    ValidationIssue::ZeroRequiredCount { id }
                    | ValidationIssue::ZeroValidityDays { id }
                    | ValidationIssue::NoEventCodes { id } => id.0.clone(),
                    ValidationIssue::UnknownReference { composite, .. }
                    | ValidationIssue::EmptyGroup { composite } => composite.0.clone(),
                    _ => String::new(),
                };
                CurrencyError::InvalidDefinition {
                    id,
                    reason: other.to_string(),
                }
            }
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationIssue::DuplicateId { id } => write!(f, "duplicate id '{id}'"),
            ValidationIssue::DuplicateName { name, id } => {
                write!(f, "name '{name}' on '{id}' is already used")
            }
            ValidationIssue::ZeroRequiredCount { id } => {
                write!(f, "'{id}' has required_count 0 (must be at least 1)")
            }
            ValidationIssue::ZeroValidityDays { id } => {
                write!(f, "'{id}' has validity_days 0 (must be positive)")
            }
            ValidationIssue::Cycle { path } => {
                let joined: Vec<&str> = path.iter().map(|id| id.as_str()).collect();
                write!(f, "reference cycle: {}", joined.join(" -> "))
            }
            ValidationIssue::UnknownReference {
                composite,
                reference,
            } => write!(f, "'{composite}' references unknown currency '{reference}'"),
            ValidationIssue::EmptyGroup { composite } => {
                write!(f, "'{composite}' contains an empty logic group")
            }
            ValidationIssue::NoEventCodes { id } => {
                write!(f, "'{id}' has no qualifying event codes")
            }
        }
    }
}

/// Result of validating a definition set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| !i.is_error())
    }

    /// True when no blocking errors were found.
    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    /// `Ok(())` when valid, otherwise the first blocking error.
    pub fn into_result(self) -> Result<()> {
        match self.issues.into_iter().find(|i| i.is_error()) {
            Some(issue) => Err(issue.into_error()),
            None => Ok(()),
        }
    }
}

/// Validate a full definition set.
pub fn validate_definitions(definitions: &[CurrencyDefinition]) -> ValidationReport {
    let mut issues = Vec::new();
    let mut by_id: BTreeMap<CurrencyId, CurrencyDefinition> = BTreeMap::new();
    let mut names: HashMap<&str, &CurrencyId> = HashMap::new();

    for def in definitions {
        if by_id.contains_key(def.id()) {
            issues.push(ValidationIssue::DuplicateId {
                id: def.id().clone(),
            });
            continue;
        }
        if names.insert(def.name(), def.id()).is_some() {
            issues.push(ValidationIssue::DuplicateName {
                name: def.name().to_string(),
                id: def.id().clone(),
            });
        }
        by_id.insert(def.id().clone(), def.clone());
    }

    for def in by_id.values() {
        match def {
            CurrencyDefinition::Primitive(p) => {
                if p.required_count == 0 {
                    issues.push(ValidationIssue::ZeroRequiredCount { id: p.id.clone() });
                }
                if p.validity_days == 0 {
                    issues.push(ValidationIssue::ZeroValidityDays { id: p.id.clone() });
                }
                if p.event_codes.is_empty() {
                    issues.push(ValidationIssue::NoEventCodes { id: p.id.clone() });
                }
            }
            CurrencyDefinition::Composite(c) => {
                for reference in c.logic_tree.referenced_ids() {
                    if !by_id.contains_key(&reference) {
                        issues.push(ValidationIssue::UnknownReference {
                            composite: c.id.clone(),
                            reference,
                        });
                    }
                }
                if c.logic_tree.empty_group_count() > 0 {
                    issues.push(ValidationIssue::EmptyGroup {
                        composite: c.id.clone(),
                    });
                }
            }
        }
    }

    for path in find_cycles(&by_id) {
        issues.push(ValidationIssue::Cycle { path });
    }

    ValidationReport { issues }
}
