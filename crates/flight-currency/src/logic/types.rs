//! Data structures shared by the logic-tree evaluator.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::currency::{CurrencyId, LogicOperator};
use crate::status::CurrencyState;

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// A data-shape problem found while evaluating. Never fatal: the affected
/// branch is unsatisfied and the diagnostic travels up with the result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A reference re-entered a currency already being evaluated.
    /// `path` runs from the first occurrence to the repeated id.
    CycleDetected { path: Vec<CurrencyId> },
    /// A reference names a currency that does not exist.
    UnknownReference { id: CurrencyId },
    /// Nesting exceeded the configured ceiling.
    DepthExceeded { limit: usize },
    /// A group with no children (vacuously unsatisfied).
    EmptyGroup { operator: LogicOperator },
    /// An expiry date could not be represented.
    DateOverflow { id: CurrencyId },
}

impl Diagnostic {
    /// Whether the outcome depends on the path taken to reach it.
    pub fn is_path_dependent(&self) -> bool {
        matches!(
            self,
            Diagnostic::CycleDetected { .. } | Diagnostic::DepthExceeded { .. }
        )
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::CycleDetected { path } => {
                let joined: Vec<&str> = path.iter().map(|id| id.as_str()).collect();
                write!(f, "cycle detected: {}", joined.join(" -> "))
            }
            Diagnostic::UnknownReference { id } => write!(f, "unknown currency reference '{id}'"),
            Diagnostic::DepthExceeded { limit } => {
                write!(f, "evaluation depth exceeded (limit {limit})")
            }
            Diagnostic::EmptyGroup { operator } => write!(f, "empty {operator} group"),
            Diagnostic::DateOverflow { id } => write!(f, "expiry date out of range for '{id}'"),
        }
    }
}

/// Append diagnostics, skipping ones already present.
pub(crate) fn merge_diagnostics(into: &mut Vec<Diagnostic>, from: &[Diagnostic]) {
    for diag in from {
        if !into.contains(diag) {
            into.push(diag.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Fully computed result for one currency (primitive or composite).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyOutcome {
    pub satisfied: bool,
    pub last_event_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub days_remaining: Option<i64>,
    pub state: CurrencyState,
    /// Some history or dated result exists underneath this currency.
    pub has_data: bool,
    pub diagnostics: Vec<Diagnostic>,
    /// Computed under a cycle or depth cut; not safe to reuse elsewhere.
    #[serde(skip)]
    pub path_dependent: bool,
}

/// Result of evaluating a logic group or a single leaf.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeEvaluation {
    pub satisfied: bool,
    /// Expiry dates of satisfied contributing leaves.
    pub contributing_dates: Vec<NaiveDate>,
    /// Last-event dates of satisfied contributing leaves.
    pub contributing_last_events: Vec<NaiveDate>,
    pub has_data: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub path_dependent: bool,
}

impl TreeEvaluation {
    /// An unsatisfied branch carrying one diagnostic.
    pub fn failed(diagnostic: Diagnostic) -> Self {
        Self {
            path_dependent: diagnostic.is_path_dependent(),
            diagnostics: vec![diagnostic],
            ..Self::default()
        }
    }

    /// Leaf evaluation for a resolved currency.
    pub fn from_outcome(outcome: &CurrencyOutcome) -> Self {
        let (contributing_dates, contributing_last_events) = if outcome.satisfied {
            (
                outcome.expiry_date.into_iter().collect(),
                outcome.last_event_date.into_iter().collect(),
            )
        } else {
            (Vec::new(), Vec::new())
        };
        Self {
            satisfied: outcome.satisfied,
            contributing_dates,
            contributing_last_events,
            has_data: outcome.has_data,
            diagnostics: outcome.diagnostics.clone(),
            path_dependent: outcome.path_dependent,
        }
    }
}

// ---------------------------------------------------------------------------
// In-progress guard
// ---------------------------------------------------------------------------

/// Ids currently being evaluated plus the nesting depth, threaded through
/// one recursive walk. Owned by a single pass; never shared across threads.
#[derive(Debug, Clone)]
pub struct InProgress {
    stack: Vec<CurrencyId>,
    members: HashSet<CurrencyId>,
    depth: usize,
    max_depth: usize,
}

impl InProgress {
    pub fn new(max_depth: usize) -> Self {
        Self {
            stack: Vec::new(),
            members: HashSet::new(),
            depth: 0,
            max_depth,
        }
    }

    pub fn contains(&self, id: &CurrencyId) -> bool {
        self.members.contains(id)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Mark `id` as in progress.
    pub fn enter(&mut self, id: &CurrencyId) -> std::result::Result<(), Diagnostic> {
        if self.contains(id) {
            return Err(Diagnostic::CycleDetected {
                path: self.cycle_path(id),
            });
        }
        self.descend()?;
        self.stack.push(id.clone());
        self.members.insert(id.clone());
        Ok(())
    }

    /// Leave `id`. Must pair with a successful [`InProgress::enter`].
    pub fn exit(&mut self, id: &CurrencyId) {
        if self.stack.last() == Some(id) {
            self.stack.pop();
            self.members.remove(id);
        }
        self.ascend();
    }

    /// Enter one nesting level (a group or a reference).
    pub fn descend(&mut self) -> std::result::Result<(), Diagnostic> {
        if self.depth >= self.max_depth {
            return Err(Diagnostic::DepthExceeded {
                limit: self.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Path from the first occurrence of `id` on the stack back to `id`.
    pub fn cycle_path(&self, id: &CurrencyId) -> Vec<CurrencyId> {
        let start = self.stack.iter().position(|s| s == id).unwrap_or(0);
        let mut path: Vec<CurrencyId> = self.stack[start..].to_vec();
        path.push(id.clone());
        path
    }
}
