//! Currency engine — evaluate every currency for a person on a date.
//!
//! One call to [`CurrencyEngine::evaluate`] is one evaluation pass: it reads
//! the person's history once, walks every definition against a single
//! [`DefinitionSet`] snapshot, and memoizes per-currency outcomes so shared
//! subtrees are computed once. Outcomes computed under a cycle or depth cut
//! depend on the path that reached them, so they are cached only for the
//! top-level walk that produced them. Either way each currency is resolved
//! at most once per walk, which bounds the work even on cyclic input.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::currency::{
    CompositeCurrency, CurrencyDefinition, CurrencyId, CurrencyKind, LogicNode, PrimitiveCurrency,
};
use crate::error::{CurrencyError, Result};
use crate::expiry::compute_expiry;
use crate::history::{EventHistory, PersonHistory, PersonId};
use crate::logic::{
    aggregate_expiry, evaluate_tree, CurrencyOutcome, Diagnostic, InProgress, ReferenceResolver,
};
use crate::status::{classify_severity, project_satisfied, CurrencyState, Severity};
use crate::store::{DefinitionSet, DefinitionStore};

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Evaluated status of one currency for one person on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonCurrencyStatus {
    pub currency_id: CurrencyId,
    pub currency_name: String,
    pub kind: CurrencyKind,
    pub is_visible: bool,
    pub last_event_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub days_remaining: Option<i64>,
    pub state: CurrencyState,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl PersonCurrencyStatus {
    /// Whether the qualification is held on the evaluation date.
    pub fn is_held(&self) -> bool {
        self.state.is_held()
    }
}

/// Results of a multi-person run against one definition generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchEvaluation {
    pub generation: u64,
    pub fingerprint: String,
    pub evaluation_date: NaiveDate,
    pub results: BTreeMap<PersonId, BTreeMap<String, PersonCurrencyStatus>>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Stateless evaluator bound to one definition snapshot.
///
/// Cheap to clone and safe to share across threads; every call builds its
/// own pass state.
#[derive(Debug, Clone)]
pub struct CurrencyEngine {
    definitions: Arc<DefinitionSet>,
    config: EngineConfig,
}

impl CurrencyEngine {
    pub fn new(definitions: Arc<DefinitionSet>, config: EngineConfig) -> Self {
        Self {
            definitions,
            config,
        }
    }

    /// Bind to the store's current generation.
    pub fn from_store(store: &DefinitionStore, config: EngineConfig) -> Result<Self> {
        Ok(Self::new(store.snapshot()?, config))
    }

    pub fn definitions(&self) -> &Arc<DefinitionSet> {
        &self.definitions
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate every currency for `person` on `as_of`, keyed by currency name.
    pub fn evaluate(
        &self,
        person: &PersonId,
        history: &dyn EventHistory,
        as_of: NaiveDate,
    ) -> BTreeMap<String, PersonCurrencyStatus> {
        self.evaluate_filtered(person, history, as_of, |_| true)
    }

    /// Like [`CurrencyEngine::evaluate`], restricted to visible currencies.
    ///
    /// Hidden currencies still feed the composites that reference them.
    pub fn evaluate_visible(
        &self,
        person: &PersonId,
        history: &dyn EventHistory,
        as_of: NaiveDate,
    ) -> BTreeMap<String, PersonCurrencyStatus> {
        self.evaluate_filtered(person, history, as_of, CurrencyDefinition::is_visible)
    }

    /// Evaluate a single currency.
    pub fn evaluate_currency(
        &self,
        person: &PersonId,
        history: &dyn EventHistory,
        id: &CurrencyId,
        as_of: NaiveDate,
    ) -> Result<PersonCurrencyStatus> {
        let def = self
            .definitions
            .get(id)
            .ok_or_else(|| CurrencyError::NotFound(id.to_string()))?;
        let mut pass = EvaluationPass::new(&self.definitions, &self.config, person, history, as_of);
        let outcome = pass.outcome(id);
        Ok(self.status_for(def, outcome))
    }

    /// Evaluate several persons against this engine's single snapshot.
    pub fn evaluate_batch(
        &self,
        persons: &[PersonId],
        history: &dyn EventHistory,
        as_of: NaiveDate,
    ) -> BatchEvaluation {
        let results = persons
            .iter()
            .map(|p| (p.clone(), self.evaluate(p, history, as_of)))
            .collect();
        BatchEvaluation {
            generation: self.definitions.generation(),
            fingerprint: self.definitions.fingerprint().to_string(),
            evaluation_date: as_of,
            results,
        }
    }

    /// Names of the composites that reference `id`.
    pub fn used_in(&self, id: &CurrencyId) -> Vec<String> {
        self.definitions.index().references_of(id)
    }

    /// Whether saving `proposed` as the tree of `composite_id` would close a cycle.
    pub fn would_create_cycle(&self, composite_id: &CurrencyId, proposed: &LogicNode) -> bool {
        self.definitions
            .index()
            .would_create_cycle(composite_id, proposed)
    }

    // -- internals ----------------------------------------------------------

    fn evaluate_filtered<F>(
        &self,
        person: &PersonId,
        history: &dyn EventHistory,
        as_of: NaiveDate,
        keep: F,
    ) -> BTreeMap<String, PersonCurrencyStatus>
    where
        F: Fn(&CurrencyDefinition) -> bool,
    {
        debug!(
            "evaluating {} currencies for {person} as of {as_of} (generation {})",
            self.definitions.len(),
            self.definitions.generation()
        );

        let mut pass = EvaluationPass::new(&self.definitions, &self.config, person, history, as_of);
        let mut statuses = BTreeMap::new();
        for def in self.definitions.definitions().filter(|d| keep(d)) {
            let outcome = pass.outcome(def.id());
            statuses.insert(def.name().to_string(), self.status_for(def, outcome));
        }

        debug!(
            "evaluated {} statuses for {person} ({} memoized outcomes)",
            statuses.len(),
            pass.memo.len()
        );
        statuses
    }

    fn status_for(&self, def: &CurrencyDefinition, outcome: CurrencyOutcome) -> PersonCurrencyStatus {
        PersonCurrencyStatus {
            currency_id: def.id().clone(),
            currency_name: def.name().to_string(),
            kind: def.kind(),
            is_visible: def.is_visible(),
            last_event_date: outcome.last_event_date,
            expiry_date: outcome.expiry_date,
            days_remaining: outcome.days_remaining,
            state: outcome.state,
            severity: classify_severity(outcome.state, outcome.days_remaining, &self.config.severity),
            diagnostics: outcome.diagnostics,
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation pass
// ---------------------------------------------------------------------------

/// Per-call state: one person's history, the date, and the memo tables.
struct EvaluationPass<'a> {
    definitions: &'a DefinitionSet,
    config: &'a EngineConfig,
    history: PersonHistory,
    as_of: NaiveDate,
    /// Path-independent outcomes, valid for the whole pass.
    memo: HashMap<CurrencyId, CurrencyOutcome>,
    /// Path-dependent outcomes, valid for the current top-level walk only.
    walk_memo: HashMap<CurrencyId, CurrencyOutcome>,
}

impl<'a> EvaluationPass<'a> {
    fn new(
        definitions: &'a DefinitionSet,
        config: &'a EngineConfig,
        person: &PersonId,
        history: &dyn EventHistory,
        as_of: NaiveDate,
    ) -> Self {
        Self {
            definitions,
            config,
            history: PersonHistory::load(person, history),
            as_of,
            memo: HashMap::new(),
            walk_memo: HashMap::new(),
        }
    }

    /// Top-level outcome for `id`, starting from an empty guard.
    fn outcome(&mut self, id: &CurrencyId) -> CurrencyOutcome {
        if let Some(hit) = self.memo.get(id) {
            return hit.clone();
        }

        self.walk_memo.clear();
        let mut guard = InProgress::new(self.config.max_depth);
        if let Err(diagnostic) = guard.enter(id) {
            return unresolved(diagnostic);
        }
        let outcome = self
            .resolve(id, &mut guard)
            .unwrap_or_else(|| unresolved(Diagnostic::UnknownReference { id: id.clone() }));
        guard.exit(id);
        outcome
    }

    fn primitive_outcome(&self, primitive: &PrimitiveCurrency) -> CurrencyOutcome {
        let dates = self.history.matching_dates(primitive, self.as_of);
        let expiry = compute_expiry(primitive, &dates, self.as_of, self.config);

        let diagnostics = if expiry.date_overflow {
            vec![Diagnostic::DateOverflow {
                id: primitive.id.clone(),
            }]
        } else {
            Vec::new()
        };

        CurrencyOutcome {
            satisfied: expiry.satisfied,
            last_event_date: expiry.last_event_date,
            expiry_date: expiry.expiry_date,
            days_remaining: expiry.days_remaining,
            state: expiry.state,
            has_data: expiry.last_event_date.is_some(),
            diagnostics,
            path_dependent: false,
        }
    }

    fn composite_outcome(&mut self, composite: &CompositeCurrency, guard: &mut InProgress) -> CurrencyOutcome {
        let eval = evaluate_tree(&composite.logic_tree, self, guard);

        if eval.satisfied {
            let expiry = aggregate_expiry(&eval.contributing_dates, composite.expiry_calculation);
            let projection = project_satisfied(expiry, self.as_of, self.config.expiring_soon_days);
            CurrencyOutcome {
                satisfied: true,
                last_event_date: eval.contributing_last_events.iter().max().copied(),
                expiry_date: expiry,
                days_remaining: projection.days_remaining,
                state: projection.state,
                has_data: true,
                diagnostics: eval.diagnostics,
                path_dependent: eval.path_dependent,
            }
        } else {
            CurrencyOutcome {
                satisfied: false,
                last_event_date: None,
                expiry_date: None,
                days_remaining: None,
                state: if eval.has_data {
                    CurrencyState::Expired
                } else {
                    CurrencyState::NoData
                },
                has_data: eval.has_data,
                diagnostics: eval.diagnostics,
                path_dependent: eval.path_dependent,
            }
        }
    }
}

impl ReferenceResolver for EvaluationPass<'_> {
    fn resolve(&mut self, id: &CurrencyId, guard: &mut InProgress) -> Option<CurrencyOutcome> {
        if let Some(hit) = self.memo.get(id).or_else(|| self.walk_memo.get(id)) {
            return Some(hit.clone());
        }

        let definitions = self.definitions;
        let outcome = match definitions.get(id)? {
            CurrencyDefinition::Primitive(p) => self.primitive_outcome(p),
            CurrencyDefinition::Composite(c) => self.composite_outcome(c, guard),
        };

        if outcome.path_dependent {
            self.walk_memo.insert(id.clone(), outcome.clone());
        } else {
            self.memo.insert(id.clone(), outcome.clone());
        }
        Some(outcome)
    }
}

fn unresolved(diagnostic: Diagnostic) -> CurrencyOutcome {
    CurrencyOutcome {
        satisfied: false,
        last_event_date: None,
        expiry_date: None,
        days_remaining: None,
        state: CurrencyState::NoData,
        has_data: false,
        path_dependent: diagnostic.is_path_dependent(),
        diagnostics: vec![diagnostic],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
