//! Integration test: full end-to-end workflow.
//!
//! Tests the complete lifecycle:
//! 1. Define primitive and composite currencies
//! 2. Record person events
//! 3. Evaluate statuses on a date
//! 4. Query the dependency index
//! 5. Guard edits against cycles and deletes against referents
//! 6. Persist and reload definitions and history

use std::sync::Arc;

use chrono::NaiveDate;

use flight_currency::storage::{load_definitions, load_history, save_definitions, save_history};
use flight_currency::time::parse_date;
use flight_currency::{
    CompositeCurrency, CurrencyDefinition, CurrencyEngine, CurrencyError, CurrencyState,
    DefinitionSet, DefinitionStore, Diagnostic, EngineConfig, ExpiryCalculation, InMemoryHistory,
    LogicNode, PersonEventRecord, PersonId, PrimitiveCurrency,
};

fn d(s: &str) -> NaiveDate {
    parse_date(s).unwrap()
}

fn night() -> CurrencyDefinition {
    PrimitiveCurrency::new("night", "Night Currency", 90)
        .event_code("NIGHT-SORTIE")
        .into()
}

fn instrument() -> CurrencyDefinition {
    PrimitiveCurrency::new("if", "IF Currency", 90)
        .event_code("IF-SORTIE")
        .into()
}

fn person() -> PersonId {
    PersonId::new("p1")
}

/// Night current until 2024-04-09, IF lapsed on 2024-02-15.
fn history() -> InMemoryHistory {
    let mut h = InMemoryHistory::new();
    h.append(PersonEventRecord::new("p1", "NIGHT-SORTIE", d("2024-01-10")));
    h.append(PersonEventRecord::new("p1", "IF-SORTIE", d("2023-11-17")));
    h
}

fn engine_for(defs: Vec<CurrencyDefinition>) -> CurrencyEngine {
    let set = DefinitionSet::new(defs).expect("definitions should validate");
    CurrencyEngine::new(Arc::new(set), EngineConfig::default())
}

// ── Example scenarios ─────────────────────────────────────────────────────────

#[test]
fn scenario_1_night_currency() {
    let engine = engine_for(vec![night()]);
    let out = engine.evaluate(&person(), &history(), d("2024-03-01"));

    let s = &out["Night Currency"];
    assert_eq!(s.expiry_date, Some(d("2024-04-09")));
    assert_eq!(s.days_remaining, Some(39));
    assert_eq!(s.state, CurrencyState::Current);
}

#[test]
fn scenario_2_and_fails_on_lapsed_child() {
    let combat = CompositeCurrency::new("combat", "Combat Ready", LogicNode::all_of(["night", "if"]));
    let engine = engine_for(vec![night(), instrument(), combat.into()]);
    let out = engine.evaluate(&person(), &history(), d("2024-03-01"));

    assert_eq!(out["IF Currency"].expiry_date, Some(d("2024-02-15")));
    assert_eq!(out["IF Currency"].state, CurrencyState::Expired);
    assert_eq!(out["Combat Ready"].state, CurrencyState::Expired);
}

#[test]
fn scenario_3_or_takes_satisfied_branch_only() {
    let combat = CompositeCurrency::new("combat", "Combat Ready", LogicNode::any_of(["night", "if"]));
    let engine = engine_for(vec![night(), instrument(), combat.into()]);
    let out = engine.evaluate(&person(), &history(), d("2024-03-01"));

    assert_eq!(out["Combat Ready"].state, CurrencyState::Current);
    assert_eq!(out["Combat Ready"].expiry_date, Some(d("2024-04-09")));
}

#[test]
fn scenario_4_nested_and_with_expired_leaf() {
    let sim: CurrencyDefinition = PrimitiveCurrency::new("sim", "Simulator", 180)
        .event_code("SIM")
        .into();
    // A = IF (expired), B = night, C = sim
    let tree = LogicNode::all_of(["if"]).group(LogicNode::any_of(["night", "sim"]));
    let c = CompositeCurrency::new("nested", "Nested", tree);
    let engine = engine_for(vec![night(), instrument(), sim, c.into()]);

    let mut h = history();
    h.append(PersonEventRecord::new("p1", "SIM", d("2024-02-20")));
    let out = engine.evaluate(&person(), &h, d("2024-03-01"));

    assert_eq!(out["Nested"].state, CurrencyState::Expired);
}

#[test]
fn scenario_5_delete_referenced_fails() {
    let a: CurrencyDefinition = PrimitiveCurrency::new("a", "A", 30).event_code("A").into();
    let b: CurrencyDefinition = PrimitiveCurrency::new("b", "B", 30).event_code("B").into();
    let x = CompositeCurrency::new("x", "X", LogicNode::any_of(["a", "b"]));
    let store = DefinitionStore::new(DefinitionSet::new(vec![a, b, x.into()]).unwrap());

    match store.delete(&"b".into()) {
        Err(CurrencyError::InUse { referenced_by, .. }) => {
            assert_eq!(referenced_by, vec!["X".to_string()]);
        }
        other => panic!("expected InUse, got {other:?}"),
    }
}

#[test]
fn scenario_6_self_reference_rejected_before_save() {
    let y = CompositeCurrency::new("y", "Y", LogicNode::all_of(["night"]));
    let store = DefinitionStore::new(DefinitionSet::new(vec![night(), y.into()]).unwrap());
    let engine = CurrencyEngine::from_store(&store, EngineConfig::default()).unwrap();

    let new_tree = LogicNode::all_of(["night"]).group(LogicNode::any_of(["y"]));
    assert!(engine.would_create_cycle(&"y".into(), &new_tree));

    let result = store.save_composite(CompositeCurrency::new("y", "Y", new_tree));
    assert!(matches!(result, Err(CurrencyError::CycleRejected { .. })));
    assert_eq!(store.snapshot().unwrap().generation(), 0);
}

// ── Testable properties ───────────────────────────────────────────────────────

#[test]
fn property_zero_events_is_no_data() {
    let engine = engine_for(vec![night(), instrument()]);
    let out = engine.evaluate(&person(), &InMemoryHistory::new(), d("2024-03-01"));
    for status in out.values() {
        assert_eq!(status.state, CurrencyState::NoData);
        assert_eq!(status.expiry_date, None);
    }
}

#[test]
fn property_and_monotonicity() {
    let both = CompositeCurrency::new("both", "Both", LogicNode::all_of(["night", "if"]));
    let engine = engine_for(vec![night(), instrument(), both.into()]);

    let mut h = InMemoryHistory::new();
    h.append(PersonEventRecord::new("p1", "NIGHT-SORTIE", d("2024-01-10")));
    h.append(PersonEventRecord::new("p1", "IF-SORTIE", d("2024-01-20")));
    let held = engine.evaluate(&person(), &h, d("2024-03-01"));
    assert_eq!(held["Both"].state, CurrencyState::Current);

    // Only IF changes: its last sortie is now too old.
    let mut flipped = InMemoryHistory::new();
    flipped.append(PersonEventRecord::new("p1", "NIGHT-SORTIE", d("2024-01-10")));
    flipped.append(PersonEventRecord::new("p1", "IF-SORTIE", d("2023-10-01")));
    let out = engine.evaluate(&person(), &flipped, d("2024-03-01"));
    assert_eq!(out["IF Currency"].state, CurrencyState::Expired);
    assert_eq!(out["Both"].state, CurrencyState::Expired);
}

#[test]
fn property_or_iff_any_child_held() {
    let either = CompositeCurrency::new("either", "Either", LogicNode::any_of(["night", "if"]));
    let engine = engine_for(vec![night(), instrument(), either.into()]);

    // Both children lapsed: night on 2023-12-30, IF on 2024-02-15.
    let mut lapsed = InMemoryHistory::new();
    lapsed.append(PersonEventRecord::new("p1", "NIGHT-SORTIE", d("2023-10-01")));
    lapsed.append(PersonEventRecord::new("p1", "IF-SORTIE", d("2023-11-17")));
    let out = engine.evaluate(&person(), &lapsed, d("2024-03-01"));
    assert!(!out["Night Currency"].is_held());
    assert!(!out["IF Currency"].is_held());
    assert_eq!(out["Either"].state, CurrencyState::Expired);
    assert_eq!(out["Either"].expiry_date, None);
    assert_eq!(out["Either"].days_remaining, None);

    // One child held is enough, and only its date counts.
    let out = engine.evaluate(&person(), &history(), d("2024-03-01"));
    assert!(out["Either"].is_held());
    assert_eq!(out["Either"].expiry_date, Some(d("2024-04-09")));

    // No data on either side.
    let out = engine.evaluate(&person(), &InMemoryHistory::new(), d("2024-03-01"));
    assert_eq!(out["Either"].state, CurrencyState::NoData);
}

#[test]
fn property_and_with_expiring_soon_child() {
    let both = CompositeCurrency::new("both", "Both", LogicNode::all_of(["night", "if"]));
    let engine = engine_for(vec![night(), instrument(), both.into()]);

    let mut h = InMemoryHistory::new();
    h.append(PersonEventRecord::new("p1", "NIGHT-SORTIE", d("2024-01-10")));
    h.append(PersonEventRecord::new("p1", "IF-SORTIE", d("2023-12-10")));
    let out = engine.evaluate(&person(), &h, d("2024-03-01"));

    assert_eq!(out["IF Currency"].state, CurrencyState::ExpiringSoon);
    assert_eq!(out["Night Currency"].state, CurrencyState::Current);
    // Still held; the earliest child sets the date and the state.
    assert!(out["Both"].is_held());
    assert_eq!(out["Both"].expiry_date, Some(d("2024-03-09")));
    assert_eq!(out["Both"].days_remaining, Some(8));
    assert_eq!(out["Both"].state, CurrencyState::ExpiringSoon);
}

#[test]
fn property_aggregation_earliest_and_latest() {
    let earliest = CompositeCurrency::new("e", "Earliest", LogicNode::all_of(["night", "if"]));
    let latest = CompositeCurrency::new("l", "Latest", LogicNode::all_of(["night", "if"]))
        .calculation(ExpiryCalculation::LatestChild);
    let engine = engine_for(vec![night(), instrument(), earliest.into(), latest.into()]);

    let mut h = InMemoryHistory::new();
    h.append(PersonEventRecord::new("p1", "NIGHT-SORTIE", d("2024-01-10")));
    h.append(PersonEventRecord::new("p1", "IF-SORTIE", d("2024-02-01")));
    let out = engine.evaluate(&person(), &h, d("2024-03-01"));

    assert_eq!(out["Earliest"].expiry_date, Some(d("2024-04-09")));
    assert_eq!(out["Latest"].expiry_date, Some(d("2024-05-01")));
}

#[test]
fn property_self_reference_terminates_with_diagnostic() {
    // Bypass save-time validation to simulate legacy data.
    let looped = CompositeCurrency::new(
        "loop",
        "Loop",
        LogicNode::any_of(["if"]).group(LogicNode::all_of(["night", "loop"])),
    );
    let set = DefinitionSet::unchecked(7, vec![night(), instrument(), looped.into()]).unwrap();
    let engine = CurrencyEngine::new(Arc::new(set), EngineConfig::default());

    let out = engine.evaluate(&person(), &history(), d("2024-03-01"));
    let status = &out["Loop"];
    assert!(!status.is_held());
    assert!(status
        .diagnostics
        .iter()
        .any(|diag| matches!(diag, Diagnostic::CycleDetected { .. })));
    // Unrelated currencies are unaffected.
    assert_eq!(out["Night Currency"].state, CurrencyState::Current);
}

#[test]
fn property_delete_nested_reference_rejected() {
    let deep = CompositeCurrency::new(
        "deep",
        "Deep",
        LogicNode::all_of(["night"]).group(
            LogicNode::any_of(["night"]).group(LogicNode::all_of(["if"])),
        ),
    );
    let store = DefinitionStore::new(
        DefinitionSet::new(vec![night(), instrument(), deep.into()]).unwrap(),
    );

    assert!(matches!(
        store.delete(&"if".into()),
        Err(CurrencyError::InUse { .. })
    ));
    store.delete(&"deep".into()).unwrap();
    store.delete(&"if".into()).unwrap();
}

#[test]
fn property_evaluate_is_idempotent() {
    let combat = CompositeCurrency::new("combat", "Combat Ready", LogicNode::any_of(["night", "if"]));
    let engine = engine_for(vec![night(), instrument(), combat.into()]);
    let h = history();

    let first = engine.evaluate(&person(), &h, d("2024-03-01"));
    let second = engine.evaluate(&person(), &h, d("2024-03-01"));
    assert_eq!(first, second);
}

// ── Persistence round trip ────────────────────────────────────────────────────

#[test]
fn full_workflow_persist_and_reevaluate() {
    let dir = tempfile::tempdir().unwrap();
    let defs_path = dir.path().join("currencies.json");
    let history_path = dir.path().join("history.json");

    let combat = CompositeCurrency::new("combat", "Combat Ready", LogicNode::any_of(["night", "if"]));
    let defs = vec![night(), instrument(), combat.into()];
    save_definitions(&defs_path, &defs).unwrap();
    save_history(&history_path, &history()).unwrap();

    let store = DefinitionStore::new(DefinitionSet::new(load_definitions(&defs_path).unwrap()).unwrap());
    let loaded_history = load_history(&history_path).unwrap();
    let engine = CurrencyEngine::from_store(&store, EngineConfig::default()).unwrap();

    let batch = engine.evaluate_batch(&loaded_history.persons(), &loaded_history, d("2024-03-01"));
    assert_eq!(batch.results.len(), 1);
    assert_eq!(batch.generation, 0);
    assert!(batch.results[&person()]["Combat Ready"].is_held());

    // A save swaps generations; the engine built earlier keeps its snapshot.
    store.save_all(vec![night()]).unwrap();
    assert_eq!(engine.definitions().len(), 3);
    let fresh = CurrencyEngine::from_store(&store, EngineConfig::default()).unwrap();
    assert_eq!(fresh.definitions().generation(), 1);
    assert_ne!(fresh.definitions().fingerprint(), engine.definitions().fingerprint());
}
