//! Edge case tests: calendar boundaries, sparse data, and malformed trees.

use std::sync::Arc;

use chrono::NaiveDate;

use flight_currency::time::parse_date;
use flight_currency::{
    CompositeCurrency, CurrencyDefinition, CurrencyEngine, CurrencyState, DefinitionSet,
    Diagnostic, EngineConfig, ExpiryRule, InMemoryHistory, LogicNode, LogicOperator, ManualEntry,
    PersonEventRecord, PersonId, PrimitiveCurrency, RollingWindowMode, Severity,
};

fn d(s: &str) -> NaiveDate {
    parse_date(s).unwrap()
}

fn engine(defs: Vec<CurrencyDefinition>) -> CurrencyEngine {
    CurrencyEngine::new(Arc::new(DefinitionSet::new(defs).unwrap()), EngineConfig::default())
}

fn one_event(code: &str, date: &str) -> InMemoryHistory {
    let mut h = InMemoryHistory::new();
    h.append(PersonEventRecord::new("p1", code, d(date)));
    h
}

fn p1() -> PersonId {
    PersonId::new("p1")
}

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

#[test]
fn edge_leap_day_anchor() {
    let e = engine(vec![PrimitiveCurrency::new("annual", "Annual", 365).event_code("CHK").into()]);
    let out = e.evaluate(&p1(), &one_event("CHK", "2024-02-29"), d("2025-01-01"));
    assert_eq!(out["Annual"].expiry_date, Some(d("2025-02-28")));
    assert_eq!(out["Annual"].days_remaining, Some(58));
}

#[test]
fn edge_expiry_on_evaluation_date_is_expired() {
    let e = engine(vec![PrimitiveCurrency::new("night", "Night", 90).event_code("N").into()]);
    let history = one_event("N", "2024-01-01");

    let on_day = e.evaluate(&p1(), &history, d("2024-03-31"));
    assert_eq!(on_day["Night"].state, CurrencyState::Expired);
    assert_eq!(on_day["Night"].days_remaining, Some(0));
    assert_eq!(on_day["Night"].severity, Severity::Expired);

    let day_before = e.evaluate(&p1(), &history, d("2024-03-30"));
    assert_eq!(day_before["Night"].state, CurrencyState::ExpiringSoon);
    assert_eq!(day_before["Night"].days_remaining, Some(1));
}

#[test]
fn edge_expiring_soon_threshold_is_strict() {
    let e = engine(vec![PrimitiveCurrency::new("night", "Night", 90).event_code("N").into()]);
    let history = one_event("N", "2024-01-01");

    // Expiry 2024-03-31; exactly 30 days out is still current.
    let out = e.evaluate(&p1(), &history, d("2024-03-01"));
    assert_eq!(out["Night"].days_remaining, Some(30));
    assert_eq!(out["Night"].state, CurrencyState::Current);

    let out = e.evaluate(&p1(), &history, d("2024-03-02"));
    assert_eq!(out["Night"].state, CurrencyState::ExpiringSoon);
}

#[test]
fn edge_expiry_beyond_calendar_is_flagged() {
    let e = engine(vec![
        PrimitiveCurrency::new("far", "Far", 30).event_code("F").into(),
        CompositeCurrency::new("wrap", "Wrap", LogicNode::all_of(["far"])).into(),
    ]);
    let mut history = InMemoryHistory::new();
    history.append(PersonEventRecord::new("p1", "F", NaiveDate::MAX));

    let out = e.evaluate(&p1(), &history, NaiveDate::MAX);
    let far = &out["Far"];
    assert_eq!(far.state, CurrencyState::NoData);
    assert_eq!(far.last_event_date, Some(NaiveDate::MAX));
    assert!(far
        .diagnostics
        .contains(&Diagnostic::DateOverflow { id: "far".into() }));

    // The composite carries the leaf diagnostic up.
    assert!(!out["Wrap"].is_held());
    assert!(out["Wrap"]
        .diagnostics
        .contains(&Diagnostic::DateOverflow { id: "far".into() }));
}

#[test]
fn edge_future_events_are_ignored() {
    let e = engine(vec![PrimitiveCurrency::new("night", "Night", 90).event_code("N").into()]);
    let mut history = one_event("N", "2024-01-01");
    history.append(PersonEventRecord::new("p1", "N", d("2024-06-01")));

    let out = e.evaluate(&p1(), &history, d("2024-02-01"));
    assert_eq!(out["Night"].last_event_date, Some(d("2024-01-01")));
    assert_eq!(out["Night"].expiry_date, Some(d("2024-03-31")));
}

// ---------------------------------------------------------------------------
// Rolling windows
// ---------------------------------------------------------------------------

fn ia() -> CurrencyDefinition {
    PrimitiveCurrency::new("ia", "3 IA in 90", 90)
        .event_code("IA")
        .required_count(3)
        .rule(ExpiryRule::RollingWindow)
        .into()
}

fn ia_history(dates: &[&str]) -> InMemoryHistory {
    let mut h = InMemoryHistory::new();
    for date in dates {
        h.append(PersonEventRecord::new("p1", "IA", d(date)));
    }
    h
}

#[test]
fn edge_rolling_window_boundary() {
    let e = engine(vec![ia()]);
    // 2024-01-02 is 89 days before 2024-03-31; 2024-01-01 is 90 days before.
    let inside = ia_history(&["2024-01-02", "2024-02-01", "2024-03-01"]);
    let out = e.evaluate(&p1(), &inside, d("2024-03-31"));
    assert!(out["3 IA in 90"].is_held());
    assert_eq!(out["3 IA in 90"].expiry_date, Some(d("2024-03-31")));
    assert_eq!(out["3 IA in 90"].days_remaining, Some(0));

    let outside = ia_history(&["2024-01-01", "2024-02-01", "2024-03-01"]);
    let out = e.evaluate(&p1(), &outside, d("2024-03-31"));
    assert_eq!(out["3 IA in 90"].state, CurrencyState::Expired);
    assert_eq!(out["3 IA in 90"].expiry_date, None);
    assert_eq!(out["3 IA in 90"].last_event_date, Some(d("2024-03-01")));
}

#[test]
fn edge_held_rolling_window_is_not_severity_expired() {
    let e = engine(vec![
        PrimitiveCurrency::new("recent", "Recent Sortie", 30)
            .event_code("SORTIE")
            .rule(ExpiryRule::RollingWindow)
            .into(),
        PrimitiveCurrency::new("night", "Night", 90).event_code("N").into(),
        CompositeCurrency::new("ready", "Ready", LogicNode::all_of(["recent", "night"])).into(),
    ]);
    let mut history = one_event("SORTIE", "2024-02-28");
    history.append(PersonEventRecord::new("p1", "N", d("2024-02-01")));
    let out = e.evaluate(&p1(), &history, d("2024-03-01"));

    let recent = &out["Recent Sortie"];
    assert!(recent.is_held());
    assert_eq!(recent.days_remaining, Some(0));
    assert_eq!(recent.severity, Severity::Normal);

    // Earliest child is the rolling window, so the composite inherits 0 days.
    let ready = &out["Ready"];
    assert!(ready.is_held());
    assert_eq!(ready.expiry_date, Some(d("2024-03-01")));
    assert_ne!(ready.severity, Severity::Expired);
}

#[test]
fn edge_rolling_window_projected_lapse() {
    let set = Arc::new(DefinitionSet::new(vec![ia()]).unwrap());
    let e = CurrencyEngine::new(
        set,
        EngineConfig::default().with_rolling_window(RollingWindowMode::ProjectedLapse),
    );
    let history = ia_history(&["2024-01-01", "2024-01-20", "2024-02-10"]);
    let out = e.evaluate(&p1(), &history, d("2024-03-01"));

    // The oldest of the three ages out 90 days after it happened.
    assert_eq!(out["3 IA in 90"].expiry_date, Some(d("2024-03-31")));
    assert_eq!(out["3 IA in 90"].days_remaining, Some(30));
    assert_eq!(out["3 IA in 90"].state, CurrencyState::Current);
}

#[test]
fn edge_rolling_window_without_events_is_no_data() {
    let e = engine(vec![ia()]);
    let out = e.evaluate(&p1(), &InMemoryHistory::new(), d("2024-03-01"));
    assert_eq!(out["3 IA in 90"].state, CurrencyState::NoData);
    assert_eq!(out["3 IA in 90"].severity, Severity::Unknown);
}

#[test]
fn edge_required_count_not_met_is_no_data() {
    let e = engine(vec![PrimitiveCurrency::new("ldg", "Landings", 90)
        .event_code("LDG")
        .required_count(3)
        .into()]);
    let out = e.evaluate(&p1(), &one_event("LDG", "2024-02-01"), d("2024-03-01"));
    assert_eq!(out["Landings"].state, CurrencyState::NoData);
    assert_eq!(out["Landings"].expiry_date, None);
}

// ---------------------------------------------------------------------------
// Malformed trees
// ---------------------------------------------------------------------------

#[test]
fn edge_empty_group_is_unsatisfied() {
    let e = engine(vec![
        PrimitiveCurrency::new("night", "Night", 90).event_code("N").into(),
        CompositeCurrency::new("hollow", "Hollow", LogicNode::new(LogicOperator::And)).into(),
        CompositeCurrency::new(
            "either",
            "Either",
            LogicNode::any_of(["night"]).group(LogicNode::new(LogicOperator::Or)),
        )
        .into(),
    ]);
    let out = e.evaluate(&p1(), &one_event("N", "2024-02-01"), d("2024-03-01"));

    assert_eq!(out["Hollow"].state, CurrencyState::NoData);
    assert!(out["Hollow"].diagnostics.contains(&Diagnostic::EmptyGroup {
        operator: LogicOperator::And
    }));

    // An empty branch under OR does not block a held sibling.
    assert!(out["Either"].is_held());
    assert!(out["Either"].diagnostics.contains(&Diagnostic::EmptyGroup {
        operator: LogicOperator::Or
    }));
}

#[test]
fn edge_unknown_reference_under_and_and_or() {
    let e = engine(vec![
        PrimitiveCurrency::new("night", "Night", 90).event_code("N").into(),
        CompositeCurrency::new("strict", "Strict", LogicNode::all_of(["night", "ghost"])).into(),
        CompositeCurrency::new("lenient", "Lenient", LogicNode::any_of(["night", "ghost"])).into(),
    ]);
    let out = e.evaluate(&p1(), &one_event("N", "2024-02-01"), d("2024-03-01"));
    let ghost = Diagnostic::UnknownReference { id: "ghost".into() };

    assert_eq!(out["Strict"].state, CurrencyState::Expired);
    assert!(out["Strict"].diagnostics.contains(&ghost));
    assert!(out["Lenient"].is_held());
    assert!(out["Lenient"].diagnostics.contains(&ghost));
}

#[test]
fn edge_unknown_currency_lookup_is_not_found() {
    let e = engine(vec![PrimitiveCurrency::new("night", "Night", 90).event_code("N").into()]);
    let err = e
        .evaluate_currency(&p1(), &InMemoryHistory::new(), &"ghost".into(), d("2024-03-01"))
        .unwrap_err();
    assert!(err.to_string().contains("ghost"));
}

// ---------------------------------------------------------------------------
// History sources and visibility
// ---------------------------------------------------------------------------

#[test]
fn edge_manual_entry_counts_as_event() {
    let e = engine(vec![PrimitiveCurrency::new("night", "Night", 90).event_code("N").into()]);
    let mut history = one_event("N", "2024-01-01");
    history.append_manual(ManualEntry {
        person_id: p1(),
        currency_id: "night".into(),
        date: d("2024-02-15"),
        note: Some("paper logbook".into()),
    });

    let out = e.evaluate(&p1(), &history, d("2024-03-01"));
    assert_eq!(out["Night"].last_event_date, Some(d("2024-02-15")));
    assert_eq!(out["Night"].expiry_date, Some(d("2024-05-15")));
}

#[test]
fn edge_manual_entry_for_other_person_is_ignored() {
    let e = engine(vec![PrimitiveCurrency::new("night", "Night", 90).event_code("N").into()]);
    let mut history = InMemoryHistory::new();
    history.append_manual(ManualEntry {
        person_id: PersonId::new("p2"),
        currency_id: "night".into(),
        date: d("2024-02-15"),
        note: None,
    });

    let out = e.evaluate(&p1(), &history, d("2024-03-01"));
    assert_eq!(out["Night"].state, CurrencyState::NoData);
}

#[test]
fn edge_hidden_currency_feeds_visible_composite() {
    let e = engine(vec![
        PrimitiveCurrency::new("gf", "Ground Fam", 30).event_code("GF").hidden().into(),
        CompositeCurrency::new("ready", "Ready", LogicNode::all_of(["gf"])).into(),
    ]);
    let history = one_event("GF", "2024-02-20");

    let visible = e.evaluate_visible(&p1(), &history, d("2024-03-01"));
    assert!(!visible.contains_key("Ground Fam"));
    assert!(visible["Ready"].is_held());
    assert_eq!(visible["Ready"].expiry_date, Some(d("2024-03-21")));

    let all = e.evaluate(&p1(), &history, d("2024-03-01"));
    assert!(!all["Ground Fam"].is_visible);
}

#[test]
fn edge_person_without_history() {
    let e = engine(vec![
        PrimitiveCurrency::new("night", "Night", 90).event_code("N").into(),
        CompositeCurrency::new("ready", "Ready", LogicNode::any_of(["night"])).into(),
    ]);
    let out = e.evaluate(&PersonId::new("nobody"), &one_event("N", "2024-02-01"), d("2024-03-01"));
    assert!(out.values().all(|s| s.state == CurrencyState::NoData));
    assert!(out.values().all(|s| s.diagnostics.is_empty()));
}
