//! Stress test: deep reference chains and deeply nested groups.

use std::sync::Arc;

use flight_currency::time::parse_date;
use flight_currency::{
    CompositeCurrency, CurrencyDefinition, CurrencyEngine, DefinitionSet, Diagnostic,
    EngineConfig, InMemoryHistory, LogicNode, LogicOperator, PersonEventRecord, PersonId,
    PrimitiveCurrency,
};

fn base() -> CurrencyDefinition {
    PrimitiveCurrency::new("base", "Base", 90)
        .event_code("SORTIE")
        .into()
}

fn history() -> InMemoryHistory {
    let mut h = InMemoryHistory::new();
    h.append(PersonEventRecord::new("p1", "SORTIE", parse_date("2024-01-10").unwrap()));
    h
}

/// c0 -> base, c1 -> c0, ..., c{n-1} -> c{n-2}
fn chain(n: usize) -> Vec<CurrencyDefinition> {
    let mut defs = vec![base()];
    for i in 0..n {
        let target = if i == 0 { "base".to_string() } else { format!("c{}", i - 1) };
        defs.push(CompositeCurrency::new(format!("c{i}"), format!("Chain {i}"), LogicNode::all_of([target])).into());
    }
    defs
}

#[test]
fn stress_reference_chain_of_100() {
    let set = DefinitionSet::new(chain(100)).expect("acyclic chain should validate");
    let engine = CurrencyEngine::new(Arc::new(set), EngineConfig::default());

    let out = engine.evaluate(&PersonId::new("p1"), &history(), parse_date("2024-03-01").unwrap());
    let top = &out["Chain 99"];
    assert!(top.is_held());
    assert_eq!(top.expiry_date, parse_date("2024-04-09").ok());
    assert!(top.diagnostics.is_empty());
}

#[test]
fn stress_chain_beyond_depth_ceiling() {
    let set = DefinitionSet::new(chain(60)).unwrap();
    // Each link costs a reference level and a group level.
    let engine = CurrencyEngine::new(Arc::new(set), EngineConfig::default().with_max_depth(40));
    let person = PersonId::new("p1");
    let date = parse_date("2024-03-01").unwrap();

    let top = engine
        .evaluate_currency(&person, &history(), &"c59".into(), date)
        .unwrap();
    assert!(!top.is_held());
    assert!(top
        .diagnostics
        .contains(&Diagnostic::DepthExceeded { limit: 40 }));

    // Shallow links are still evaluated in full.
    let shallow = engine
        .evaluate_currency(&person, &history(), &"c5".into(), date)
        .unwrap();
    assert!(shallow.is_held());
}

#[test]
fn stress_nested_groups_500_levels() {
    let mut tree = LogicNode::all_of(["base"]);
    for i in 0..500 {
        let op = if i % 2 == 0 { LogicOperator::Or } else { LogicOperator::And };
        tree = LogicNode::new(op).group(tree);
    }
    let deep = CompositeCurrency::new("deep", "Deep", tree);
    let set = DefinitionSet::new(vec![base(), deep.into()]).unwrap();

    let generous = CurrencyEngine::new(Arc::new(set.clone()), EngineConfig::default().with_max_depth(1024));
    let held = generous
        .evaluate_currency(&PersonId::new("p1"), &history(), &"deep".into(), parse_date("2024-03-01").unwrap())
        .unwrap();
    assert!(held.is_held());

    let strict = CurrencyEngine::new(Arc::new(set), EngineConfig::default());
    let cut = strict
        .evaluate_currency(&PersonId::new("p1"), &history(), &"deep".into(), parse_date("2024-03-01").unwrap())
        .unwrap();
    assert!(!cut.is_held());
    assert!(cut.diagnostics.contains(&Diagnostic::DepthExceeded { limit: 256 }));
}

#[test]
fn stress_wide_diamond_shares_memoized_leaves() {
    // 300 composites all reference the same 10 primitives via two paths each.
    let mut defs: Vec<CurrencyDefinition> = (0..10)
        .map(|i| {
            PrimitiveCurrency::new(format!("p{i}"), format!("P{i}"), 90)
                .event_code("SORTIE")
                .into()
        })
        .collect();
    let leaves: Vec<String> = (0..10).map(|i| format!("p{i}")).collect();
    defs.push(CompositeCurrency::new("left", "Left", LogicNode::all_of(leaves.clone())).into());
    defs.push(CompositeCurrency::new("right", "Right", LogicNode::any_of(leaves)).into());
    for i in 0..300 {
        defs.push(CompositeCurrency::new(format!("top{i}"), format!("Top {i}"), LogicNode::all_of(["left", "right"])).into());
    }

    let set = DefinitionSet::new(defs).unwrap();
    let engine = CurrencyEngine::new(Arc::new(set), EngineConfig::default());
    let out = engine.evaluate(&PersonId::new("p1"), &history(), parse_date("2024-03-01").unwrap());

    assert_eq!(out.len(), 312);
    assert!(out.values().all(|s| s.is_held()));
}
