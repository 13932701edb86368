//! Dependency index over composite logic trees.
//!
//! [`DependencyIndex`] maps every referenced currency id to the composites
//! whose trees mention it, directly or inside nested groups. It is rebuilt
//! by a full walk whenever the definition set changes, so the cost is
//! proportional to the total number of tree nodes.
//!
//! The same edges answer the edit-time questions: who uses this currency,
//! what else changes when it changes, and whether a proposed tree would
//! close a cycle.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use crate::currency::{CurrencyDefinition, CurrencyId, LogicNode};

/// Composite id → ids its tree references.
type Edges = BTreeMap<CurrencyId, BTreeSet<CurrencyId>>;

// ── DependencyIndex ──────────────────────────────────────────────────────────

/// Reverse reference index plus the forward edges it was built from.
#[derive(Debug, Clone, Default)]
pub struct DependencyIndex {
    /// Referenced id → composites that reference it.
    referenced_by: BTreeMap<CurrencyId, BTreeSet<CurrencyId>>,
    /// Composite id → ids it references.
    references: Edges,
    /// Display names for every known definition.
    names: BTreeMap<CurrencyId, String>,
}

impl DependencyIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from a full walk over `definitions`.
    pub fn build<'a, I>(definitions: I) -> Self
    where
        I: IntoIterator<Item = &'a CurrencyDefinition>,
    {
        let mut index = Self::new();
        for def in definitions {
            index.names.insert(def.id().clone(), def.name().to_string());
            if let CurrencyDefinition::Composite(c) = def {
                let refs = c.logic_tree.referenced_ids();
                for r in &refs {
                    index
                        .referenced_by
                        .entry(r.clone())
                        .or_default()
                        .insert(c.id.clone());
                }
                index.references.insert(c.id.clone(), refs);
            }
        }
        index
    }

    /// Ids of the composites that reference `id`.
    pub fn referencing_ids(&self, id: &CurrencyId) -> Vec<&CurrencyId> {
        self.referenced_by
            .get(id)
            .map(|set| set.iter().collect())
            .unwrap_or_default()
    }

    /// Names of the composites that reference `id`, ordered by composite id.
    pub fn references_of(&self, id: &CurrencyId) -> Vec<String> {
        self.referencing_ids(id)
            .into_iter()
            .map(|c| self.name_of(c))
            .collect()
    }

    /// Return `true` if any composite references `id`.
    pub fn is_referenced(&self, id: &CurrencyId) -> bool {
        self.referenced_by
            .get(id)
            .map(|set| !set.is_empty())
            .unwrap_or(false)
    }

    /// Ids referenced by `composite`'s tree (empty for primitives).
    pub fn references(&self, composite: &CurrencyId) -> Vec<&CurrencyId> {
        self.references
            .get(composite)
            .map(|set| set.iter().collect())
            .unwrap_or_default()
    }

    /// Every referenced id with the composites that reference it.
    pub fn usage_report(&self) -> BTreeMap<CurrencyId, Vec<CurrencyId>> {
        self.referenced_by
            .iter()
            .map(|(id, users)| (id.clone(), users.iter().cloned().collect()))
            .collect()
    }

    /// Every composite whose outcome can change when `id` changes.
    ///
    /// Walks the reverse edges breadth-first with a visited set, so cyclic
    /// definitions terminate. `id` itself appears only if it sits on a cycle.
    pub fn dependents_transitive(&self, id: &CurrencyId) -> BTreeSet<CurrencyId> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<&CurrencyId> = VecDeque::new();
        queue.push_back(id);

        while let Some(current) = queue.pop_front() {
            if let Some(users) = self.referenced_by.get(current) {
                for user in users {
                    if seen.insert(user.clone()) {
                        queue.push_back(user);
                    }
                }
            }
        }
        seen
    }

    /// Return `true` if saving `proposed` as the tree of `composite_id`
    /// would make `composite_id` reachable from itself.
    pub fn would_create_cycle(&self, composite_id: &CurrencyId, proposed: &LogicNode) -> bool {
        self.cycle_path(composite_id, proposed).is_some()
    }

    /// Shortest reference path `composite_id -> ... -> composite_id` that
    /// `proposed` would close, if any.
    ///
    /// The proposed tree replaces whatever `composite_id` currently has.
    pub fn cycle_path(&self, composite_id: &CurrencyId, proposed: &LogicNode) -> Option<Vec<CurrencyId>> {
        let proposed_refs = proposed.referenced_ids();
        let mut parent: HashMap<&CurrencyId, &CurrencyId> = HashMap::new();
        let mut queue: VecDeque<&CurrencyId> = VecDeque::new();

        for r in &proposed_refs {
            if r == composite_id {
                return Some(vec![composite_id.clone(), composite_id.clone()]);
            }
            if !parent.contains_key(r) {
                parent.insert(r, composite_id);
                queue.push_back(r);
            }
        }

        while let Some(current) = queue.pop_front() {
            let Some(next) = self.references.get(current) else {
                continue;
            };
            for r in next {
                if r == composite_id {
                    let mut path = vec![composite_id.clone()];
                    let mut cursor = current;
                    while cursor != composite_id {
                        path.push(cursor.clone());
                        cursor = parent.get(cursor).copied().unwrap_or(composite_id);
                    }
                    // Walked tail-first after the leading id.
                    path[1..].reverse();
                    path.push(composite_id.clone());
                    return Some(path);
                }
                if !parent.contains_key(r) {
                    parent.insert(r, current);
                    queue.push_back(r);
                }
            }
        }
        None
    }

    /// Every cycle among the indexed composites.
    pub fn cycles(&self) -> Vec<Vec<CurrencyId>> {
        cycles_in(&self.references)
    }

    /// Display name for `id`, falling back to the id itself.
    pub fn name_of(&self, id: &CurrencyId) -> String {
        self.names
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    /// Number of distinct referenced ids.
    pub fn len(&self) -> usize {
        self.referenced_by.len()
    }

    /// Return `true` when no composite references anything.
    pub fn is_empty(&self) -> bool {
        self.referenced_by.is_empty()
    }
}

// ── Cycle search ─────────────────────────────────────────────────────────────

/// Find every reference cycle among the composites in `definitions`.
///
/// Each cycle is reported once as a path that starts and ends with the
/// same id, e.g. `[x, y, x]`. Self-references show up as `[x, x]`.
pub fn find_cycles(definitions: &BTreeMap<CurrencyId, CurrencyDefinition>) -> Vec<Vec<CurrencyId>> {
    let edges: Edges = definitions
        .values()
        .filter_map(|def| def.as_composite())
        .map(|c| (c.id.clone(), c.logic_tree.referenced_ids()))
        .collect();
    cycles_in(&edges)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Iterative depth-first search; a back edge to an in-progress node is a cycle.
fn cycles_in(edges: &Edges) -> Vec<Vec<CurrencyId>> {
    let mut marks: HashMap<&CurrencyId, Mark> = HashMap::new();
    let mut cycles = Vec::new();

    for root in edges.keys() {
        if marks.contains_key(root) {
            continue;
        }

        // (node, its children, next child to visit)
        let mut stack: Vec<(&CurrencyId, Vec<&CurrencyId>, usize)> = Vec::new();
        marks.insert(root, Mark::InProgress);
        stack.push((root, children(edges, root), 0));

        while let Some(frame) = stack.last_mut() {
            if frame.2 >= frame.1.len() {
                marks.insert(frame.0, Mark::Done);
                stack.pop();
                continue;
            }
            let next = frame.1[frame.2];
            frame.2 += 1;

            match marks.get(next) {
                Some(Mark::Done) => {}
                Some(Mark::InProgress) => {
                    let start = stack.iter().position(|(id, _, _)| *id == next).unwrap_or(0);
                    let mut path: Vec<CurrencyId> =
                        stack[start..].iter().map(|(id, _, _)| (*id).clone()).collect();
                    path.push(next.clone());
                    cycles.push(path);
                }
                None => {
                    marks.insert(next, Mark::InProgress);
                    stack.push((next, children(edges, next), 0));
                }
            }
        }
    }

    cycles
}

fn children<'a>(edges: &'a Edges, id: &CurrencyId) -> Vec<&'a CurrencyId> {
    edges
        .get(id)
        .map(|set| set.iter().collect())
        .unwrap_or_default()
}

// ── Tests ────────────────────────────────────────────────────────────────────
