//! Logic-tree evaluator: AND/OR groups over referenced currencies.
//!
//! The evaluator never looks definitions up itself. Each reference is
//! handed to a [`ReferenceResolver`], which typically memoizes and, for
//! composites, calls back into [`evaluate_tree`] with the same guard.

use log::warn;

use crate::currency::{CurrencyId, LogicChild, LogicNode, LogicOperator};

use super::types::{merge_diagnostics, CurrencyOutcome, Diagnostic, InProgress, TreeEvaluation};

/// Resolves a referenced currency to its outcome.
pub trait ReferenceResolver {
    /// Evaluate `id`. Return `None` when no such currency exists.
    ///
    /// `id` is already marked in progress on `guard` when this is called.
    fn resolve(&mut self, id: &CurrencyId, guard: &mut InProgress) -> Option<CurrencyOutcome>;
}

/// Evaluate one logic group.
///
/// Every child is evaluated, even after the outcome is decided, so the
/// diagnostics are complete and independent of child order.
pub fn evaluate_tree<R>(node: &LogicNode, resolver: &mut R, guard: &mut InProgress) -> TreeEvaluation
where
    R: ReferenceResolver + ?Sized,
{
    if let Err(diagnostic) = guard.descend() {
        warn!("logic tree cut short: {diagnostic}");
        return TreeEvaluation::failed(diagnostic);
    }

    if node.children.is_empty() {
        guard.ascend();
        return TreeEvaluation::failed(Diagnostic::EmptyGroup {
            operator: node.operator,
        });
    }

    let children: Vec<TreeEvaluation> = node
        .children
        .iter()
        .map(|child| match child {
            LogicChild::Reference(id) => resolve_reference(id, resolver, guard),
            LogicChild::Group(group) => evaluate_tree(group, resolver, guard),
        })
        .collect();

    guard.ascend();
    combine(node.operator, children)
}

/// Evaluate a single reference under the guard.
///
/// Re-entering an id already in progress yields an unsatisfied leaf with a
/// [`Diagnostic::CycleDetected`] instead of recursing.
pub fn resolve_reference<R>(id: &CurrencyId, resolver: &mut R, guard: &mut InProgress) -> TreeEvaluation
where
    R: ReferenceResolver + ?Sized,
{
    if let Err(diagnostic) = guard.enter(id) {
        warn!("reference to '{id}' not followed: {diagnostic}");
        return TreeEvaluation::failed(diagnostic);
    }

    let leaf = match resolver.resolve(id, guard) {
        Some(outcome) => TreeEvaluation::from_outcome(&outcome),
        None => {
            warn!("logic tree references unknown currency '{id}'");
            TreeEvaluation::failed(Diagnostic::UnknownReference { id: id.clone() })
        }
    };

    guard.exit(id);
    leaf
}

fn combine(operator: LogicOperator, children: Vec<TreeEvaluation>) -> TreeEvaluation {
    let satisfied = match operator {
        LogicOperator::And => children.iter().all(|c| c.satisfied),
        LogicOperator::Or => children.iter().any(|c| c.satisfied),
    };

    let mut result = TreeEvaluation {
        satisfied,
        ..TreeEvaluation::default()
    };

    for child in &children {
        result.has_data |= child.has_data;
        result.path_dependent |= child.path_dependent;
        merge_diagnostics(&mut result.diagnostics, &child.diagnostics);

        // AND contributes everything once satisfied; OR only its satisfied branches.
        if satisfied && child.satisfied {
            result.contributing_dates.extend_from_slice(&child.contributing_dates);
            result
                .contributing_last_events
                .extend_from_slice(&child.contributing_last_events);
        }
    }

    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
