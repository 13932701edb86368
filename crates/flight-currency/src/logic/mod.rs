//! Composite logic: AND/OR trees, cycle guard, and expiry aggregation.
//!
//! The logic module provides:
//! - Recursive AND/OR evaluation over explicitly tagged children
//! - An in-progress guard that turns cycles into diagnostics
//! - A depth ceiling for pathological nesting
//! - EarliestChild / LatestChild expiry aggregation

pub mod aggregate;
pub mod evaluator;
pub mod types;

pub use aggregate::aggregate_expiry;
pub use evaluator::{evaluate_tree, resolve_reference, ReferenceResolver};
pub use types::{CurrencyOutcome, Diagnostic, InProgress, TreeEvaluation};
