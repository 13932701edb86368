//! Currency definitions: the data model the engine evaluates.
//!
//! The currency module provides:
//! - Primitive currencies (derived from dated events)
//! - Composite currencies (AND/OR trees over other currencies)
//! - Explicitly tagged logic-tree leaves (reference vs. nested group)
//! - Definition-set validation (blocking errors vs. tolerated warnings)

pub mod types;
pub mod validate;

pub use types::{
    CompositeCurrency, CurrencyDefinition, CurrencyId, CurrencyKind, ExpiryCalculation,
    ExpiryRule, LogicChild, LogicNode, LogicOperator, PrimitiveCurrency,
};

pub use validate::{validate_definitions, ValidationIssue, ValidationReport};
