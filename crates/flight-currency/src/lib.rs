//! FlightCurrency — qualification currency engine for flight training.
//!
//! Decides, for a person on a date, whether each qualification ("currency")
//! is held, when it lapses, and how urgently it needs renewing. Primitive
//! currencies derive from dated events; composite currencies combine other
//! currencies through AND/OR trees. Cyclic or dangling definitions never
//! abort an evaluation: they surface as diagnostics on the affected status.

pub mod config;
pub mod currency;
pub mod engine;
pub mod error;
pub mod expiry;
pub mod history;
pub mod index;
pub mod logic;
pub mod status;
pub mod storage;
pub mod store;
pub mod time;

// Re-export primary types
pub use config::{EngineConfig, RollingWindowMode, SeverityBands};
pub use engine::{BatchEvaluation, CurrencyEngine, PersonCurrencyStatus};
pub use error::{CurrencyError, Result};
pub use status::{CurrencyState, Severity};

// Re-export definition types
pub use currency::{
    validate_definitions, CompositeCurrency, CurrencyDefinition, CurrencyId, CurrencyKind,
    ExpiryCalculation, ExpiryRule, LogicChild, LogicNode, LogicOperator, PrimitiveCurrency,
    ValidationIssue, ValidationReport,
};

// Re-export history types
pub use history::{EventHistory, InMemoryHistory, ManualEntry, PersonEventRecord, PersonId};

// Re-export evaluation internals callers may inspect
pub use index::DependencyIndex;
pub use logic::Diagnostic;
pub use store::{DefinitionSet, DefinitionStore};
