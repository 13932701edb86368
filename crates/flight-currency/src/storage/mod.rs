//! Storage layer for definition sets and event history.
//!
//! The engine itself owns no file format. These JSON files belong to the
//! hosting side (the `fcur` CLI, test fixtures) and carry a version number
//! so that older files are rejected instead of misread.
//!
//! # Modules
//!
//! - [`definition_file`] — `{ version, definitions }` load/save.
//! - [`history_file`] — `{ version, events, manual_entries }` load/save.

pub mod definition_file;
pub mod history_file;

pub use definition_file::{load_definitions, save_definitions, DefinitionFile};
pub use history_file::{load_history, save_history, HistoryFile};
