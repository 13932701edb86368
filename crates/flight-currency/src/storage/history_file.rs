//! History file persistence — person events and manual entries.
//!
//! File format:
//! ```json
//! {
//!     "version": 1,
//!     "events": [ { "person_id": "...", "event_code": "...", "date": "YYYY-MM-DD" } ],
//!     "manual_entries": [ { "person_id": "...", "currency_id": "...", "date": "YYYY-MM-DD" } ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CurrencyError, Result};
use crate::history::{InMemoryHistory, ManualEntry, PersonEventRecord};

pub const HISTORY_FILE_VERSION: u32 = 1;

/// Wrapper written to disk for event history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryFile {
    pub version: u32,
    #[serde(default)]
    pub events: Vec<PersonEventRecord>,
    #[serde(default)]
    pub manual_entries: Vec<ManualEntry>,
}

impl HistoryFile {
    pub fn from_history(history: &InMemoryHistory) -> Self {
        Self {
            version: HISTORY_FILE_VERSION,
            events: history.all_events().cloned().collect(),
            manual_entries: history.all_manual_entries().cloned().collect(),
        }
    }

    pub fn into_history(self) -> InMemoryHistory {
        InMemoryHistory::from_records(self.events, self.manual_entries)
    }
}

/// Read a history file into an [`InMemoryHistory`].
pub fn load_history(path: impl AsRef<Path>) -> Result<InMemoryHistory> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(CurrencyError::NotFound(format!(
            "history file not found: {}",
            path.display()
        )));
    }

    let bytes = std::fs::read(path)?;
    let file: HistoryFile = serde_json::from_slice(&bytes).map_err(|e| {
        CurrencyError::InvalidFileFormat(format!(
            "failed to parse history file {}: {e}",
            path.display()
        ))
    })?;

    if file.version != HISTORY_FILE_VERSION {
        return Err(CurrencyError::InvalidFileFormat(format!(
            "unsupported history file version {} in {}",
            file.version,
            path.display()
        )));
    }

    Ok(file.into_history())
}

/// Write `history` to `path`.
pub fn save_history(path: impl AsRef<Path>, history: &InMemoryHistory) -> Result<()> {
    let json = serde_json::to_string_pretty(&HistoryFile::from_history(history))
        .map_err(|e| CurrencyError::SerializationError(e.to_string()))?;
    std::fs::write(path.as_ref(), json.as_bytes())?;
    Ok(())
}
