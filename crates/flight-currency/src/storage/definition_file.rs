//! Definition file persistence — load and save a whole definition set.
//!
//! File format:
//! ```json
//! {
//!     "version": 1,
//!     "definitions": [ ... CurrencyDefinition ... ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::currency::CurrencyDefinition;
use crate::error::{CurrencyError, Result};

// ── File format constants ─────────────────────────────────────────────────────

pub const DEFINITION_FILE_VERSION: u32 = 1;

// ── On-disk structure ─────────────────────────────────────────────────────────

/// Wrapper written to disk for a definition set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionFile {
    /// Format version number.
    pub version: u32,
    pub definitions: Vec<CurrencyDefinition>,
}

impl DefinitionFile {
    pub fn new(definitions: Vec<CurrencyDefinition>) -> Self {
        Self {
            version: DEFINITION_FILE_VERSION,
            definitions,
        }
    }
}

/// Read a definition file. The definitions are returned unvalidated.
pub fn load_definitions(path: impl AsRef<Path>) -> Result<Vec<CurrencyDefinition>> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(CurrencyError::NotFound(format!(
            "definition file not found: {}",
            path.display()
        )));
    }

    let bytes = std::fs::read(path)?;
    let file: DefinitionFile = serde_json::from_slice(&bytes).map_err(|e| {
        CurrencyError::InvalidFileFormat(format!(
            "failed to parse definition file {}: {e}",
            path.display()
        ))
    })?;

    if file.version != DEFINITION_FILE_VERSION {
        return Err(CurrencyError::InvalidFileFormat(format!(
            "unsupported definition file version {} in {}",
            file.version,
            path.display()
        )));
    }

    Ok(file.definitions)
}

/// Write `definitions` to `path`, replacing any existing file.
///
/// Parent directories are created as needed.
pub fn save_definitions(path: impl AsRef<Path>, definitions: &[CurrencyDefinition]) -> Result<()> {
    let path = path.as_ref();
    let file = DefinitionFile::new(definitions.to_vec());

    let json = serde_json::to_string_pretty(&file)
        .map_err(|e| CurrencyError::SerializationError(e.to_string()))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, json.as_bytes())?;

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
