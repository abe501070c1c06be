//! Persistent store of named radio identifiers
//!
//! Records are kept as a JSON array on disk and rewritten in full after
//! every mutation. Identifiers are unique (compared after normalisation) and
//! the `CUSTOM` sentinel can never be deleted.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::activation::normalize_radio_id;

/// Identifier of the "type your own" placeholder entry
pub const CUSTOM_SENTINEL: &str = "CUSTOM";
pub const CUSTOM_NAME: &str = "Custom Entry";

/// Entries installed on first use
const BUILTIN_RADIOS: &[(&str, &str)] = &[
    (CUSTOM_NAME, CUSTOM_SENTINEL),
    ("Chevrolet Silverado", "C7RB4Q2N"),
    ("Ford F-150", "F4X91KT7"),
    ("Honda Accord", "H55EU0R5"),
    ("Jeep Wrangler", "J2WR8M3D"),
    ("Toyota Camry", "T9CM2P6L"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioRecord {
    pub name: String,
    pub radio_id: String,
    #[serde(default, alias = "is_default")]
    pub is_builtin: bool,
}

impl RadioRecord {
    pub fn is_sentinel(&self) -> bool {
        self.radio_id == CUSTOM_SENTINEL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total: usize,
    pub builtin: usize,
    pub user_added: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Radio ID '{radio_id}' already exists for '{existing_name}'")]
    DuplicateIdentifier {
        radio_id: String,
        existing_name: String,
    },

    #[error("Radio ID '{0}' not found")]
    NotFound(String),

    #[error("Cannot delete the Custom Entry")]
    Protected,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Storage format error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub struct IdentifierStore {
    path: Option<PathBuf>,
    records: RwLock<Vec<RadioRecord>>,
}

impl IdentifierStore {
    /// Memory-only store, seeded with the built-ins
    pub fn in_memory() -> Self {
        let store = Self {
            path: None,
            records: RwLock::new(Vec::new()),
        };
        let mut records = store.records.write();
        seed_into(&mut records);
        drop(records);
        store
    }

    /// Open (or create) the store at `path`. An empty store is seeded with
    /// the built-ins; a populated one only gets the sentinel back if missing.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let mut records = load(&path)?;
        let added = if records.is_empty() {
            seed_into(&mut records)
        } else {
            ensure_sentinel(&mut records)
        };
        if added > 0 || !path.exists() {
            write_atomic(&path, &records)?;
            info!("Seeded {} radio IDs into {}", added, path.display());
        }
        Ok(Self {
            path: Some(path),
            records: RwLock::new(records),
        })
    }

    /// Re-run seeding. Built-ins whose identifier already exists are skipped.
    pub fn seed(&self) -> StoreResult<usize> {
        let mut records = self.records.write();
        let mut next = records.clone();
        let added = seed_into(&mut next);
        if added > 0 {
            self.persist(&next)?;
            *records = next;
        }
        Ok(added)
    }

    /// All records: sentinel first, then alphabetical by name
    pub fn list(&self) -> Vec<RadioRecord> {
        let mut records = self.records.read().clone();
        records.sort_by(|a, b| {
            b.is_sentinel()
                .cmp(&a.is_sentinel())
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
                .then_with(|| a.radio_id.cmp(&b.radio_id))
        });
        records
    }

    pub fn get(&self, radio_id: &str) -> Option<RadioRecord> {
        let radio_id = normalize_radio_id(radio_id);
        self.records
            .read()
            .iter()
            .find(|r| r.radio_id == radio_id)
            .cloned()
    }

    pub fn add(&self, name: &str, radio_id: &str) -> StoreResult<RadioRecord> {
        let name = name.trim();
        let radio_id = normalize_radio_id(radio_id);
        if name.is_empty() {
            return Err(StoreError::InvalidInput("name must not be empty".to_string()));
        }
        if radio_id.is_empty() {
            return Err(StoreError::InvalidInput(
                "radio_id must not be empty".to_string(),
            ));
        }

        let mut records = self.records.write();
        if let Some(existing) = records.iter().find(|r| r.radio_id == radio_id) {
            return Err(StoreError::DuplicateIdentifier {
                radio_id,
                existing_name: existing.name.clone(),
            });
        }

        let record = RadioRecord {
            name: name.to_string(),
            radio_id,
            is_builtin: false,
        };
        let mut next = records.clone();
        next.push(record.clone());
        self.persist(&next)?;
        *records = next;

        info!("Added radio: {} - {}", record.name, record.radio_id);
        Ok(record)
    }

    pub fn delete(&self, radio_id: &str) -> StoreResult<RadioRecord> {
        let radio_id = normalize_radio_id(radio_id);
        if radio_id == CUSTOM_SENTINEL {
            return Err(StoreError::Protected);
        }

        let mut records = self.records.write();
        let idx = records
            .iter()
            .position(|r| r.radio_id == radio_id)
            .ok_or_else(|| StoreError::NotFound(radio_id.clone()))?;

        let mut next = records.clone();
        let removed = next.remove(idx);
        self.persist(&next)?;
        *records = next;

        info!("Deleted radio: {} - {}", removed.name, removed.radio_id);
        Ok(removed)
    }

    pub fn stats(&self) -> StoreStats {
        let records = self.records.read();
        let builtin = records.iter().filter(|r| r.is_builtin).count();
        StoreStats {
            total: records.len(),
            builtin,
            user_added: records.len() - builtin,
        }
    }

    fn persist(&self, records: &[RadioRecord]) -> StoreResult<()> {
        match &self.path {
            Some(path) => write_atomic(path, records),
            None => Ok(()),
        }
    }
}

fn seed_into(records: &mut Vec<RadioRecord>) -> usize {
    let mut added = 0;
    for (name, radio_id) in BUILTIN_RADIOS {
        if records.iter().any(|r| r.radio_id == *radio_id) {
            continue;
        }
        records.push(RadioRecord {
            name: name.to_string(),
            radio_id: radio_id.to_string(),
            is_builtin: *radio_id != CUSTOM_SENTINEL,
        });
        added += 1;
    }
    added
}

fn ensure_sentinel(records: &mut Vec<RadioRecord>) -> usize {
    if records.iter().any(|r| r.is_sentinel()) {
        return 0;
    }
    records.push(RadioRecord {
        name: CUSTOM_NAME.to_string(),
        radio_id: CUSTOM_SENTINEL.to_string(),
        is_builtin: false,
    });
    1
}

fn load(path: &Path) -> StoreResult<Vec<RadioRecord>> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    if data.trim().is_empty() {
        return Ok(Vec::new());
    }

    let raw: Vec<RadioRecord> = serde_json::from_str(&data)?;
    let mut records: Vec<RadioRecord> = Vec::with_capacity(raw.len());
    for mut record in raw {
        record.radio_id = normalize_radio_id(&record.radio_id);
        if record.radio_id.is_empty() || records.iter().any(|r| r.radio_id == record.radio_id) {
            warn!(
                "Skipping invalid or duplicate radio ID '{}' in {}",
                record.radio_id,
                path.display()
            );
            continue;
        }
        records.push(record);
    }
    Ok(records)
}

fn write_atomic(path: &Path, records: &[RadioRecord]) -> StoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_vec_pretty(records)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
