use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Slot holding the knowledge point collection.
pub const KNOWLEDGE_POINTS_SLOT: &str = "knowledge_points";
/// Slot holding the review schedule collection.
pub const REVIEW_SCHEDULES_SLOT: &str = "review_schedules";

const LAUNCHED_SLOT: &str = "has_launched";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("item not found")]
    NotFound,
    #[error("invalid data format: {0}")]
    InvalidFormat(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Durable storage for whole collections, one JSON file per named slot.
///
/// Every read re-decodes the backing file and every save rewrites it in
/// full; there is no in-memory cache and no per-record update. Load and
/// save failures on the normal paths are swallowed (warn-logged) rather
/// than surfaced: a slot that fails to decode reads as empty, and a save
/// that fails to encode or write leaves the previously persisted state in
/// place. Callers that mutate must treat load -> mutate -> save as a
/// single-writer critical section.
pub struct SlotStore {
    dir: PathBuf,
}

impl SlotStore {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        self.dir.join(format!("{}.json", slot))
    }

    /// Read and decode a slot. Absent or undecodable slots read as empty.
    pub fn load_all<T: DeserializeOwned>(&self, slot: &str) -> Vec<T> {
        let raw = match fs::read_to_string(self.slot_path(slot)) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str(&raw) {
            Ok(items) => items,
            Err(e) => {
                warn!("slot '{}' failed to decode, treating as empty: {}", slot, e);
                Vec::new()
            }
        }
    }

    /// Encode and overwrite a slot. On failure the previous file survives.
    pub fn save_all<T: Serialize>(&self, slot: &str, items: &[T]) {
        let json = match serde_json::to_string(items) {
            Ok(json) => json,
            Err(e) => {
                warn!("slot '{}' failed to encode, keeping previous state: {}", slot, e);
                return;
            }
        };
        if let Err(e) = self.replace_slot(slot, &json) {
            warn!("slot '{}' failed to write, keeping previous state: {}", slot, e);
        }
    }

    // Write to a temp file then rename, so an interrupted write never
    // clobbers the slot.
    fn replace_slot(&self, slot: &str, json: &str) -> std::io::Result<()> {
        let path = self.slot_path(slot);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)
    }

    pub fn has_launched(&self) -> bool {
        fs::read_to_string(self.slot_path(LAUNCHED_SLOT))
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or(false)
    }

    pub fn mark_launched(&self) {
        if let Err(e) = self.replace_slot(LAUNCHED_SLOT, "true") {
            warn!("failed to persist launch flag: {}", e);
        }
    }
}
