//! Save files and exports on disk.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::ledger::ProgressionLedger;
use crate::stats::GameExport;

/// Metadata describing a save on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveEntry {
    /// Absolute path to the save file.
    pub path: PathBuf,
    /// Human readable save name.
    pub name: String,
    /// Day the run had reached.
    pub day: u32,
    /// Cash at the time of saving.
    pub cash: i64,
    /// When the save was last written.
    pub updated_at: DateTime<Utc>,
}

/// Serialized form of a save file. The ledger is kept as a raw value so a
/// damaged ledger still lists and is only refused when loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePayload {
    name: String,
    saved_at: DateTime<Utc>,
    #[serde(default)]
    ledger: Value,
}

impl SavePayload {
    fn new(name: Option<&str>, ledger: Value) -> Self {
        let saved_at = Utc::now();
        let name = name
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Day {}", field_u64(&ledger, "day").unwrap_or(1)));
        Self {
            name,
            saved_at,
            ledger,
        }
    }

    /// Consume the payload and return the stored ledger data.
    pub fn into_ledger(self) -> Value {
        self.ledger
    }

    /// Decode and validate the stored ledger.
    pub fn decode(&self) -> Result<ProgressionLedger> {
        ProgressionLedger::from_value(self.ledger.clone()).context("save holds an invalid ledger")
    }

    fn entry(&self, path: PathBuf) -> SaveEntry {
        SaveEntry {
            path,
            name: self.name.clone(),
            day: field_u64(&self.ledger, "day").unwrap_or(1) as u32,
            cash: self.ledger.get("cash").and_then(Value::as_i64).unwrap_or(0),
            updated_at: self.saved_at,
        }
    }
}

fn field_u64(value: &Value, key: &str) -> Option<u64> {
    value.get(key).and_then(Value::as_u64)
}

/// Reads and writes save files under one directory.
pub struct SaveManager {
    root: PathBuf,
}

impl SaveManager {
    /// Create a manager rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All readable saves, most recent first.
    pub fn entries(&self) -> Result<Vec<SaveEntry>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.root).context("failed to read save directory")? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            match self.read_payload(&path) {
                Ok(payload) => entries.push(payload.entry(path)),
                Err(err) => {
                    warn!("Skipping unreadable save {:?}: {err}", path);
                }
            }
        }

        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(entries)
    }

    /// Write a new save file holding an encoded ledger.
    pub fn create_save(&self, ledger: Value, name: Option<&str>) -> Result<SaveEntry> {
        let payload = SavePayload::new(name, ledger);
        let file_name = format!(
            "{}_{}.json",
            sanitize_component(&payload.name),
            payload.saved_at.format("%Y%m%d%H%M%S%3f")
        );
        let path = self.root.join(file_name);
        self.write_json(&path, &payload)?;
        info!(path = %path.display(), name = %payload.name, "Game saved");
        Ok(payload.entry(path))
    }

    /// Overwrite an existing save with a newer ledger, keeping its name.
    pub fn update_save(&self, entry: &SaveEntry, ledger: Value) -> Result<SaveEntry> {
        let mut payload = self.read_payload(&entry.path)?;
        payload.ledger = ledger;
        payload.saved_at = Utc::now();
        self.write_json(&entry.path, &payload)?;
        Ok(payload.entry(entry.path.clone()))
    }

    /// Read the payload behind `entry`.
    pub fn load(&self, entry: &SaveEntry) -> Result<SavePayload> {
        self.read_payload(&entry.path)
    }

    /// Most recent save, if any.
    pub fn latest(&self) -> Result<Option<SaveEntry>> {
        Ok(self.entries()?.into_iter().next())
    }

    /// Write an export document next to the saves and return its path.
    pub fn write_export(&self, export: &GameExport) -> Result<PathBuf> {
        let file_name = format!(
            "export_day{}_{}.json",
            export.game_state.day,
            export.game_info.exported_at.format("%Y%m%d%H%M%S")
        );
        let path = self.root.join("exports").join(file_name);
        self.write_json(&path, export)?;
        info!(path = %path.display(), "Game data exported");
        Ok(path)
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let serialised = serde_json::to_vec_pretty(value)?;
        fs::write(path, serialised).with_context(|| format!("failed to write {}", path.display()))
    }

    fn read_payload(&self, path: impl AsRef<Path>) -> Result<SavePayload> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let payload = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(payload)
    }
}

fn sanitize_component(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_') {
            result.push(ch);
        }
    }
    if result.is_empty() {
        "save".to_string()
    } else {
        result
    }
}
