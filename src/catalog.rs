//! Persistent catalog of validated command-name → frame mappings.
//!
//! The catalog is a single JSON file holding the *entire* mapping; every
//! mutation rewrites the whole file atomically (temp file in the same
//! directory, then rename) so an interrupted save never leaves a
//! half-written catalog behind.
//!
//! # Schema
//!
//! Version 2, the only shape written:
//!
//! ```json
//! {
//!   "version": 2,
//!   "commands": {
//!     "living_room_light": {
//!       "on": "AA 55 30 BC 00 0E 01 01 65 00 0D 0D",
//!       "off": "AA 55 30 BC 00 0E 01 00 65 00 0D 0D",
//!       "captured_at": "2026-08-29T10:15:00Z",
//!       "verified": true
//!     }
//!   }
//! }
//! ```
//!
//! A single-action command is a degenerate pair with `off: null`. Two
//! legacy shapes from earlier capture tools — a flat name→hex map, and an
//! unversioned name→`{ON, OFF, captured_at}` map — are migrated on load and
//! written back as version 2 on the next save.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::frame::Frame;

/// Current on-disk schema version.
const SCHEMA_VERSION: u32 = 2;

/// One validated command: canonical frame(s) plus capture metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Canonical frame for the command (or its ON half), hex text form.
    pub on: String,
    /// Canonical OFF frame for paired commands; `None` for single-action
    /// commands.
    pub off: Option<String>,
    /// When the capture session that produced this entry completed.
    pub captured_at: DateTime<Utc>,
    /// Whether the operator confirmed the real-world effect after replay.
    pub verified: bool,
}

impl CatalogEntry {
    /// Builds an entry from canonical frames, stamped now.
    pub fn new(on: &Frame, off: Option<&Frame>, verified: bool) -> Self {
        Self {
            on: on.to_hex(),
            off: off.map(Frame::to_hex),
            captured_at: Utc::now(),
            verified,
        }
    }

    /// Parses the stored hex back into frames.
    pub fn frames(&self) -> Result<(Frame, Option<Frame>)> {
        let on = Frame::from_hex(&self.on)
            .with_context(|| format!("catalog entry has invalid ON frame {:?}", self.on))?;
        let off = match &self.off {
            Some(hex) => Some(
                Frame::from_hex(hex)
                    .with_context(|| format!("catalog entry has invalid OFF frame {hex:?}"))?,
            ),
            None => None,
        };
        Ok((on, off))
    }
}

/// Serialized file shape.
#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    version: u32,
    commands: BTreeMap<String, CatalogEntry>,
}

/// The catalog store: full mapping in memory, whole-file atomic persistence.
#[derive(Debug)]
pub struct CatalogStore {
    path: PathBuf,
    commands: BTreeMap<String, CatalogEntry>,
}

impl CatalogStore {
    /// Loads the catalog at `path`, migrating legacy shapes if needed.
    /// A missing file yields an empty catalog.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                commands: BTreeMap::new(),
            });
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read catalog at {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Catalog at {} is not valid JSON", path.display()))?;

        let version = value.get("version").and_then(serde_json::Value::as_u64);
        let commands = match version {
            Some(v) if v == u64::from(SCHEMA_VERSION) => {
                let file: CatalogFile = serde_json::from_value(value)
                    .context("Failed to parse version-2 catalog")?;
                file.commands
            }
            Some(v) => bail!("Unsupported catalog version {v} in {}", path.display()),
            None => {
                let migrated = migrate_legacy(&value)
                    .with_context(|| format!("Failed to migrate legacy catalog {}", path.display()))?;
                log::info!(
                    "migrated legacy catalog {} ({} commands)",
                    path.display(),
                    migrated.len()
                );
                migrated
            }
        };

        Ok(Self { path, commands })
    }

    /// True if a command of this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Looks up one entry.
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.commands.get(name)
    }

    /// All entries in name order.
    pub fn list(&self) -> impl Iterator<Item = (&str, &CatalogEntry)> {
        self.commands.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of cataloged commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True if no commands are cataloged.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Inserts or overwrites an entry and persists the whole mapping.
    ///
    /// Overwriting an existing name is the caller's decision to make; the
    /// operator must have confirmed it before this is called.
    pub fn upsert(&mut self, name: &str, entry: CatalogEntry) -> Result<()> {
        self.commands.insert(name.to_string(), entry);
        self.save()
    }

    /// Removes one entry and persists. Errors if the name is unknown.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        if self.commands.remove(name).is_none() {
            bail!("no command named {name:?} in the catalog");
        }
        self.save()
    }

    /// Removes every entry and persists. Callers must have obtained the
    /// stronger wipe confirmation first.
    pub fn wipe(&mut self) -> Result<()> {
        self.commands.clear();
        self.save()
    }

    /// Atomically rewrites the catalog file.
    ///
    /// On any failure the previous on-disk state is left intact.
    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let file = CatalogFile {
            version: SCHEMA_VERSION,
            commands: self.commands.clone(),
        };
        let mut json = serde_json::to_string_pretty(&file)?;
        json.push('\n');

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

/// Converts either legacy shape into the version-2 command map.
///
/// - flat map: `{"name": "AA 55 ..."}`
/// - paired map: `{"name": {"ON": "...", "OFF": "...", "captured_at": "..."}}`
fn migrate_legacy(value: &serde_json::Value) -> Result<BTreeMap<String, CatalogEntry>> {
    let obj = value
        .as_object()
        .context("legacy catalog root is not an object")?;

    let mut commands = BTreeMap::new();
    for (name, v) in obj {
        let entry = match v {
            serde_json::Value::String(hex) => CatalogEntry {
                on: hex.clone(),
                off: None,
                captured_at: Utc::now(),
                verified: false,
            },
            serde_json::Value::Object(fields) => {
                let on = fields
                    .get("ON")
                    .and_then(|x| x.as_str())
                    .with_context(|| format!("legacy entry {name:?} has no ON frame"))?;
                let off = fields.get("OFF").and_then(|x| x.as_str());
                CatalogEntry {
                    on: on.to_string(),
                    off: off.map(str::to_string),
                    captured_at: parse_legacy_timestamp(
                        fields.get("captured_at").and_then(|x| x.as_str()),
                    ),
                    verified: false,
                }
            }
            other => bail!("legacy entry {name:?} has unexpected shape: {other}"),
        };
        commands.insert(name.clone(), entry);
    }
    Ok(commands)
}

/// Legacy files stamped entries as naive local `%Y-%m-%d %H:%M:%S`; absent
/// or unparseable stamps fall back to the migration time.
fn parse_legacy_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or_else(Utc::now)
}
