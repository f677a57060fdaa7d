//! The declarative artifact index (`artifacts.yaml`).
//!
//! Canonical shape is a flat mapping from artifact name to metadata.
//! The legacy list form (`[{name, type, path, ...}]`) is accepted on read
//! and converted. Unknown keys are preserved under `custom` so forward
//! additions survive a read-modify-write cycle.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::name::ArtifactName;

fn default_virtual() -> bool {
    true
}

fn is_true(b: &bool) -> bool {
    *b
}

/// Per-artifact metadata as of one commit (or the working tree).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// True means the registry does not pin the artifact's bytes to a
    /// commit.
    #[serde(
        rename = "virtual",
        default = "default_virtual",
        skip_serializing_if = "is_true"
    )]
    pub is_virtual: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Forward-compatible passthrough for keys this version does not know.
    #[serde(flatten)]
    pub custom: BTreeMap<String, serde_yaml::Value>,
}

impl Default for IndexEntry {
    fn default() -> Self {
        Self {
            artifact_type: None,
            path: None,
            is_virtual: true,
            labels: Vec::new(),
            description: None,
            custom: BTreeMap::new(),
        }
    }
}

/// A normalized index: artifact name to metadata.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactIndex {
    pub entries: BTreeMap<ArtifactName, IndexEntry>,
}

impl ArtifactIndex {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &ArtifactName) -> Option<&IndexEntry> {
        self.entries.get(name)
    }
}

#[derive(Deserialize)]
struct LegacyRow {
    name: String,
    #[serde(flatten)]
    entry: IndexEntry,
}

/// Parse index bytes, detecting the top-level shape. Errors return a
/// human reason; callers decide whether it is fatal (HEAD/worktree) or a
/// warning (historical commit).
pub fn parse(bytes: &[u8]) -> Result<ArtifactIndex, String> {
    let value: serde_yaml::Value =
        serde_yaml::from_slice(bytes).map_err(|e| e.to_string())?;
    match value {
        serde_yaml::Value::Null => Ok(ArtifactIndex::default()),
        serde_yaml::Value::Mapping(_) => {
            let raw: BTreeMap<String, Option<IndexEntry>> =
                serde_yaml::from_value(value).map_err(|e| e.to_string())?;
            let mut entries = BTreeMap::new();
            for (name, entry) in raw {
                let name = ArtifactName::parse(name).map_err(|e| e.to_string())?;
                entries.insert(name, entry.unwrap_or_default());
            }
            Ok(ArtifactIndex { entries })
        }
        serde_yaml::Value::Sequence(_) => {
            let rows: Vec<LegacyRow> =
                serde_yaml::from_value(value).map_err(|e| e.to_string())?;
            let mut entries = BTreeMap::new();
            for row in rows {
                let name = ArtifactName::parse(row.name).map_err(|e| e.to_string())?;
                entries.insert(name, row.entry);
            }
            Ok(ArtifactIndex { entries })
        }
        other => Err(format!(
            "expected a mapping or a list at the top level, got {}",
            yaml_kind(&other)
        )),
    }
}

fn yaml_kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "a bool",
        serde_yaml::Value::Number(_) => "a number",
        serde_yaml::Value::String(_) => "a string",
        serde_yaml::Value::Sequence(_) => "a list",
        serde_yaml::Value::Mapping(_) => "a mapping",
        serde_yaml::Value::Tagged(_) => "a tagged value",
    }
}

/// Read the index from the working tree. Missing file means an empty
/// index; a malformed file is fatal here (the user can fix what they can
/// see).
pub fn read_worktree(root: &Path, index_path: &str) -> Result<ArtifactIndex, ConfigError> {
    let path = root.join(index_path);
    if !path.exists() {
        return Ok(ArtifactIndex::default());
    }
    let bytes = fs::read(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    parse(&bytes).map_err(|reason| ConfigError::MalformedIndex {
        path: path.display().to_string(),
        reason,
    })
}

/// Write the index back to the working tree in the canonical flat form,
/// atomically.
pub fn write_worktree(
    root: &Path,
    index_path: &str,
    index: &ArtifactIndex,
) -> Result<(), ConfigError> {
    let path = root.join(index_path);
    let contents = serde_yaml::to_string(index).map_err(|e| ConfigError::Write {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    let dir = path.parent().ok_or_else(|| ConfigError::Write {
        path: path.clone(),
        reason: "index path has no parent directory".to_string(),
    })?;
    let temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ConfigError::Write {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    fs::write(temp.path(), contents).map_err(|e| ConfigError::Write {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    temp.persist(&path).map_err(|e| ConfigError::Write {
        path,
        reason: e.to_string(),
    })?;
    Ok(())
}
