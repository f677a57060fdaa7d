//! Registry configuration.
//!
//! A `.gto` YAML file at the repository root, overridden by `GTO_*`
//! environment variables. All options have working defaults so a repo
//! with no config file behaves sensibly.

use serde::{Deserialize, Serialize};

use crate::core::{Convention, SortOrder};
use crate::error::ValidationError;

mod load;

pub use load::{load, load_for_repo};

pub const CONFIG_FILE_NAME: &str = ".gto";
pub const DEFAULT_INDEX: &str = "artifacts.yaml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Allow-list of artifact types; empty means any.
    pub types: Vec<String>,

    /// Allow-list of stage names; empty means any.
    pub stages: Vec<String>,

    /// Version naming convention for new registrations.
    pub version_convention: Convention,

    /// Render decorative glyphs in human output.
    pub emojis: bool,

    /// Path of the index file, relative to the repo root.
    pub index: String,

    /// Order used by "greatest version" queries.
    pub sort: SortOrder,

    /// At most one stage per version; assigning a stage displaces others
    /// in the computed view.
    pub kanban: bool,

    /// Allow several versions to hold the same stage concurrently.
    pub multi_stage: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            types: Vec::new(),
            stages: Vec::new(),
            version_convention: Convention::default(),
            emojis: true,
            index: DEFAULT_INDEX.to_string(),
            sort: SortOrder::default(),
            kanban: false,
            multi_stage: false,
        }
    }
}

impl RegistryConfig {
    /// Check a stage name against the allow-list, if one is configured.
    pub fn assert_stage(&self, stage: &str) -> Result<(), ValidationError> {
        if !self.stages.is_empty() && !self.stages.iter().any(|s| s == stage) {
            return Err(ValidationError::StageNotAllowed {
                stage: stage.to_string(),
                allowed: self.stages.clone(),
            });
        }
        Ok(())
    }

    /// Check an artifact type against the allow-list, if one is configured.
    pub fn assert_type(&self, ty: &str) -> Result<(), ValidationError> {
        if !self.types.is_empty() && !self.types.iter().any(|t| t == ty) {
            return Err(ValidationError::TypeNotAllowed {
                ty: ty.to_string(),
                allowed: self.types.clone(),
            });
        }
        Ok(())
    }
}
