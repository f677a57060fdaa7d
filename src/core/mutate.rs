//! Mutator: validates a requested action against the assembled state and
//! returns the tag plan that realizes it.
//!
//! Plans are data. The caller (CLI) applies them through the git adapter,
//! checking cancellation before each write and rolling back earlier
//! writes of the same plan if a later one fails.

use serde::Serialize;

use crate::Result;
use crate::config::RegistryConfig;
use crate::error::{ConflictError, NotFoundError, PreconditionError, ValidationError};

use super::event::EventKind;
use super::index::{ArtifactIndex, IndexEntry};
use super::name::{ArtifactName, Stage};
use super::state::{ArtifactState, RegistryState};
use super::tag::{self, ParsedTag, TagAction};
use super::version::{self, BumpPart};

/// One annotated tag to create.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TagWrite {
    pub tag: String,
    pub message: String,
    /// Commit sha the tag points at.
    pub target: String,
}

/// A replacement index to write to the working tree.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IndexEdit {
    pub index: ArtifactIndex,
}

pub struct Mutator<'a> {
    state: &'a RegistryState,
    config: &'a RegistryConfig,
}

impl<'a> Mutator<'a> {
    pub fn new(state: &'a RegistryState, config: &'a RegistryConfig) -> Self {
        Self { state, config }
    }

    fn artifact(&self, name: &ArtifactName) -> Result<&'a ArtifactState> {
        self.state
            .find_artifact(name)
            .ok_or_else(|| {
                NotFoundError::Artifact {
                    name: name.to_string(),
                }
                .into()
            })
    }

    fn write(&self, name: &ArtifactName, action: TagAction, message: String, target: &str) -> Result<TagWrite> {
        let tag = tag::format(&ParsedTag {
            name: name.clone(),
            action,
        });
        if self.state.tag_names.contains(&tag) {
            return Err(ConflictError { tag }.into());
        }
        Ok(TagWrite {
            tag,
            message,
            target: target.to_string(),
        })
    }

    fn greatest_active(&self, artifact: &ArtifactState) -> Option<String> {
        version::greatest(
            artifact
                .versions
                .iter()
                .filter(|v| v.is_active() && !v.discovered)
                .map(|v| v.version.as_str()),
            self.config.version_convention,
            true,
        )
        .map(str::to_string)
    }

    /// Plan a version registration at `target` (already resolved to a
    /// commit sha). With no explicit version the next one is computed by
    /// bumping the greatest existing version.
    pub fn register(
        &self,
        name: &ArtifactName,
        target: &str,
        explicit: Option<&str>,
        bump: Option<BumpPart>,
        force: bool,
    ) -> Result<Vec<TagWrite>> {
        let convention = self.config.version_convention;
        let artifact = self.state.find_artifact(name);

        if let Some(artifact) = artifact {
            if artifact.deprecated && !force {
                return Err(PreconditionError::ArtifactDeprecated {
                    name: name.to_string(),
                }
                .into());
            }
            if !force
                && let Some(existing) = artifact
                    .versions
                    .iter()
                    .find(|v| !v.discovered && v.is_active() && v.commit == target)
            {
                return Err(PreconditionError::VersionExistsForCommit {
                    name: name.to_string(),
                    version: existing.version.clone(),
                    commit: target.to_string(),
                }
                .into());
            }
        }

        let chosen = match explicit {
            Some(raw) => {
                if !version::is_valid(raw, convention) {
                    return Err(ValidationError::InvalidVersion {
                        raw: raw.to_string(),
                        convention: convention.as_str().to_string(),
                    }
                    .into());
                }
                if let Some(artifact) = artifact {
                    // Version strings are never reused, even after a
                    // deregistration.
                    if artifact.versions.iter().any(|v| !v.discovered && v.version == raw) {
                        return Err(PreconditionError::VersionAlreadyRegistered {
                            name: name.to_string(),
                            version: raw.to_string(),
                            tag: format!("{name}@{raw}"),
                        }
                        .into());
                    }
                    if !force
                        && let Some(latest) = self.greatest_active(artifact)
                        && version::compare(raw, &latest, convention)? == std::cmp::Ordering::Less
                    {
                        return Err(PreconditionError::VersionIsOld {
                            name: name.to_string(),
                            latest,
                            suggested: raw.to_string(),
                        }
                        .into());
                    }
                }
                raw.to_string()
            }
            None => {
                let base = artifact.and_then(|a| self.greatest_active(a));
                version::bump(base.as_deref(), bump, convention)?
            }
        };

        let message = format!("Registering artifact {name} version {chosen}");
        Ok(vec![self.write(
            name,
            TagAction::Register { version: chosen },
            message,
            target,
        )?])
    }

    /// Plan a deregistration tag for a registered version.
    pub fn deregister(&self, name: &ArtifactName, version: &str) -> Result<Vec<TagWrite>> {
        let artifact = self.artifact(name)?;
        let state = artifact.find_version(version).ok_or_else(|| NotFoundError::Version {
            name: name.to_string(),
            version: version.to_string(),
        })?;
        if !state.is_active() {
            return Err(PreconditionError::VersionNotRegistered {
                name: name.to_string(),
                version: version.to_string(),
            }
            .into());
        }
        let message = format!("Deregistering artifact {name} version {version}");
        Ok(vec![self.write(
            name,
            TagAction::Deregister {
                version: version.to_string(),
            },
            message,
            &state.commit,
        )?])
    }

    /// Tags to delete so the version never happened: the registration tag
    /// plus every stage event resolved to it.
    pub fn deregister_delete(&self, name: &ArtifactName, version: &str) -> Result<Vec<String>> {
        let artifact = self.artifact(name)?;
        let state = artifact.find_version(version).ok_or_else(|| NotFoundError::Version {
            name: name.to_string(),
            version: version.to_string(),
        })?;
        let mut tags: Vec<String> = artifact
            .history
            .iter()
            .filter(|e| {
                e.version.as_deref() == Some(version)
                    && matches!(
                        e.kind,
                        EventKind::Registration
                            | EventKind::Deregistration
                            | EventKind::Assignment
                            | EventKind::Unassignment
                    )
            })
            .map(|e| e.reference.clone())
            .collect();
        tags.extend(state.assignment_history.iter().map(|e| e.reference.clone()));
        tags.sort();
        tags.dedup();
        Ok(tags)
    }

    /// Plan a stage assignment. Exactly one of `to_version` / `at_commit`
    /// must be given; assigning at a commit with no registered version
    /// first registers one, producing a two-tag plan applied in order.
    pub fn assign(
        &self,
        name: &ArtifactName,
        stage: &Stage,
        to_version: Option<&str>,
        at_commit: Option<&str>,
        bump: Option<BumpPart>,
        force: bool,
    ) -> Result<Vec<TagWrite>> {
        self.config.assert_stage(stage.as_str())?;
        let mut plan = Vec::new();

        let (target, version) = match (to_version, at_commit) {
            (Some(_), Some(_)) | (None, None) => {
                return Err(ValidationError::VersionXorRef.into());
            }
            (Some(raw), None) => {
                let artifact = self.artifact(name)?;
                let state = artifact.find_version(raw).ok_or_else(|| NotFoundError::Version {
                    name: name.to_string(),
                    version: raw.to_string(),
                })?;
                if !state.is_active() {
                    return Err(PreconditionError::VersionNotRegistered {
                        name: name.to_string(),
                        version: raw.to_string(),
                    }
                    .into());
                }
                (state.commit.clone(), raw.to_string())
            }
            (None, Some(commit)) => {
                let existing = self
                    .state
                    .find_artifact(name)
                    .and_then(|a| {
                        a.versions
                            .iter()
                            .find(|v| v.is_active() && !v.discovered && v.commit == commit)
                    })
                    .map(|v| v.version.clone());
                match existing {
                    Some(version) => (commit.to_string(), version),
                    None => {
                        let base = self
                            .state
                            .find_artifact(name)
                            .and_then(|a| self.greatest_active(a));
                        let next = version::bump(
                            base.as_deref(),
                            bump,
                            self.config.version_convention,
                        )?;
                        let mut registration =
                            self.register(name, commit, Some(&next), bump, force)?;
                        plan.append(&mut registration);
                        (commit.to_string(), next)
                    }
                }
            }
        };

        let seq = self
            .state
            .find_artifact(name)
            .map(|a| a.assignment_seq_max())
            .unwrap_or(0)
            + 1;
        let message = format!("Assigning stage {stage} to artifact {name} version {version}");
        plan.push(self.write(
            name,
            TagAction::Assign {
                stage: stage.clone(),
                seq: Some(seq),
            },
            message,
            &target,
        )?);
        Ok(plan)
    }

    /// Plan a stage unassignment. The stage must currently be assigned.
    pub fn unassign(&self, name: &ArtifactName, stage: &Stage) -> Result<Vec<TagWrite>> {
        let artifact = self.artifact(name)?;
        let current = artifact
            .stages
            .get(stage)
            .filter(|s| !s.current.is_empty())
            .ok_or_else(|| PreconditionError::StageNotAssigned {
                name: name.to_string(),
                stage: stage.to_string(),
            })?;
        let holder = &current.current[0];
        let target = artifact
            .find_version(holder)
            .map(|v| v.commit.clone())
            .ok_or_else(|| NotFoundError::Version {
                name: name.to_string(),
                version: holder.clone(),
            })?;
        let seq = artifact.assignment_seq_max() + 1;
        let message = format!("Unassigning stage {stage} from artifact {name}");
        Ok(vec![self.write(
            name,
            TagAction::Unassign {
                stage: stage.clone(),
                seq: Some(seq),
            },
            message,
            &target,
        )?])
    }

    /// Tags to delete to erase a stage's assignment history.
    pub fn unassign_delete(&self, name: &ArtifactName, stage: &Stage) -> Result<Vec<String>> {
        let artifact = self.artifact(name)?;
        let state = artifact.stages.get(stage).ok_or_else(|| NotFoundError::Stage {
            name: name.to_string(),
            stage: stage.to_string(),
        })?;
        let mut tags: Vec<String> = state.history.iter().map(|e| e.reference.clone()).collect();
        tags.sort();
        tags.dedup();
        Ok(tags)
    }

    /// Plan an artifact-level deprecation. Idempotent: an already
    /// deprecated artifact yields an empty plan.
    pub fn deprecate(&self, name: &ArtifactName, target: &str) -> Result<Vec<TagWrite>> {
        let artifact = self.artifact(name)?;
        if artifact.deprecated {
            return Ok(Vec::new());
        }
        let seq = match artifact.deprecation_seq_max {
            0 => None,
            max => Some(max + 1),
        };
        let message = format!("Deprecating artifact {name}");
        Ok(vec![self.write(
            name,
            TagAction::Deprecate { seq },
            message,
            target,
        )?])
    }

    /// Tags to delete to erase all deprecation events.
    pub fn deprecate_delete(&self, name: &ArtifactName) -> Result<Vec<String>> {
        let artifact = self.artifact(name)?;
        Ok(artifact
            .history
            .iter()
            .filter(|e| e.kind == EventKind::Deprecation)
            .map(|e| e.reference.clone())
            .collect())
    }

    /// Upsert index metadata for an artifact in the working tree.
    pub fn annotate(
        &self,
        worktree: &ArtifactIndex,
        name: &ArtifactName,
        artifact_type: Option<String>,
        path: Option<String>,
        is_virtual: Option<bool>,
        labels: Vec<String>,
        description: Option<String>,
    ) -> Result<IndexEdit> {
        if let Some(ty) = artifact_type.as_deref() {
            self.config.assert_type(ty)?;
        }
        let mut index = worktree.clone();
        let entry = index.entries.entry(name.clone()).or_insert_with(IndexEntry::default);
        if artifact_type.is_some() {
            entry.artifact_type = artifact_type;
        }
        if path.is_some() {
            entry.path = path;
        }
        if let Some(v) = is_virtual {
            entry.is_virtual = v;
        }
        if !labels.is_empty() {
            entry.labels = labels;
            entry.labels.sort();
            entry.labels.dedup();
        }
        if description.is_some() {
            entry.description = description;
        }
        Ok(IndexEdit { index })
    }

    /// Drop an artifact's entry from the working-tree index.
    pub fn remove(&self, worktree: &ArtifactIndex, name: &ArtifactName) -> Result<IndexEdit> {
        let mut index = worktree.clone();
        if index.entries.remove(name).is_none() {
            return Err(NotFoundError::Artifact {
                name: name.to_string(),
            }
            .into());
        }
        Ok(IndexEdit { index })
    }
}
