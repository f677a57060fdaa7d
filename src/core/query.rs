//! Read-only queries over the assembled registry state.
//!
//! Everything here is a pure function of [`RegistryState`]; nothing
//! touches the repository.

use std::collections::BTreeMap;

use serde::Serialize;
use time::OffsetDateTime;

use crate::error::NotFoundError;

use super::event::{Event, EventKind, Marker};
use super::index::IndexEntry;
use super::name::{ArtifactName, Stage};
use super::state::{ArtifactState, RegistryState, VersionState};
use super::tag::{self, ParsedTag};
use super::version::Convention;

/// One line of the registry overview: latest version and the current
/// version per stage.
#[derive(Clone, Debug, Serialize)]
pub struct ShowRow {
    pub name: ArtifactName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
    pub stages: BTreeMap<Stage, Vec<String>>,
    pub deprecated: bool,
    /// Present in the index but never tagged.
    pub annotation_only: bool,
}

/// One line of a per-artifact version listing.
#[derive(Clone, Debug, Serialize)]
pub struct VersionRow {
    pub version: String,
    pub commit: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub author: String,
    pub registered: bool,
    pub deregistered: bool,
    pub discovered: bool,
    pub stages: Vec<Stage>,
}

impl VersionRow {
    fn from_state(version: &VersionState) -> Self {
        Self {
            version: version.version.clone(),
            commit: version.commit.clone(),
            created_at: version.created_at,
            author: version.author.clone(),
            registered: version.registered,
            deregistered: version.deregistered,
            discovered: version.discovered,
            stages: version.stages.iter().cloned().collect(),
        }
    }
}

/// A history line: either a real event or a degradation notice for a
/// stage whose tags lack counters.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "row", rename_all = "snake_case")]
pub enum HistoryRow {
    Event(Event),
    /// Simple-form tags make per-stage ordering unreliable; the stage's
    /// assignment rows are collapsed into this single conflict entry.
    Degraded {
        artifact: ArtifactName,
        stage: Stage,
        tag: String,
        marker: Marker,
    },
}

fn find<'a>(
    state: &'a RegistryState,
    name: &ArtifactName,
) -> Result<&'a ArtifactState, NotFoundError> {
    state.find_artifact(name).ok_or_else(|| NotFoundError::Artifact {
        name: name.to_string(),
    })
}

/// Registry overview, one row per artifact.
pub fn show(state: &RegistryState) -> Vec<ShowRow> {
    state
        .artifacts
        .values()
        .map(|artifact| ShowRow {
            name: artifact.name.clone(),
            latest: state
                .latest_version(artifact)
                .map(|v| v.version.clone()),
            stages: artifact
                .stages
                .iter()
                .filter(|(_, s)| !s.current.is_empty())
                .map(|(stage, s)| (stage.clone(), s.current.clone()))
                .collect(),
            deprecated: artifact.deprecated,
            annotation_only: artifact.is_annotation_only(),
        })
        .collect()
}

/// Versions of one artifact. Deregistered and discovered versions appear
/// only when `all` is set.
pub fn show_artifact(
    state: &RegistryState,
    name: &ArtifactName,
    all: bool,
) -> Result<Vec<VersionRow>, NotFoundError> {
    let artifact = find(state, name)?;
    Ok(artifact
        .versions
        .iter()
        .filter(|v| all || v.is_active())
        .map(VersionRow::from_state)
        .collect())
}

fn artifact_history(artifact: &ArtifactState) -> Vec<HistoryRow> {
    let mut rows = Vec::with_capacity(artifact.history.len());
    let mut degraded_emitted: Vec<&Stage> = Vec::new();
    for event in &artifact.history {
        let degraded_stage = event
            .stage
            .as_ref()
            .filter(|s| artifact.simple_stages.contains(s));
        match degraded_stage {
            Some(stage) => {
                if !degraded_emitted.contains(&stage) {
                    degraded_emitted.push(stage);
                    rows.push(HistoryRow::Degraded {
                        artifact: artifact.name.clone(),
                        stage: stage.clone(),
                        tag: event.reference.clone(),
                        marker: Marker::Conflict,
                    });
                }
            }
            None => rows.push(HistoryRow::Event(event.clone())),
        }
    }
    rows
}

/// Event history in display order, for one artifact or the whole
/// registry.
pub fn history(
    state: &RegistryState,
    name: Option<&ArtifactName>,
) -> Result<Vec<HistoryRow>, NotFoundError> {
    match name {
        Some(name) => Ok(artifact_history(find(state, name)?)),
        None => {
            let mut rows: Vec<HistoryRow> = state
                .artifacts
                .values()
                .flat_map(artifact_history)
                .collect();
            rows.sort_by(|a, b| row_key(a).cmp(&row_key(b)));
            Ok(rows)
        }
    }
}

fn row_key(row: &HistoryRow) -> (OffsetDateTime, OffsetDateTime, u64, String) {
    match row {
        HistoryRow::Event(e) => {
            let (a, b, c, d) = e.order_key();
            (a, b, c, d.to_string())
        }
        HistoryRow::Degraded { tag, .. } => (
            OffsetDateTime::UNIX_EPOCH,
            OffsetDateTime::UNIX_EPOCH,
            0,
            tag.clone(),
        ),
    }
}

/// Greatest registered, non-deregistered version under the configured
/// sort.
pub fn latest(
    state: &RegistryState,
    name: &ArtifactName,
) -> Result<Option<VersionRow>, NotFoundError> {
    let artifact = find(state, name)?;
    Ok(state.latest_version(artifact).map(VersionRow::from_state))
}

/// Version(s) currently holding `stage`. Empty means the stage is not
/// assigned.
pub fn which(
    state: &RegistryState,
    name: &ArtifactName,
    stage: &Stage,
) -> Result<Vec<String>, NotFoundError> {
    let artifact = find(state, name)?;
    Ok(artifact
        .stages
        .get(stage)
        .map(|s| s.current.clone())
        .unwrap_or_default())
}

/// Latest index metadata for the artifact.
pub fn describe(
    state: &RegistryState,
    name: &ArtifactName,
) -> Result<Option<IndexEntry>, NotFoundError> {
    let artifact = find(state, name)?;
    Ok(artifact.meta.clone())
}

/// Sorted stage names in use, merged with the configured allow-list.
pub fn stages(state: &RegistryState, allowed: &[String]) -> Vec<Stage> {
    let mut out: Vec<Stage> = state
        .artifacts
        .values()
        .flat_map(|a| a.stages.keys().cloned())
        .chain(allowed.iter().filter_map(|s| Stage::parse(s.clone()).ok()))
        .collect();
    out.sort();
    out.dedup();
    out
}

/// What `check-ref` returns: the decoded tag plus the event the registry
/// actually recorded for it, when one exists.
#[derive(Clone, Debug, Serialize)]
pub struct RefCheck {
    pub tag: ParsedTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<Event>,
}

/// Classify a ref name and enrich it from the state.
pub fn check_ref(
    state: &RegistryState,
    raw: &str,
    convention: Convention,
) -> crate::Result<RefCheck> {
    let parsed = tag::parse_strict(raw, convention)?;
    let event = state
        .find_artifact(&parsed.name)
        .and_then(|artifact| {
            artifact
                .history
                .iter()
                .find(|e| e.kind != EventKind::Commit && e.reference == raw)
        })
        .cloned();
    Ok(RefCheck { tag: parsed, event })
}
