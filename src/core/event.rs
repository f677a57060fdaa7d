//! Typed registry events.
//!
//! Every event is derived either from a git tag (registrations, stage
//! moves, deprecations) or from an index row observed at a commit. Events
//! are immutable; the assembler only attaches markers.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::name::{ArtifactName, Stage};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Synthetic: the artifact appears in the index at this commit.
    Commit,
    Registration,
    Deregistration,
    Assignment,
    Unassignment,
    Deprecation,
    /// Index metadata written for the artifact in the working tree.
    Annotation,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Commit => "commit",
            EventKind::Registration => "registration",
            EventKind::Deregistration => "deregistration",
            EventKind::Assignment => "assignment",
            EventKind::Unassignment => "unassignment",
            EventKind::Deprecation => "deprecation",
            EventKind::Annotation => "annotation",
        }
    }
}

/// Assembler verdict on a suspect event. The assembler never rejects an
/// event; it marks it and keeps folding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    /// The event restates something already established (e.g. a second
    /// registration of a live version) and does not shadow it.
    Conflict,
    /// The event references a version the registry never saw registered.
    Orphan,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub artifact: ArtifactName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    /// Tag name for tag events, commit sha for synthetic events.
    pub reference: String,
    /// Target commit sha.
    pub commit: String,
    pub author: String,
    pub author_email: String,
    pub message: String,
    /// Committer timestamp of the target commit.
    #[serde(with = "time::serde::rfc3339")]
    pub commit_time: OffsetDateTime,
    /// Tag creation time for annotated tags; equals `commit_time` for
    /// lightweight tags and synthetic events.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    /// True when the event came from a simple-form tag (no counter).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub simple: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
}

impl Event {
    /// Display-order key: committer time, then tag creation time, then
    /// counter, then tag name.
    pub fn order_key(&self) -> (OffsetDateTime, OffsetDateTime, u64, &str) {
        (
            self.commit_time,
            self.created_at,
            self.seq.unwrap_or(0),
            self.reference.as_str(),
        )
    }

    pub fn describe(&self) -> String {
        match self.kind {
            EventKind::Commit => format!("artifact `{}` is annotated", self.artifact),
            EventKind::Registration => format!(
                "version `{}` of `{}` was registered",
                self.version.as_deref().unwrap_or("?"),
                self.artifact
            ),
            EventKind::Deregistration => format!(
                "version `{}` of `{}` was deregistered",
                self.version.as_deref().unwrap_or("?"),
                self.artifact
            ),
            EventKind::Assignment => format!(
                "stage `{}` was assigned to version `{}` of `{}`",
                self.stage.as_ref().map(Stage::as_str).unwrap_or("?"),
                self.version.as_deref().unwrap_or("?"),
                self.artifact
            ),
            EventKind::Unassignment => format!(
                "stage `{}` was unassigned from version `{}` of `{}`",
                self.stage.as_ref().map(Stage::as_str).unwrap_or("?"),
                self.version.as_deref().unwrap_or("?"),
                self.artifact
            ),
            EventKind::Deprecation => format!("artifact `{}` was deprecated", self.artifact),
            EventKind::Annotation => format!("artifact `{}` was annotated", self.artifact),
        }
    }
}
