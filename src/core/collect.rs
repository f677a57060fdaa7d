//! Event collector: turns tag refs and index observations into a single
//! time-ordered event stream.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::Result;
use crate::config::RegistryConfig;
use crate::git::{GitRepo, TagInfo};

use super::cancel::CancelToken;
use super::event::{Event, EventKind};
use super::index::{self, ArtifactIndex};
use super::name::{ArtifactName, Stage};
use super::tag::{self, TagAction};

/// Which commits the collector visits for index observations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    /// HEAD commit only.
    Head,
    /// Tip commit of every local branch.
    AllBranches,
    /// Full history reachable from any local branch.
    AllCommits,
    /// An explicit set of commit shas.
    Commits(BTreeSet<String>),
}

/// A sorted event stream plus the side tables the assembler needs.
#[derive(Clone, Debug, Default)]
pub struct EventStream {
    /// Events sorted by (commit time, tag time, seq, tag name).
    pub events: Vec<Event>,
    /// (artifact, stage) pairs seen in simple-form tags; assignment
    /// history is unreliable for these.
    pub simple_pairs: BTreeSet<(ArtifactName, Stage)>,
    /// Parsed index per visited commit, for metadata lookups.
    pub indexes: BTreeMap<String, ArtifactIndex>,
}

fn tag_event(info: &TagInfo, parsed: tag::ParsedTag) -> (Event, Option<(ArtifactName, Stage)>) {
    let mut simple_pair = None;
    let (kind, version, stage, seq, simple) = match parsed.action {
        TagAction::Register { version } => {
            (EventKind::Registration, Some(version), None, None, false)
        }
        TagAction::Deregister { version } => {
            (EventKind::Deregistration, Some(version), None, None, false)
        }
        TagAction::Deprecate { seq } => (EventKind::Deprecation, None, None, seq, false),
        TagAction::Assign { stage, seq } => {
            if seq.is_none() {
                simple_pair = Some((parsed.name.clone(), stage.clone()));
            }
            (EventKind::Assignment, None, Some(stage), seq, seq.is_none())
        }
        TagAction::Unassign { stage, seq } => {
            if seq.is_none() {
                simple_pair = Some((parsed.name.clone(), stage.clone()));
            }
            (EventKind::Unassignment, None, Some(stage), seq, seq.is_none())
        }
    };
    let event = Event {
        kind,
        artifact: parsed.name,
        version,
        stage,
        reference: info.name.clone(),
        commit: info.target.clone(),
        author: info.tagger_name.clone(),
        author_email: info.tagger_email.clone(),
        message: info.message.clone(),
        commit_time: info.commit_time,
        created_at: info.tag_time,
        seq,
        simple,
        marker: None,
    };
    (event, simple_pair)
}

fn resolve_scope(repo: &GitRepo, scope: &Scope) -> Result<Vec<String>> {
    match scope {
        Scope::Head => Ok(repo.head_commit().into_iter().collect()),
        Scope::AllBranches => {
            let mut tips = repo.branch_tips()?;
            if let Ok(head) = repo.head_commit() {
                tips.push(head);
            }
            tips.sort();
            tips.dedup();
            Ok(tips)
        }
        Scope::AllCommits => {
            let mut tips = repo.branch_tips()?;
            if let Ok(head) = repo.head_commit() {
                tips.push(head);
            }
            tips.sort();
            tips.dedup();
            if tips.is_empty() {
                return Ok(Vec::new());
            }
            repo.walk(&tips)
        }
        Scope::Commits(set) => Ok(set.iter().cloned().collect()),
    }
}

/// Enumerate tags and index observations over `scope` and return the
/// stream sorted for assembly.
pub fn collect(
    repo: &GitRepo,
    config: &RegistryConfig,
    scope: &Scope,
    cancel: &CancelToken,
) -> Result<EventStream> {
    let mut stream = EventStream::default();

    for info in repo.tags()? {
        cancel.check()?;
        let Some(parsed) = tag::parse(&info.name, config.version_convention) else {
            debug!(tag = %info.name, "skipping foreign tag");
            continue;
        };
        let (event, simple_pair) = tag_event(&info, parsed);
        if let Some(pair) = simple_pair {
            stream.simple_pairs.insert(pair);
        }
        stream.events.push(event);
    }

    for sha in resolve_scope(repo, scope)? {
        cancel.check()?;
        let Some(bytes) = repo.blob_at(&sha, &config.index)? else {
            continue;
        };
        let parsed = match index::parse(&bytes) {
            Ok(parsed) => parsed,
            Err(reason) => {
                // Historical damage must not abort the scan; HEAD-facing
                // reads go through the worktree path, which is strict.
                warn!(commit = %sha, %reason, "malformed index, treating as empty");
                continue;
            }
        };
        if parsed.is_empty() {
            continue;
        }
        let commit = repo.commit_info(&sha)?;
        for name in parsed.entries.keys() {
            stream.events.push(Event {
                kind: EventKind::Commit,
                artifact: name.clone(),
                version: None,
                stage: None,
                reference: sha.clone(),
                commit: sha.clone(),
                author: commit.author_name.clone(),
                author_email: commit.author_email.clone(),
                message: commit.summary.clone(),
                commit_time: commit.commit_time,
                created_at: commit.commit_time,
                seq: None,
                simple: false,
                marker: None,
            });
        }
        stream.indexes.insert(sha, parsed);
    }

    stream
        .events
        .sort_by(|a, b| a.order_key().cmp(&b.order_key()));
    Ok(stream)
}
