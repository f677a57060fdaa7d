//! State assembler: folds the sorted event stream into the canonical
//! registry state.
//!
//! The assembler never fails on suspect input. Duplicate registrations,
//! deregistrations of unknown versions, and assignments to commits with
//! no registered version are kept in history with a marker and the fold
//! continues.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use time::OffsetDateTime;

use crate::config::RegistryConfig;

use super::collect::EventStream;
use super::event::{Event, EventKind, Marker};
use super::index::IndexEntry;
use super::name::{ArtifactName, Stage};
use super::version::{self, Convention, SortOrder};

/// One version of one artifact.
#[derive(Clone, Debug, Serialize)]
pub struct VersionState {
    pub version: String,
    pub commit: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub author: String,
    pub author_email: String,
    /// Explicitly registered (as opposed to discovered via a stage tag).
    pub registered: bool,
    pub deregistered: bool,
    /// Created implicitly because a stage tag pointed at its commit.
    pub discovered: bool,
    /// Stages currently pointing at this version.
    pub stages: BTreeSet<Stage>,
    /// Assignment and unassignment events resolved to this version.
    pub assignment_history: Vec<Event>,
}

impl VersionState {
    /// Visible to `latest` and stage selection.
    pub fn is_active(&self) -> bool {
        self.registered && !self.deregistered
    }
}

/// Per-stage assignment state for one artifact.
#[derive(Clone, Debug, Default, Serialize)]
pub struct StageState {
    /// All assignment/unassignment events on this stage, in stream order.
    pub history: Vec<Event>,
    /// Version(s) currently holding the stage, most relevant first.
    /// Empty means unassigned. More than one element only with the
    /// multi-version workflow.
    pub current: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ArtifactState {
    pub name: ArtifactName,
    pub deprecated: bool,
    pub versions: Vec<VersionState>,
    pub stages: BTreeMap<Stage, StageState>,
    /// Every event touching the artifact, in display order, markers
    /// applied.
    pub history: Vec<Event>,
    /// Latest index metadata observed in the scanned commits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<IndexEntry>,
    /// Stages whose history is degraded by simple-form tags.
    pub simple_stages: BTreeSet<Stage>,
    /// Greatest effective counter among deprecation events (a bare
    /// `@deprecated` counts as 1).
    pub deprecation_seq_max: u64,
}

impl ArtifactState {
    fn new(name: ArtifactName) -> Self {
        Self {
            name,
            deprecated: false,
            versions: Vec::new(),
            stages: BTreeMap::new(),
            history: Vec::new(),
            meta: None,
            simple_stages: BTreeSet::new(),
            deprecation_seq_max: 0,
        }
    }

    pub fn find_version(&self, version: &str) -> Option<&VersionState> {
        self.versions.iter().find(|v| v.version == version)
    }

    fn find_version_mut(&mut self, version: &str) -> Option<&mut VersionState> {
        self.versions.iter_mut().find(|v| v.version == version)
    }

    /// Greatest effective counter among assignment/unassignment events
    /// (simple-form tags count as 0).
    pub fn assignment_seq_max(&self) -> u64 {
        self.stages
            .values()
            .flat_map(|s| s.history.iter())
            .filter_map(|e| e.seq)
            .max()
            .unwrap_or(0)
    }

    /// True when the artifact only ever appeared in the index (no tags).
    pub fn is_annotation_only(&self) -> bool {
        self.history.iter().all(|e| e.kind == EventKind::Commit)
    }
}

/// The canonical, queryable registry view.
#[derive(Clone, Debug, Serialize)]
pub struct RegistryState {
    pub artifacts: BTreeMap<ArtifactName, ArtifactState>,
    pub sort: SortOrder,
    pub convention: Convention,
    pub kanban: bool,
    pub multi_stage: bool,
    /// Tag names observed in the repository, for collision checks.
    #[serde(skip)]
    pub tag_names: BTreeSet<String>,
}

impl RegistryState {
    pub fn find_artifact(&self, name: &ArtifactName) -> Option<&ArtifactState> {
        self.artifacts.get(name)
    }

    /// Greatest active version of an artifact under the configured sort.
    pub fn latest_version<'a>(&self, artifact: &'a ArtifactState) -> Option<&'a VersionState> {
        let active: Vec<&VersionState> = artifact
            .versions
            .iter()
            .filter(|v| v.is_active() && !v.discovered)
            .collect();
        match self.sort {
            SortOrder::ByTime => active.into_iter().max_by_key(|v| v.created_at),
            SortOrder::BySemVer => {
                let greatest = version::greatest(
                    active.iter().map(|v| v.version.as_str()),
                    self.convention,
                    false,
                )?;
                artifact.find_version(greatest)
            }
        }
    }
}

struct Assembler {
    artifacts: BTreeMap<ArtifactName, ArtifactState>,
    tag_names: BTreeSet<String>,
}

impl Assembler {
    fn artifact(&mut self, name: &ArtifactName) -> &mut ArtifactState {
        self.artifacts
            .entry(name.clone())
            .or_insert_with(|| ArtifactState::new(name.clone()))
    }

    fn apply(&mut self, event: &Event, stream: &EventStream) {
        if event.kind != EventKind::Commit {
            self.tag_names.insert(event.reference.clone());
        }
        match event.kind {
            EventKind::Commit => self.apply_commit(event, stream),
            EventKind::Registration => self.apply_registration(event),
            EventKind::Deregistration => self.apply_deregistration(event),
            EventKind::Assignment | EventKind::Unassignment => self.apply_stage_event(event),
            EventKind::Deprecation => self.apply_deprecation(event),
            // Annotations exist only in mutation plans; the collector
            // never emits them.
            EventKind::Annotation => {}
        }
    }

    fn apply_commit(&mut self, event: &Event, stream: &EventStream) {
        let meta = stream
            .indexes
            .get(&event.commit)
            .and_then(|idx| idx.get(&event.artifact))
            .cloned();
        let artifact = self.artifact(&event.artifact);
        // The stream is time-ordered, so the last observation wins.
        if meta.is_some() {
            artifact.meta = meta;
        }
        artifact.history.push(event.clone());
    }

    fn apply_registration(&mut self, event: &Event) {
        let Some(version) = event.version.clone() else {
            return;
        };
        let artifact = self.artifact(&event.artifact);
        let mut recorded = event.clone();

        match artifact.find_version_mut(&version) {
            Some(existing) if existing.is_active() => {
                // A second registration of a live version never shadows
                // the first.
                recorded.marker = Some(Marker::Conflict);
            }
            Some(existing) => {
                existing.registered = true;
                existing.deregistered = false;
                existing.discovered = false;
                existing.commit = event.commit.clone();
                existing.created_at = event.created_at;
                existing.author = event.author.clone();
                existing.author_email = event.author_email.clone();
                artifact.deprecated = false;
            }
            None => {
                artifact.versions.push(VersionState {
                    version,
                    commit: event.commit.clone(),
                    created_at: event.created_at,
                    author: event.author.clone(),
                    author_email: event.author_email.clone(),
                    registered: true,
                    deregistered: false,
                    discovered: false,
                    stages: BTreeSet::new(),
                    assignment_history: Vec::new(),
                });
                artifact.deprecated = false;
            }
        }
        artifact.history.push(recorded);
    }

    fn apply_deregistration(&mut self, event: &Event) {
        let Some(version) = event.version.as_deref() else {
            return;
        };
        let artifact = self.artifact(&event.artifact);
        let mut recorded = event.clone();
        match artifact.find_version_mut(version) {
            Some(existing) if existing.registered && !existing.deregistered => {
                existing.deregistered = true;
            }
            _ => {
                recorded.marker = Some(Marker::Orphan);
            }
        }
        artifact.history.push(recorded);
    }

    fn apply_stage_event(&mut self, event: &Event) {
        let Some(stage) = event.stage.clone() else {
            return;
        };
        let artifact = self.artifact(&event.artifact);
        let mut recorded = event.clone();

        // Resolve the version this tag touches: the version registered at
        // the tag's commit, else the latest version registered before the
        // tag, else a discovered placeholder named by the commit itself.
        let resolved = artifact
            .versions
            .iter()
            .filter(|v| v.commit == event.commit && !v.discovered)
            .map(|v| v.version.clone())
            .next_back()
            .or_else(|| {
                artifact
                    .versions
                    .iter()
                    .filter(|v| v.is_active() && !v.discovered && v.created_at <= event.created_at)
                    .max_by_key(|v| v.created_at)
                    .map(|v| v.version.clone())
            });
        let resolved = match resolved {
            Some(version) => version,
            None => {
                recorded.marker = Some(Marker::Orphan);
                match artifact.find_version_mut(&event.commit) {
                    Some(_) => {}
                    None => artifact.versions.push(VersionState {
                        version: event.commit.clone(),
                        commit: event.commit.clone(),
                        created_at: event.created_at,
                        author: event.author.clone(),
                        author_email: event.author_email.clone(),
                        registered: false,
                        deregistered: false,
                        discovered: true,
                        stages: BTreeSet::new(),
                        assignment_history: Vec::new(),
                    }),
                }
                event.commit.clone()
            }
        };
        recorded.version = Some(resolved.clone());

        if event.kind == EventKind::Assignment {
            artifact.deprecated = false;
        }
        if event.simple {
            artifact.simple_stages.insert(stage.clone());
        }
        if let Some(version) = artifact.find_version_mut(&resolved) {
            version.assignment_history.push(recorded.clone());
        }
        artifact
            .stages
            .entry(stage)
            .or_default()
            .history
            .push(recorded.clone());
        artifact.history.push(recorded);
    }

    fn apply_deprecation(&mut self, event: &Event) {
        let artifact = self.artifact(&event.artifact);
        artifact.deprecated = true;
        artifact.deprecation_seq_max = artifact.deprecation_seq_max.max(event.seq.unwrap_or(1));
        artifact.history.push(event.clone());
    }
}

/// Effective ordering of stage events: counter first, stream order as
/// tiebreak.
fn deciding_key(event: &Event) -> (u64, (OffsetDateTime, OffsetDateTime, u64, String)) {
    let (a, b, c, d) = event.order_key();
    (event.seq.unwrap_or(0), (a, b, c, d.to_string()))
}

fn finish(
    mut artifacts: BTreeMap<ArtifactName, ArtifactState>,
    config: &RegistryConfig,
) -> BTreeMap<ArtifactName, ArtifactState> {
    for artifact in artifacts.values_mut() {
        // Per-stage currency: the greatest-counter event on the stage
        // decides, across all versions of the artifact.
        for state in artifact.stages.values_mut() {
            state.current.clear();
            if config.multi_stage {
                // Each version holds the stage iff its own last event on
                // the stage is an assignment.
                let mut per_version: BTreeMap<String, &Event> = BTreeMap::new();
                for event in &state.history {
                    let Some(version) = event.version.as_deref() else {
                        continue;
                    };
                    match per_version.get(version) {
                        Some(prev) if deciding_key(prev) >= deciding_key(event) => {}
                        _ => {
                            per_version.insert(version.to_string(), event);
                        }
                    }
                }
                let mut holders: Vec<(&Event, String)> = per_version
                    .into_iter()
                    .filter(|(_, e)| e.kind == EventKind::Assignment)
                    .map(|(v, e)| (e, v))
                    .collect();
                match config.sort {
                    SortOrder::ByTime => {
                        holders.sort_by(|a, b| deciding_key(b.0).cmp(&deciding_key(a.0)));
                    }
                    SortOrder::BySemVer => holders.sort_by(|a, b| {
                        version::compare(&b.1, &a.1, config.version_convention)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    }),
                }
                state.current = holders.into_iter().map(|(_, v)| v).collect();
            } else {
                let deciding = state.history.iter().max_by_key(|e| deciding_key(e));
                if let Some(event) = deciding
                    && event.kind == EventKind::Assignment
                    && let Some(version) = event.version.clone()
                {
                    state.current = vec![version];
                }
            }
        }

        if config.kanban {
            // One stage per version: the most recently decided stage on a
            // version displaces the rest.
            let mut best: BTreeMap<String, (Stage, (u64, (OffsetDateTime, OffsetDateTime, u64, String)))> =
                BTreeMap::new();
            for (stage, state) in &artifact.stages {
                for version in &state.current {
                    let Some(event) = state
                        .history
                        .iter()
                        .filter(|e| e.version.as_deref() == Some(version.as_str()))
                        .max_by_key(|e| deciding_key(e))
                    else {
                        continue;
                    };
                    let key = deciding_key(event);
                    match best.get(version) {
                        Some((_, existing)) if *existing >= key => {}
                        _ => {
                            best.insert(version.clone(), (stage.clone(), key));
                        }
                    }
                }
            }
            for (stage, state) in artifact.stages.iter_mut() {
                state
                    .current
                    .retain(|v| best.get(v).map(|(s, _)| s) == Some(stage));
            }
        }

        // Project stage currency back onto versions.
        for version in artifact.versions.iter_mut() {
            version.stages.clear();
        }
        let pointers: Vec<(Stage, String)> = artifact
            .stages
            .iter()
            .flat_map(|(stage, s)| s.current.iter().map(move |v| (stage.clone(), v.clone())))
            .collect();
        for (stage, version) in pointers {
            if let Some(state) = artifact.find_version_mut(&version) {
                state.stages.insert(stage);
            }
        }
    }
    artifacts
}

/// Fold a collected stream into the canonical state. Pure: the same
/// stream and config always produce the same state.
pub fn assemble(stream: &EventStream, config: &RegistryConfig) -> RegistryState {
    let mut assembler = Assembler {
        artifacts: BTreeMap::new(),
        tag_names: BTreeSet::new(),
    };
    for event in &stream.events {
        assembler.apply(event, stream);
    }
    for (name, stage) in &stream.simple_pairs {
        assembler.artifact(name).simple_stages.insert(stage.clone());
    }
    let artifacts = finish(assembler.artifacts, config);
    RegistryState {
        artifacts,
        sort: config.sort,
        convention: config.version_convention,
        kanban: config.kanban,
        multi_stage: config.multi_stage,
        tag_names: assembler.tag_names,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::collect::EventStream;

    fn name(raw: &str) -> ArtifactName {
        ArtifactName::parse(raw).unwrap()
    }

    fn stage(raw: &str) -> Stage {
        Stage::parse(raw).unwrap()
    }

    fn at(secs: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(secs).unwrap()
    }

    fn event(kind: EventKind, reference: &str, secs: i64) -> Event {
        Event {
            kind,
            artifact: name("rf"),
            version: None,
            stage: None,
            reference: reference.to_string(),
            commit: "c1".into(),
            author: "alice".into(),
            author_email: "alice@example.com".into(),
            message: String::new(),
            commit_time: at(secs),
            created_at: at(secs),
            seq: None,
            simple: false,
            marker: None,
        }
    }

    fn registration(version: &str, commit: &str, secs: i64) -> Event {
        Event {
            version: Some(version.into()),
            commit: commit.into(),
            ..event(EventKind::Registration, &format!("rf@{version}"), secs)
        }
    }

    fn assignment(stage_name: &str, seq: u64, commit: &str, secs: i64) -> Event {
        Event {
            stage: Some(stage(stage_name)),
            seq: Some(seq),
            commit: commit.into(),
            ..event(
                EventKind::Assignment,
                &format!("rf#{stage_name}#{seq}"),
                secs,
            )
        }
    }

    fn unassignment(stage_name: &str, seq: u64, commit: &str, secs: i64) -> Event {
        Event {
            stage: Some(stage(stage_name)),
            seq: Some(seq),
            commit: commit.into(),
            ..event(
                EventKind::Unassignment,
                &format!("rf#{stage_name}!#{seq}"),
                secs,
            )
        }
    }

    fn assemble_events(events: Vec<Event>) -> RegistryState {
        assemble_with(events, RegistryConfig::default())
    }

    fn assemble_with(mut events: Vec<Event>, config: RegistryConfig) -> RegistryState {
        events.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        let stream = EventStream {
            events,
            ..EventStream::default()
        };
        assemble(&stream, &config)
    }

    #[test]
    fn register_then_assign() {
        let state = assemble_events(vec![
            registration("v1", "c1", 10),
            assignment("prod", 1, "c1", 20),
        ]);
        let rf = state.find_artifact(&name("rf")).expect("artifact");
        assert_eq!(rf.versions.len(), 1);
        assert!(rf.versions[0].is_active());
        assert_eq!(rf.stages[&stage("prod")].current, vec!["v1"]);
        assert_eq!(state.latest_version(rf).unwrap().version, "v1");
    }

    #[test]
    fn reassign_then_unassign_leaves_stage_empty() {
        let state = assemble_events(vec![
            registration("v1", "c1", 10),
            assignment("prod", 1, "c1", 20),
            assignment("prod", 2, "c1", 30),
            unassignment("prod", 3, "c1", 40),
        ]);
        let rf = state.find_artifact(&name("rf")).expect("artifact");
        assert!(rf.stages[&stage("prod")].current.is_empty());
        assert_eq!(rf.stages[&stage("prod")].history.len(), 3);
    }

    #[test]
    fn greatest_seq_decides_currency_even_against_time() {
        // A hand-made tag with a lower counter but a later timestamp must
        // not displace the greater counter.
        let state = assemble_events(vec![
            registration("v1", "c1", 10),
            unassignment("prod", 5, "c1", 20),
            assignment("prod", 2, "c1", 30),
        ]);
        let rf = state.find_artifact(&name("rf")).expect("artifact");
        assert!(rf.stages[&stage("prod")].current.is_empty());
    }

    #[test]
    fn duplicate_registration_is_conflict_marked() {
        let state = assemble_events(vec![
            registration("v1", "c1", 10),
            registration("v1", "c2", 20),
        ]);
        let rf = state.find_artifact(&name("rf")).expect("artifact");
        assert_eq!(rf.versions.len(), 1);
        assert_eq!(rf.versions[0].commit, "c1");
        let conflicts: Vec<&Event> = rf
            .history
            .iter()
            .filter(|e| e.marker == Some(Marker::Conflict))
            .collect();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].commit, "c2");
    }

    #[test]
    fn deregistered_version_is_excluded_from_latest() {
        let mut dereg = registration("v2", "c2", 30);
        dereg.kind = EventKind::Deregistration;
        dereg.reference = "rf@v2!".into();
        let state = assemble_events(vec![
            registration("v1", "c1", 10),
            registration("v2", "c2", 20),
            dereg,
        ]);
        let rf = state.find_artifact(&name("rf")).expect("artifact");
        assert_eq!(state.latest_version(rf).unwrap().version, "v1");
        assert!(rf.find_version("v2").unwrap().deregistered);
    }

    #[test]
    fn deprecation_resets_on_registration() {
        let state = assemble_events(vec![
            registration("v1", "c1", 10),
            event(EventKind::Deprecation, "rf@deprecated", 20),
            registration("v2", "c2", 30),
        ]);
        let rf = state.find_artifact(&name("rf")).expect("artifact");
        assert!(!rf.deprecated);
        assert_eq!(state.latest_version(rf).unwrap().version, "v2");
    }

    #[test]
    fn deprecation_sticks_without_reset() {
        let state = assemble_events(vec![
            registration("v1", "c1", 10),
            event(EventKind::Deprecation, "rf@deprecated", 20),
        ]);
        let rf = state.find_artifact(&name("rf")).expect("artifact");
        assert!(rf.deprecated);
        assert_eq!(rf.deprecation_seq_max, 1);
    }

    #[test]
    fn assignment_without_version_discovers_a_placeholder() {
        let state = assemble_events(vec![assignment("prod", 1, "c9", 10)]);
        let rf = state.find_artifact(&name("rf")).expect("artifact");
        assert_eq!(rf.versions.len(), 1);
        assert!(rf.versions[0].discovered);
        assert_eq!(rf.versions[0].version, "c9");
        assert_eq!(rf.stages[&stage("prod")].current, vec!["c9"]);
        assert!(
            rf.history
                .iter()
                .any(|e| e.marker == Some(Marker::Orphan))
        );
    }

    #[test]
    fn assignment_at_unversioned_commit_falls_back_to_latest_registered() {
        let state = assemble_events(vec![
            registration("v1", "c1", 10),
            assignment("prod", 1, "c2", 20),
        ]);
        let rf = state.find_artifact(&name("rf")).expect("artifact");
        assert_eq!(rf.stages[&stage("prod")].current, vec!["v1"]);
    }

    #[test]
    fn stage_currency_spans_versions() {
        let state = assemble_events(vec![
            registration("v1", "c1", 10),
            registration("v2", "c2", 20),
            assignment("prod", 1, "c1", 30),
            assignment("prod", 2, "c2", 40),
        ]);
        let rf = state.find_artifact(&name("rf")).expect("artifact");
        assert_eq!(rf.stages[&stage("prod")].current, vec!["v2"]);
        assert!(rf.find_version("v1").unwrap().stages.is_empty());
        assert!(
            rf.find_version("v2")
                .unwrap()
                .stages
                .contains(&stage("prod"))
        );
    }

    #[test]
    fn by_time_and_by_semver_latest_disagree() {
        // v10 is registered earlier in time than v2.
        let events = vec![
            registration("v10", "c1", 10),
            registration("v2", "c2", 20),
        ];
        let by_time = assemble_with(events.clone(), RegistryConfig::default());
        let rf = by_time.find_artifact(&name("rf")).expect("artifact");
        assert_eq!(by_time.latest_version(rf).unwrap().version, "v2");

        let by_semver = assemble_with(
            events,
            RegistryConfig {
                sort: SortOrder::BySemVer,
                ..RegistryConfig::default()
            },
        );
        let rf = by_semver.find_artifact(&name("rf")).expect("artifact");
        assert_eq!(by_semver.latest_version(rf).unwrap().version, "v10");
    }

    #[test]
    fn kanban_keeps_one_stage_per_version() {
        let state = assemble_with(
            vec![
                registration("v1", "c1", 10),
                assignment("dev", 1, "c1", 20),
                assignment("prod", 2, "c1", 30),
            ],
            RegistryConfig {
                kanban: true,
                ..RegistryConfig::default()
            },
        );
        let rf = state.find_artifact(&name("rf")).expect("artifact");
        assert!(rf.stages[&stage("dev")].current.is_empty());
        assert_eq!(rf.stages[&stage("prod")].current, vec!["v1"]);
    }

    #[test]
    fn multi_stage_keeps_every_holder() {
        let state = assemble_with(
            vec![
                registration("v1", "c1", 10),
                registration("v2", "c2", 20),
                assignment("prod", 1, "c1", 30),
                assignment("prod", 2, "c2", 40),
            ],
            RegistryConfig {
                multi_stage: true,
                ..RegistryConfig::default()
            },
        );
        let rf = state.find_artifact(&name("rf")).expect("artifact");
        assert_eq!(rf.stages[&stage("prod")].current, vec!["v2", "v1"]);
    }

    #[test]
    fn assemble_is_deterministic() {
        let events = vec![
            registration("v1", "c1", 10),
            assignment("prod", 1, "c1", 20),
            unassignment("prod", 2, "c1", 30),
            registration("v2", "c2", 40),
        ];
        let a = assemble_events(events.clone());
        let b = assemble_events(events);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
