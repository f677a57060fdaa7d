//! End-to-end scenarios against real repositories: plans are applied as
//! actual annotated tags, then the registry is re-collected and
//! re-assembled from scratch.

mod fixtures;

use fixtures::TestRepo;

use gitreg::config::RegistryConfig;
use gitreg::core::{
    ArtifactName, CancelToken, Convention, EventKind, HistoryRow, Mutator, Scope, SortOrder,
    Stage, collect, query,
};
use gitreg::error::Error;

fn name(raw: &str) -> ArtifactName {
    ArtifactName::parse(raw).unwrap()
}

fn stage(raw: &str) -> Stage {
    Stage::parse(raw).unwrap()
}

#[test]
fn register_then_assign() {
    let fix = TestRepo::init();
    let config = RegistryConfig::default();
    let c1 = fix.commit_file("model.bin", "weights", "add model", 1_010);

    let state = fix.registry(&config);
    let plan = Mutator::new(&state, &config)
        .register(&name("rf"), &c1, Some("v1"), None, false)
        .unwrap();
    assert_eq!(plan[0].tag, "rf@v1");
    fix.apply(&plan, 2_000);

    let state = fix.registry(&config);
    let plan = Mutator::new(&state, &config)
        .assign(&name("rf"), &stage("prod"), Some("v1"), None, None, false)
        .unwrap();
    assert_eq!(plan[0].tag, "rf#prod#1");
    fix.apply(&plan, 2_100);

    let state = fix.registry(&config);
    let rows = query::show(&state);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].latest.as_deref(), Some("v1"));
    assert_eq!(rows[0].stages[&stage("prod")], vec!["v1"]);
    assert_eq!(query::which(&state, &name("rf"), &stage("prod")).unwrap(), ["v1"]);
}

#[test]
fn reassign_then_unassign() {
    let fix = TestRepo::init();
    let config = RegistryConfig::default();
    let c1 = fix.commit_file("model.bin", "weights", "add model", 1_010);
    fix.tag("rf@v1", &c1, "register", 2_000);
    fix.tag("rf#prod#1", &c1, "assign", 2_100);

    // Re-assigning the same version just re-stamps with the next counter.
    let state = fix.registry(&config);
    let plan = Mutator::new(&state, &config)
        .assign(&name("rf"), &stage("prod"), Some("v1"), None, None, false)
        .unwrap();
    assert_eq!(plan[0].tag, "rf#prod#2");
    fix.apply(&plan, 2_200);

    let state = fix.registry(&config);
    let plan = Mutator::new(&state, &config)
        .unassign(&name("rf"), &stage("prod"))
        .unwrap();
    assert_eq!(plan[0].tag, "rf#prod!#3");
    fix.apply(&plan, 2_300);

    let state = fix.registry(&config);
    assert!(query::which(&state, &name("rf"), &stage("prod")).unwrap().is_empty());
    // A second unassign now fails the precondition.
    let err = Mutator::new(&state, &config)
        .unassign(&name("rf"), &stage("prod"))
        .unwrap_err();
    assert!(matches!(err, Error::Precondition(_)));
}

#[test]
fn semver_bump_sequence() {
    let fix = TestRepo::init();
    let config = RegistryConfig {
        version_convention: Convention::SemVer,
        ..RegistryConfig::default()
    };
    let c1 = fix.commit_file("model.bin", "w1", "add model", 1_010);

    let state = fix.registry(&config);
    let plan = Mutator::new(&state, &config)
        .register(&name("rf"), &c1, None, None, false)
        .unwrap();
    assert_eq!(plan[0].tag, "rf@v0.0.1");
    fix.apply(&plan, 2_000);

    let c2 = fix.commit_file("model.bin", "w2", "retrain", 1_020);
    let state = fix.registry(&config);
    let plan = Mutator::new(&state, &config)
        .register(
            &name("rf"),
            &c2,
            None,
            Some(gitreg::core::BumpPart::Minor),
            false,
        )
        .unwrap();
    assert_eq!(plan[0].tag, "rf@v0.1.0");
    fix.apply(&plan, 2_100);

    let state = fix.registry(&config);
    let latest = query::latest(&state, &name("rf")).unwrap().unwrap();
    assert_eq!(latest.version, "v0.1.0");
}

#[test]
fn time_and_semver_sort_disagree() {
    let fix = TestRepo::init();
    let c1 = fix.commit_file("a", "1", "c1", 1_010);
    let c2 = fix.commit_file("a", "2", "c2", 1_020);
    // v2 carries the later tag time, v10 the earlier one.
    fix.tag("rf@v10", &c1, "register v10", 2_000);
    fix.tag("rf@v2", &c2, "register v2", 3_000);

    let by_time = fix.registry(&RegistryConfig::default());
    let latest = query::latest(&by_time, &name("rf")).unwrap().unwrap();
    assert_eq!(latest.version, "v2");

    let by_semver = fix.registry(&RegistryConfig {
        sort: SortOrder::BySemVer,
        ..RegistryConfig::default()
    });
    let latest = query::latest(&by_semver, &name("rf")).unwrap().unwrap();
    assert_eq!(latest.version, "v10");
}

#[test]
fn deprecation_resets_on_new_registration() {
    let fix = TestRepo::init();
    let config = RegistryConfig::default();
    let c1 = fix.commit_file("model.bin", "w1", "add model", 1_010);
    fix.tag("rf@v1", &c1, "register", 2_000);

    let state = fix.registry(&config);
    let plan = Mutator::new(&state, &config)
        .deprecate(&name("rf"), &c1)
        .unwrap();
    assert_eq!(plan[0].tag, "rf@deprecated");
    fix.apply(&plan, 2_100);

    let state = fix.registry(&config);
    assert!(state.find_artifact(&name("rf")).unwrap().deprecated);
    // Registration while deprecated needs force.
    let c2 = fix.commit_file("model.bin", "w2", "retrain", 1_020);
    let mutator = Mutator::new(&state, &config);
    assert!(matches!(
        mutator.register(&name("rf"), &c2, Some("v2"), None, false),
        Err(Error::Precondition(_))
    ));
    let plan = mutator
        .register(&name("rf"), &c2, Some("v2"), None, true)
        .unwrap();
    fix.apply(&plan, 2_200);

    let state = fix.registry(&config);
    assert!(!state.find_artifact(&name("rf")).unwrap().deprecated);
    let latest = query::latest(&state, &name("rf")).unwrap().unwrap();
    assert_eq!(latest.version, "v2");

    // A later deprecation must pick a fresh tag name.
    let plan = Mutator::new(&state, &config)
        .deprecate(&name("rf"), &c2)
        .unwrap();
    assert_eq!(plan[0].tag, "rf@deprecated#2");
}

#[test]
fn simple_form_tag_degrades_history_but_not_currency() {
    let fix = TestRepo::init();
    let config = RegistryConfig::default();
    let c1 = fix.commit_file("model.bin", "w1", "add model", 1_010);
    fix.tag("rf@v1", &c1, "register", 2_000);
    fix.tag("rf#prod", &c1, "legacy assign", 3_000);

    let state = fix.registry(&config);
    // Currency still resolves to the version registered at the commit.
    assert_eq!(query::which(&state, &name("rf"), &stage("prod")).unwrap(), ["v1"]);

    let rows = query::history(&state, Some(&name("rf"))).unwrap();
    assert!(rows.iter().any(|r| matches!(
        r,
        HistoryRow::Degraded { stage: s, .. } if s.as_str() == "prod"
    )));
    assert!(!rows.iter().any(|r| matches!(
        r,
        HistoryRow::Event(e) if e.kind == EventKind::Assignment
    )));
}

#[test]
fn deregistration_hides_from_latest_but_not_show_all() {
    let fix = TestRepo::init();
    let config = RegistryConfig::default();
    let c1 = fix.commit_file("a", "1", "c1", 1_010);
    let c2 = fix.commit_file("a", "2", "c2", 1_020);
    fix.tag("rf@v1", &c1, "register", 2_000);
    fix.tag("rf@v2", &c2, "register", 2_100);

    let state = fix.registry(&config);
    let plan = Mutator::new(&state, &config)
        .deregister(&name("rf"), "v2")
        .unwrap();
    assert_eq!(plan[0].tag, "rf@v2!");
    fix.apply(&plan, 2_200);

    let state = fix.registry(&config);
    let latest = query::latest(&state, &name("rf")).unwrap().unwrap();
    assert_eq!(latest.version, "v1");
    assert_eq!(query::show_artifact(&state, &name("rf"), false).unwrap().len(), 1);
    let all = query::show_artifact(&state, &name("rf"), true).unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().any(|v| v.version == "v2" && v.deregistered));
}

#[test]
fn deleting_tags_rewrites_history() {
    let fix = TestRepo::init();
    let config = RegistryConfig::default();
    let c1 = fix.commit_file("a", "1", "c1", 1_010);
    fix.tag("rf@v1", &c1, "register", 2_000);
    fix.tag("rf#prod#1", &c1, "assign", 2_100);

    let state = fix.registry(&config);
    let tags = Mutator::new(&state, &config)
        .deregister_delete(&name("rf"), "v1")
        .unwrap();
    assert_eq!(tags, vec!["rf#prod#1", "rf@v1"]);
    for tag in &tags {
        fix.delete_tag(tag);
    }

    // As if the version never existed.
    let state = fix.registry(&config);
    assert!(state.find_artifact(&name("rf")).is_none());
}

#[test]
fn assign_at_commit_registers_first_atomically() {
    let fix = TestRepo::init();
    let config = RegistryConfig::default();
    let c1 = fix.commit_file("a", "1", "c1", 1_010);
    fix.tag("rf@v1", &c1, "register", 2_000);
    let c2 = fix.commit_file("a", "2", "c2", 1_020);

    let state = fix.registry(&config);
    let plan = Mutator::new(&state, &config)
        .assign(&name("rf"), &stage("prod"), None, Some(&c2), None, false)
        .unwrap();
    let tags: Vec<&str> = plan.iter().map(|w| w.tag.as_str()).collect();
    assert_eq!(tags, ["rf@v2", "rf#prod#1"]);
    fix.apply(&plan, 2_100);

    let state = fix.registry(&config);
    assert_eq!(query::which(&state, &name("rf"), &stage("prod")).unwrap(), ["v2"]);
}

#[test]
fn index_rows_surface_unregistered_artifacts() {
    let fix = TestRepo::init();
    let config = RegistryConfig::default();
    fix.commit_file(
        "artifacts.yaml",
        "features:\n  type: dataset\n  path: data/features.csv\n  virtual: false\n",
        "annotate features",
        1_010,
    );

    let state = fix.registry(&config);
    let rows = query::show(&state);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, name("features"));
    assert!(rows[0].annotation_only);
    assert!(rows[0].latest.is_none());

    let meta = query::describe(&state, &name("features")).unwrap().unwrap();
    assert_eq!(meta.artifact_type.as_deref(), Some("dataset"));
    assert!(!meta.is_virtual);
}

#[test]
fn malformed_historical_index_is_skipped() {
    let fix = TestRepo::init();
    let config = RegistryConfig::default();
    fix.commit_file("artifacts.yaml", "churn: [unclosed\n", "break index", 1_010);
    fix.commit_file(
        "artifacts.yaml",
        "churn:\n  type: model\n",
        "fix index",
        1_020,
    );

    let state = fix.registry(&config);
    let meta = query::describe(&state, &name("churn")).unwrap().unwrap();
    assert_eq!(meta.artifact_type.as_deref(), Some("model"));
}

#[test]
fn lightweight_tags_fall_back_to_commit_identity() {
    let fix = TestRepo::init();
    let config = RegistryConfig::default();
    let c1 = fix.commit_file("a", "1", "c1", 1_010);
    fix.lightweight_tag("rf@v1", &c1);

    let state = fix.registry(&config);
    let rf = state.find_artifact(&name("rf")).unwrap();
    assert_eq!(rf.versions.len(), 1);
    assert_eq!(rf.versions[0].author, "Tester");
}

#[test]
fn foreign_tags_are_tolerated() {
    let fix = TestRepo::init();
    let config = RegistryConfig::default();
    let c1 = fix.commit_file("a", "1", "c1", 1_010);
    fix.tag("release-2024", &c1, "not ours", 2_000);
    fix.tag("rf@v1", &c1, "register", 2_100);

    let state = fix.registry(&config);
    assert_eq!(state.artifacts.len(), 1);
    assert!(state.find_artifact(&name("rf")).is_some());
}

#[test]
fn check_ref_reports_the_recorded_event() {
    let fix = TestRepo::init();
    let config = RegistryConfig::default();
    let c1 = fix.commit_file("a", "1", "c1", 1_010);
    fix.tag("rf@v1", &c1, "register", 2_000);
    fix.tag("rf#prod#1", &c1, "assign", 2_100);

    let state = fix.registry(&config);
    let check = query::check_ref(&state, "rf#prod#1", config.version_convention).unwrap();
    let event = check.event.unwrap();
    assert_eq!(event.kind, EventKind::Assignment);
    assert_eq!(event.version.as_deref(), Some("v1"));
    assert_eq!(event.commit, c1);
}

#[test]
fn assembly_is_deterministic_across_runs() {
    let fix = TestRepo::init();
    let config = RegistryConfig::default();
    let c1 = fix.commit_file("a", "1", "c1", 1_010);
    fix.tag("rf@v1", &c1, "register", 2_000);
    fix.tag("rf#prod#1", &c1, "assign", 2_100);
    fix.tag("rf#prod!#2", &c1, "unassign", 2_200);

    let a = fix.registry(&config);
    let b = fix.registry(&config);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn cancellation_surfaces_and_leaves_no_tags() {
    let fix = TestRepo::init();
    let config = RegistryConfig::default();
    fix.commit_file("a", "1", "c1", 1_010);

    let repo = gitreg::git::GitRepo::open(fix.path()).unwrap();
    let token = CancelToken::none();
    token.cancel();
    let err = collect(&repo, &config, &Scope::AllCommits, &token).unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert!(repo.tags().unwrap().is_empty());
}
