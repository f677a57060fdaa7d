//! Throwaway git repositories for integration tests.
//!
//! Commit and tag timestamps are explicit so tests control event order
//! down to the second.

use std::path::Path;

use git2::{Oid, Repository, Signature, Time};
use tempfile::TempDir;

use gitreg::config::RegistryConfig;
use gitreg::core::{CancelToken, RegistryState, Scope, TagWrite, assemble, collect};

pub struct TestRepo {
    dir: TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// A fresh repository with one initial commit.
    pub fn init() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let repo = Repository::init(dir.path()).expect("git init");
        {
            let mut config = repo.config().expect("config");
            config.set_str("user.name", "Tester").expect("user.name");
            config
                .set_str("user.email", "tester@example.com")
                .expect("user.email");
        }
        let fixture = Self { dir, repo };
        fixture.commit_file("README.md", "seed\n", "initial commit", 1_000);
        fixture
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn commit_file(&self, rel: &str, contents: &str, message: &str, secs: i64) -> String {
        let workdir = self.repo.workdir().expect("workdir");
        let target = workdir.join(rel);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(&target, contents).expect("write file");

        let mut index = self.repo.index().expect("index");
        index.add_path(Path::new(rel)).expect("add");
        index.write().expect("index write");
        let tree_id = index.write_tree().expect("write tree");
        let tree = self.repo.find_tree(tree_id).expect("tree");

        let sig = signature(secs);
        let parent = self
            .repo
            .head()
            .ok()
            .and_then(|head| head.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("commit");
        oid.to_string()
    }

    /// Create an annotated tag with an explicit creation time.
    pub fn tag(&self, name: &str, target: &str, message: &str, secs: i64) {
        let oid = Oid::from_str(target).expect("oid");
        let object = self.repo.find_object(oid, None).expect("object");
        let sig = signature(secs);
        self.repo
            .tag(name, &object, &sig, message, false)
            .expect("tag");
    }

    pub fn lightweight_tag(&self, name: &str, target: &str) {
        let oid = Oid::from_str(target).expect("oid");
        let object = self.repo.find_object(oid, None).expect("object");
        self.repo.tag_lightweight(name, &object, false).expect("tag");
    }

    pub fn delete_tag(&self, name: &str) {
        self.repo.tag_delete(name).expect("tag delete");
    }

    /// Apply a mutator plan with explicit, strictly increasing tag times.
    pub fn apply(&self, plan: &[TagWrite], base_secs: i64) {
        for (i, write) in plan.iter().enumerate() {
            self.tag(&write.tag, &write.target, &write.message, base_secs + i as i64);
        }
    }

    /// Collect over full history and assemble.
    pub fn registry(&self, config: &RegistryConfig) -> RegistryState {
        let repo = gitreg::git::GitRepo::open(self.path()).expect("open");
        let stream = collect(&repo, config, &Scope::AllCommits, &CancelToken::none())
            .expect("collect");
        assemble(&stream, config)
    }
}

fn signature(secs: i64) -> Signature<'static> {
    Signature::new("Tester", "tester@example.com", &Time::new(secs, 0)).expect("signature")
}
