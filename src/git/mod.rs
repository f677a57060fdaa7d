//! Git adapter.
//!
//! The one place that touches `git2`. The core consumes plain data
//! (tags, commits, blobs) from here and hands back tag plans; nothing in
//! `core` depends on `git2` types.

use std::path::{Path, PathBuf};

use git2::{Oid, Repository};
use time::OffsetDateTime;

use crate::error::{ConflictError, Error, NotFoundError, RepositoryError};
use crate::Result;

/// A tag ref with the metadata the collector needs. For annotated tags
/// the tagger and tag time come from the tag object; lightweight tags
/// fall back to the target commit.
#[derive(Clone, Debug)]
pub struct TagInfo {
    pub name: String,
    /// Sha of the commit the tag (eventually) points at.
    pub target: String,
    pub message: String,
    pub tagger_name: String,
    pub tagger_email: String,
    /// Tag creation time; commit committer time for lightweight tags.
    pub tag_time: OffsetDateTime,
    /// Committer time of the target commit.
    pub commit_time: OffsetDateTime,
    pub annotated: bool,
}

#[derive(Clone, Debug)]
pub struct CommitInfo {
    pub sha: String,
    pub author_name: String,
    pub author_email: String,
    pub summary: String,
    pub commit_time: OffsetDateTime,
}

pub struct GitRepo {
    inner: Repository,
}

fn to_datetime(t: git2::Time) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(t.seconds()).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

impl GitRepo {
    /// Open the repository containing `path` (or the current directory).
    pub fn discover(path: Option<&Path>) -> Result<Self> {
        let start: PathBuf = match path {
            Some(p) => p.to_path_buf(),
            None => std::env::current_dir().map_err(RepositoryError::Io)?,
        };
        let inner = Repository::discover(&start)
            .map_err(|_| RepositoryError::NotARepository { path: start })?;
        Ok(Self { inner })
    }

    pub fn open(path: &Path) -> Result<Self> {
        let inner = Repository::open(path).map_err(|_| RepositoryError::NotARepository {
            path: path.to_path_buf(),
        })?;
        Ok(Self { inner })
    }

    pub fn workdir(&self) -> Result<&Path> {
        self.inner.workdir().ok_or(Error::Repository(RepositoryError::Bare))
    }

    /// Resolve any refspec (sha, branch, tag, `HEAD~2`, ...) to a commit
    /// sha.
    pub fn resolve_commit(&self, refspec: &str) -> Result<String> {
        let object = self
            .inner
            .revparse_single(refspec)
            .map_err(|_| NotFoundError::Ref {
                reference: refspec.to_string(),
            })?;
        let commit = object.peel_to_commit().map_err(|_| NotFoundError::Ref {
            reference: refspec.to_string(),
        })?;
        Ok(commit.id().to_string())
    }

    pub fn head_commit(&self) -> Result<String> {
        let head = self.inner.head().map_err(RepositoryError::Git)?;
        let commit = head.peel_to_commit().map_err(RepositoryError::Git)?;
        Ok(commit.id().to_string())
    }

    pub fn commit_info(&self, sha: &str) -> Result<CommitInfo> {
        let oid = Oid::from_str(sha).map_err(RepositoryError::Git)?;
        let commit = self.inner.find_commit(oid).map_err(RepositoryError::Git)?;
        Ok(CommitInfo {
            sha: commit.id().to_string(),
            author_name: commit.author().name().unwrap_or_default().to_string(),
            author_email: commit.author().email().unwrap_or_default().to_string(),
            summary: commit.summary().unwrap_or_default().to_string(),
            commit_time: to_datetime(commit.committer().when()),
        })
    }

    /// All tag refs with their metadata, in ref order.
    pub fn tags(&self) -> Result<Vec<TagInfo>> {
        let names = self.inner.tag_names(None).map_err(RepositoryError::Git)?;
        let mut tags = Vec::with_capacity(names.len());
        for name in names.iter().flatten() {
            let reference = match self.inner.find_reference(&format!("refs/tags/{name}")) {
                Ok(r) => r,
                Err(_) => continue,
            };
            // Resolves through the tag object for annotated tags; the tag
            // object itself is looked up separately for tagger metadata.
            let commit = match reference.peel_to_commit() {
                Ok(c) => c,
                Err(_) => continue, // tag on a tree or blob
            };
            let commit_time = to_datetime(commit.committer().when());

            let tag_object = reference
                .target()
                .and_then(|oid| self.inner.find_tag(oid).ok());
            let info = match tag_object {
                Some(tag) => {
                    let tagger = tag.tagger();
                    TagInfo {
                        name: name.to_string(),
                        target: commit.id().to_string(),
                        message: tag.message().unwrap_or_default().trim_end().to_string(),
                        tagger_name: tagger
                            .as_ref()
                            .and_then(|s| s.name())
                            .unwrap_or_default()
                            .to_string(),
                        tagger_email: tagger
                            .as_ref()
                            .and_then(|s| s.email())
                            .unwrap_or_default()
                            .to_string(),
                        tag_time: tagger.as_ref().map(|s| to_datetime(s.when())).unwrap_or(commit_time),
                        commit_time,
                        annotated: true,
                    }
                }
                None => TagInfo {
                    name: name.to_string(),
                    target: commit.id().to_string(),
                    message: String::new(),
                    tagger_name: commit.author().name().unwrap_or_default().to_string(),
                    tagger_email: commit.author().email().unwrap_or_default().to_string(),
                    tag_time: commit_time,
                    commit_time,
                    annotated: false,
                },
            };
            tags.push(info);
        }
        Ok(tags)
    }

    /// Tip commits of all local branches.
    pub fn branch_tips(&self) -> Result<Vec<String>> {
        let mut tips = Vec::new();
        let branches = self
            .inner
            .branches(Some(git2::BranchType::Local))
            .map_err(RepositoryError::Git)?;
        for branch in branches {
            let (branch, _) = branch.map_err(RepositoryError::Git)?;
            if let Some(target) = branch.get().target() {
                tips.push(target.to_string());
            }
        }
        Ok(tips)
    }

    /// Walk history from the given start commits, deduplicated, newest
    /// first.
    pub fn walk(&self, starts: &[String]) -> Result<Vec<String>> {
        let mut walk = self.inner.revwalk().map_err(RepositoryError::Git)?;
        for sha in starts {
            let oid = Oid::from_str(sha).map_err(RepositoryError::Git)?;
            walk.push(oid).map_err(RepositoryError::Git)?;
        }
        let mut shas = Vec::new();
        for oid in walk {
            let oid = oid.map_err(RepositoryError::Git)?;
            shas.push(oid.to_string());
        }
        Ok(shas)
    }

    /// Read a blob at `path` in the tree of `commit_sha`. `None` when the
    /// path does not exist at that commit.
    pub fn blob_at(&self, commit_sha: &str, path: &str) -> Result<Option<Vec<u8>>> {
        let oid = Oid::from_str(commit_sha).map_err(RepositoryError::Git)?;
        let commit = self.inner.find_commit(oid).map_err(RepositoryError::Git)?;
        let tree = commit.tree().map_err(RepositoryError::Git)?;
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(RepositoryError::Git(e).into()),
        };
        let object = entry
            .to_object(&self.inner)
            .map_err(RepositoryError::Git)?;
        match object.as_blob() {
            Some(blob) => Ok(Some(blob.content().to_vec())),
            None => Ok(None),
        }
    }

    pub fn tag_exists(&self, name: &str) -> Result<bool> {
        match self.inner.find_reference(&format!("refs/tags/{name}")) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(false),
            Err(e) => Err(RepositoryError::Git(e).into()),
        }
    }

    /// Create an annotated tag on `target_sha`. Refuses to overwrite.
    pub fn create_tag(&self, name: &str, target_sha: &str, message: &str) -> Result<()> {
        if self.tag_exists(name)? {
            return Err(ConflictError {
                tag: name.to_string(),
            }
            .into());
        }
        let oid = Oid::from_str(target_sha).map_err(RepositoryError::Git)?;
        let commit = self.inner.find_commit(oid).map_err(RepositoryError::Git)?;
        let signature = self
            .inner
            .signature()
            .or_else(|_| git2::Signature::now("gitreg", "gitreg@localhost"))
            .map_err(RepositoryError::Git)?;
        self.inner
            .tag(name, commit.as_object(), &signature, message, false)
            .map_err(RepositoryError::Git)?;
        Ok(())
    }

    pub fn delete_tag(&self, name: &str) -> Result<()> {
        if !self.tag_exists(name)? {
            return Err(NotFoundError::Ref {
                reference: name.to_string(),
            }
            .into());
        }
        self.inner.tag_delete(name).map_err(RepositoryError::Git)?;
        Ok(())
    }
}
