//! Error taxonomy.
//!
//! Bounded, capability-scoped enums composed into a thin crate-level
//! wrapper. Each user-visible failure carries the offending input and,
//! where one exists, the conflicting tag name.

use std::path::PathBuf;

use thiserror::Error;

/// Malformed inputs: bad names, bad versions, tags that cannot be formed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("name `{raw}` is invalid: {reason}")]
    InvalidName { raw: String, reason: String },

    #[error("version `{raw}` is not a valid {convention} version")]
    InvalidVersion { raw: String, convention: String },

    #[error("stage `{stage}` is not allowed (configured stages: {allowed:?})")]
    StageNotAllowed { stage: String, allowed: Vec<String> },

    #[error("artifact type `{ty}` is not allowed (configured types: {allowed:?})")]
    TypeNotAllowed { ty: String, allowed: Vec<String> },

    #[error("`{raw}` is not a registry tag")]
    NotARegistryTag { raw: String },

    #[error("exactly one of version or ref must be given")]
    VersionXorRef,

    #[error("bump part is required for semver when no version is given")]
    BumpPartRequired,
}

/// State-dependent rejections raised by the mutator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PreconditionError {
    #[error("version `{version}` of `{name}` is already registered (tag `{tag}`)")]
    VersionAlreadyRegistered {
        name: String,
        version: String,
        tag: String,
    },

    #[error("commit {commit} already carries version `{version}` of `{name}`")]
    VersionExistsForCommit {
        name: String,
        version: String,
        commit: String,
    },

    #[error("version `{suggested}` of `{name}` precedes the latest `{latest}`")]
    VersionIsOld {
        name: String,
        latest: String,
        suggested: String,
    },

    #[error("artifact `{name}` is deprecated; pass --force to register anyway")]
    ArtifactDeprecated { name: String },

    #[error("version `{version}` of `{name}` is not registered")]
    VersionNotRegistered { name: String, version: String },

    #[error("stage `{stage}` is not currently assigned to `{name}`")]
    StageNotAssigned { name: String, stage: String },
}

/// Something the query or mutation referred to does not exist.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NotFoundError {
    #[error("artifact `{name}` not found in the registry")]
    Artifact { name: String },

    #[error("version `{version}` of `{name}` not found")]
    Version { name: String, version: String },

    #[error("stage `{stage}` of `{name}` not found")]
    Stage { name: String, stage: String },

    #[error("ref `{reference}` not found in the repository")]
    Ref { reference: String },
}

/// A planned tag collides with an existing one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("tag `{tag}` already exists")]
pub struct ConflictError {
    pub tag: String,
}

/// Invalid or unreadable configuration, including a malformed index at HEAD.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("malformed index `{path}`: {reason}")]
    MalformedIndex { path: String, reason: String },

    #[error("failed to write {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}

/// External git or filesystem failure surfaced from the adapter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RepositoryError {
    #[error("git: {0}")]
    Git(#[from] git2::Error),

    #[error("not a git repository at {path}")]
    NotARepository { path: PathBuf },

    #[error("repository has no working directory")]
    Bare,

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-level convenience error: a thin wrapper over capability errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Process exit code for the CLI: 1 for user errors, 2 for internal
    /// failures, 130 for cancellation.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_)
            | Error::Precondition(_)
            | Error::NotFound(_)
            | Error::Conflict(_) => 1,
            Error::Config(_) | Error::Repository(_) => 2,
            Error::Cancelled => 130,
        }
    }
}

impl From<git2::Error> for Error {
    fn from(e: git2::Error) -> Self {
        Error::Repository(RepositoryError::Git(e))
    }
}
