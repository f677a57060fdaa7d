#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod git;
pub mod telemetry;

pub use error::{
    ConfigError, ConflictError, Error, NotFoundError, PreconditionError, RepositoryError,
    ValidationError,
};
pub type Result<T> = std::result::Result<T, Error>;

// Re-export core types at crate root for convenience
pub use crate::core::{
    ArtifactIndex, ArtifactName, ArtifactState, BumpPart, CancelToken, Convention, Event,
    EventKind, EventStream, IndexEntry, Marker, RegistryState, Scope, SortOrder, Stage,
    StageState, TagAction, TagWrite, VersionState,
};
