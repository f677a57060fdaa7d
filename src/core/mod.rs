//! The registry state engine.
//!
//! Tags are parsed into typed events, merged with the declarative index,
//! folded into a canonical [`RegistryState`], and queried or extended with
//! new tag plans. Nothing in here touches git directly; the adapter in
//! [`crate::git`] feeds plain data in and applies plans back out.

pub mod cancel;
pub mod collect;
pub mod event;
pub mod index;
pub mod mutate;
pub mod name;
pub mod query;
pub mod state;
pub mod tag;
pub mod version;

pub use cancel::CancelToken;
pub use collect::{EventStream, Scope, collect};
pub use event::{Event, EventKind, Marker};
pub use index::{ArtifactIndex, IndexEntry};
pub use mutate::{IndexEdit, Mutator, TagWrite};
pub use name::{ArtifactName, Stage};
pub use query::{HistoryRow, ShowRow, VersionRow};
pub use state::{ArtifactState, RegistryState, StageState, VersionState, assemble};
pub use tag::{ParsedTag, TagAction};
pub use version::{BumpPart, Convention, SortOrder};
