//! Tag codec: the bidirectional mapping between git tag names and typed
//! registry actions.
//!
//! Grammars (the `!` suffix negates the positive form):
//!
//! ```text
//! <name>@<version>            registration
//! <name>@<version>!           deregistration
//! <name>@deprecated[#<seq>]   artifact deprecation
//! <name>#<stage>[#<seq>]      stage assignment
//! <name>#<stage>![#<seq>]     stage unassignment
//! ```
//!
//! Classification is a single left-to-right split: the leftmost sentinel
//! (`@` or `#`) decides the family. Tags matching no grammar parse to
//! `None` so foreign tags in a repository are tolerated.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::name::{ArtifactName, Stage, is_valid as is_valid_name};
use super::version::{Convention, is_valid as is_valid_version};

/// Version token reserved for artifact-level deprecation tags. Versions
/// always start with `v`, so it cannot collide.
pub const DEPRECATED: &str = "deprecated";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TagAction {
    Register { version: String },
    Deregister { version: String },
    Deprecate { seq: Option<u64> },
    Assign { stage: Stage, seq: Option<u64> },
    Unassign { stage: Stage, seq: Option<u64> },
}

/// A tag name decoded into its registry meaning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTag {
    pub name: ArtifactName,
    pub action: TagAction,
}

fn parse_seq(raw: &str) -> Option<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn parse_version_family(raw: &str, convention: Convention) -> Option<ParsedTag> {
    let (name, rest) = raw.split_once('@')?;
    let name = ArtifactName::parse(name).ok()?;

    if rest == DEPRECATED {
        return Some(ParsedTag {
            name,
            action: TagAction::Deprecate { seq: None },
        });
    }
    if let Some(seq) = rest.strip_prefix(DEPRECATED).and_then(|r| r.strip_prefix('#')) {
        let seq = parse_seq(seq)?;
        return Some(ParsedTag {
            name,
            action: TagAction::Deprecate { seq: Some(seq) },
        });
    }

    let (version, negated) = match rest.strip_suffix('!') {
        Some(version) => (version, true),
        None => (rest, false),
    };
    if !is_valid_version(version, convention) {
        return None;
    }
    let version = version.to_string();
    let action = if negated {
        TagAction::Deregister { version }
    } else {
        TagAction::Register { version }
    };
    Some(ParsedTag { name, action })
}

fn parse_stage_family(raw: &str) -> Option<ParsedTag> {
    let parts: Vec<&str> = raw.split('#').collect();
    if parts.len() != 2 && parts.len() != 3 {
        return None;
    }
    let name = ArtifactName::parse(parts[0]).ok()?;

    let (stage_raw, mut negated) = match parts[1].strip_suffix('!') {
        Some(stage) => (stage, true),
        None => (parts[1], false),
    };
    if !is_valid_name(stage_raw) {
        return None;
    }
    let stage = Stage::parse(stage_raw).ok()?;

    let seq = match parts.get(2) {
        None => None,
        Some(seq_raw) => {
            // Older tooling appended the negation after the counter
            // (`name#stage#3!`); accept it on read and normalize.
            let seq_raw = match seq_raw.strip_suffix('!') {
                Some(trimmed) if !negated => {
                    negated = true;
                    trimmed
                }
                Some(_) => return None,
                None => seq_raw,
            };
            Some(parse_seq(seq_raw)?)
        }
    };

    let action = if negated {
        TagAction::Unassign { stage, seq }
    } else {
        TagAction::Assign { stage, seq }
    };
    Some(ParsedTag { name, action })
}

/// Decode a tag name. Returns `None` for anything that is not a registry
/// tag under the active convention.
pub fn parse(raw: &str, convention: Convention) -> Option<ParsedTag> {
    let at = raw.find('@');
    let hash = raw.find('#');
    match (at, hash) {
        (Some(a), Some(h)) if a < h => parse_version_family(raw, convention),
        (Some(_), None) => parse_version_family(raw, convention),
        (_, Some(_)) => parse_stage_family(raw),
        (None, None) => None,
    }
}

/// Decode a tag name, reporting why it failed. Used on the mutator-facing
/// path where the caller handed us the name explicitly.
pub fn parse_strict(raw: &str, convention: Convention) -> Result<ParsedTag, ValidationError> {
    if let Some(parsed) = parse(raw, convention) {
        return Ok(parsed);
    }
    if let Some((name, rest)) = raw.split_once('@') {
        if is_valid_name(name) && !rest.starts_with(DEPRECATED) {
            let version = rest.strip_suffix('!').unwrap_or(rest);
            return Err(ValidationError::InvalidVersion {
                raw: version.to_string(),
                convention: convention.as_str().to_string(),
            });
        }
    }
    Err(ValidationError::NotARegistryTag {
        raw: raw.to_string(),
    })
}

/// Encode a tag back to its canonical name. Inverse of [`parse`] for every
/// tag the mutator produces.
pub fn format(tag: &ParsedTag) -> String {
    let name = tag.name.as_str();
    match &tag.action {
        TagAction::Register { version } => format!("{name}@{version}"),
        TagAction::Deregister { version } => format!("{name}@{version}!"),
        TagAction::Deprecate { seq: None } => format!("{name}@{DEPRECATED}"),
        TagAction::Deprecate { seq: Some(seq) } => format!("{name}@{DEPRECATED}#{seq}"),
        TagAction::Assign { stage, seq: None } => format!("{name}#{stage}"),
        TagAction::Assign {
            stage,
            seq: Some(seq),
        } => format!("{name}#{stage}#{seq}"),
        TagAction::Unassign { stage, seq: None } => format!("{name}#{stage}!"),
        TagAction::Unassign {
            stage,
            seq: Some(seq),
        } => format!("{name}#{stage}!#{seq}"),
    }
}
