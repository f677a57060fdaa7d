//! Version algebra: ordering, validation, and bumps under the two
//! supported conventions.
//!
//! Numbered versions are `v<N>` with N >= 1 and no leading zeros. Semantic
//! versions are `v<MAJOR>.<MINOR>.<PATCH>` per SemVer 2.0.0; pre-release
//! and build metadata are accepted, build metadata never affects
//! precedence.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Convention {
    #[default]
    Numbers,
    #[serde(rename = "semver")]
    SemVer,
}

impl Convention {
    pub fn as_str(&self) -> &'static str {
        match self {
            Convention::Numbers => "numbers",
            Convention::SemVer => "semver",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    ByTime,
    #[serde(rename = "by_semver")]
    BySemVer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BumpPart {
    Major,
    Minor,
    Patch,
}

fn parse_numbered(raw: &str) -> Option<u64> {
    let digits = raw.strip_prefix('v')?;
    if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    digits.parse().ok()
}

fn parse_semver(raw: &str) -> Option<semver::Version> {
    let body = raw.strip_prefix('v')?;
    semver::Version::parse(body).ok()
}

/// Whether `raw` is a well-formed version under `convention`.
pub fn is_valid(raw: &str, convention: Convention) -> bool {
    match convention {
        Convention::Numbers => parse_numbered(raw).is_some(),
        Convention::SemVer => parse_semver(raw).is_some(),
    }
}

fn invalid(raw: &str, convention: Convention) -> ValidationError {
    ValidationError::InvalidVersion {
        raw: raw.to_string(),
        convention: convention.as_str().to_string(),
    }
}

/// Total order on version strings under `convention`. Build metadata is
/// ignored for semantic versions.
pub fn compare(a: &str, b: &str, convention: Convention) -> Result<Ordering, ValidationError> {
    match convention {
        Convention::Numbers => {
            let left = parse_numbered(a).ok_or_else(|| invalid(a, convention))?;
            let right = parse_numbered(b).ok_or_else(|| invalid(b, convention))?;
            Ok(left.cmp(&right))
        }
        Convention::SemVer => {
            let left = parse_semver(a).ok_or_else(|| invalid(a, convention))?;
            let right = parse_semver(b).ok_or_else(|| invalid(b, convention))?;
            Ok(left.cmp_precedence(&right))
        }
    }
}

/// True when `raw` carries a pre-release component (semver only).
pub fn is_prerelease(raw: &str, convention: Convention) -> bool {
    match convention {
        Convention::Numbers => false,
        Convention::SemVer => parse_semver(raw).is_some_and(|v| !v.pre.is_empty()),
    }
}

/// Compute the next version. With no previous version the seed is `v1`
/// (numbers) or `v0.0.1` (semver). For numbered versions `part` is
/// ignored; for semantic versions it defaults to a patch bump and zeroes
/// the lower fields, dropping pre-release and build metadata.
pub fn bump(
    previous: Option<&str>,
    part: Option<BumpPart>,
    convention: Convention,
) -> Result<String, ValidationError> {
    match convention {
        Convention::Numbers => match previous {
            None => Ok("v1".to_string()),
            Some(prev) => {
                let n = parse_numbered(prev).ok_or_else(|| invalid(prev, convention))?;
                Ok(format!("v{}", n + 1))
            }
        },
        Convention::SemVer => match previous {
            None => Ok("v0.0.1".to_string()),
            Some(prev) => {
                let v = parse_semver(prev).ok_or_else(|| invalid(prev, convention))?;
                let next = match part.unwrap_or(BumpPart::Patch) {
                    BumpPart::Major => semver::Version::new(v.major + 1, 0, 0),
                    BumpPart::Minor => semver::Version::new(v.major, v.minor + 1, 0),
                    BumpPart::Patch => semver::Version::new(v.major, v.minor, v.patch + 1),
                };
                Ok(format!("v{next}"))
            }
        },
    }
}

/// Greatest version among `versions` under `convention`. Invalid strings
/// are skipped; pre-release versions are skipped unless `include_pre`.
pub fn greatest<'a, I>(versions: I, convention: Convention, include_pre: bool) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions
        .into_iter()
        .filter(|v| is_valid(v, convention))
        .filter(|v| include_pre || !is_prerelease(v, convention))
        .max_by(|a, b| compare(a, b, convention).unwrap_or(Ordering::Equal))
}
