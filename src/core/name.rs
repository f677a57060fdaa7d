//! Validated names for artifacts and stages.
//!
//! The same rule governs both: non-empty UTF-8 with no whitespace and none
//! of the tag sentinels `@ # ! :`. Validation happens at construction so
//! invalid names are unrepresentable downstream.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const FORBIDDEN: [char; 4] = ['@', '#', '!', ':'];

fn check(raw: &str) -> Result<(), ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::InvalidName {
            raw: raw.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if let Some(c) = raw.chars().find(|c| c.is_whitespace()) {
        return Err(ValidationError::InvalidName {
            raw: raw.to_string(),
            reason: format!("contains whitespace {c:?}"),
        });
    }
    if let Some(c) = raw.chars().find(|c| FORBIDDEN.contains(c)) {
        return Err(ValidationError::InvalidName {
            raw: raw.to_string(),
            reason: format!("contains reserved character `{c}`"),
        });
    }
    Ok(())
}

/// Returns true when `raw` is a well-formed artifact or stage name.
pub fn is_valid(raw: &str) -> bool {
    check(raw).is_ok()
}

macro_rules! name_newtype {
    ($(#[$doc:meta])* $ty:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $ty(String);

        impl $ty {
            pub fn parse(raw: impl Into<String>) -> Result<Self, ValidationError> {
                let raw = raw.into();
                check(&raw)?;
                Ok(Self(raw))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = ValidationError;

            fn try_from(raw: String) -> Result<Self, Self::Error> {
                Self::parse(raw)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> String {
                value.0
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

name_newtype! {
    /// A named, versionable entity tracked by the registry.
    ArtifactName
}

name_newtype! {
    /// A lifecycle label attached to versions of an artifact.
    Stage
}
