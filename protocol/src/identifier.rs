//! Namespaced payload identifiers.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::IdentifierError;

/// Separator between namespace and path in the text form.
pub const SEPARATOR: char = ':';

/// An immutable `(namespace, path)` pair rendered as `namespace:path`.
///
/// Both parts must be non-empty and match `[a-z0-9_.-]+`. Equality, ordering
/// and hashing are structural over the two parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Identifier {
    namespace: Cow<'static, str>,
    path: Cow<'static, str>,
}

impl Identifier {
    /// Creates a validated identifier.
    pub fn new(
        namespace: impl Into<Cow<'static, str>>,
        path: impl Into<Cow<'static, str>>,
    ) -> Result<Self, IdentifierError> {
        let id = Self {
            namespace: namespace.into(),
            path: path.into(),
        };
        id.validate()?;
        Ok(id)
    }

    /// Creates an identifier from static parts without validating.
    ///
    /// Registries validate on registration, so a malformed static identifier
    /// is still caught at startup.
    #[must_use]
    pub const fn from_static(namespace: &'static str, path: &'static str) -> Self {
        Self {
            namespace: Cow::Borrowed(namespace),
            path: Cow::Borrowed(path),
        }
    }

    /// Parses `namespace:path`.
    pub fn parse(text: &str) -> Result<Self, IdentifierError> {
        let (namespace, path) =
            text.split_once(SEPARATOR)
                .ok_or_else(|| IdentifierError::MissingSeparator {
                    text: text.to_owned(),
                })?;
        Self::new(namespace.to_owned(), path.to_owned())
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Checks both parts against `[a-z0-9_.-]+`.
    pub fn validate(&self) -> Result<(), IdentifierError> {
        validate_part(&self.namespace, self)?;
        validate_part(&self.path, self)
    }
}

fn validate_part(part: &str, id: &Identifier) -> Result<(), IdentifierError> {
    if part.is_empty() {
        return Err(IdentifierError::EmptyPart {
            text: id.to_string(),
        });
    }
    if let Some(found) = part.chars().find(|c| !is_allowed(*c)) {
        return Err(IdentifierError::InvalidCharacter {
            text: id.to_string(),
            found,
        });
    }
    Ok(())
}

const fn is_allowed(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '_' | '.' | '-')
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.namespace, self.path)
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
