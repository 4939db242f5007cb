//! Composite resource identities
//!
//! Some backend objects have no identifier of their own. For those the
//! provider synthesizes one by joining the parent object's id and the
//! child's name with a colon, and must split it back symmetrically on
//! every read. Both components are validated up front so that formatting
//! and parsing always round-trip.

use crate::error::IdentityError;
use std::fmt;
use std::str::FromStr;

/// Separator between the two components of a composite identity.
pub const ID_SEPARATOR: char = ':';

/// A provider-synthesized identity of the form `"<parent>:<name>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeId {
    parent: String,
    name: String,
}

impl CompositeId {
    /// Build an identity from its two components.
    ///
    /// Fails if either component is empty or contains the separator;
    /// such an identity could not be parsed back into the same parts.
    pub fn new(
        parent: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        let parent = parent.into();
        let name = name.into();
        check_component("parent", &parent)?;
        check_component("name", &name)?;
        Ok(Self { parent, name })
    }

    pub fn parent(&self) -> &str {
        &self.parent
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn check_component(component: &'static str, value: &str) -> Result<(), IdentityError> {
    if value.is_empty() {
        return Err(IdentityError::EmptyComponent { component });
    }
    if value.contains(ID_SEPARATOR) {
        return Err(IdentityError::SeparatorInComponent {
            component,
            value: value.to_string(),
        });
    }
    Ok(())
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.parent, ID_SEPARATOR, self.name)
    }
}

impl FromStr for CompositeId {
    type Err = IdentityError;

    /// Split into exactly two non-empty components. Any other shape,
    /// including extra separators or empty halves, is malformed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(ID_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(parent), Some(name), None) if !parent.is_empty() && !name.is_empty() => {
                Ok(Self {
                    parent: parent.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(IdentityError::Malformed { raw: s.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_format_parse_round_trip() {
        let id = CompositeId::new("r-abc123", "default").unwrap();
        assert_eq!(id.to_string(), "r-abc123:default");

        let parsed: CompositeId = "r-abc123:default".parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(parsed.parent(), "r-abc123");
        assert_eq!(parsed.name(), "default");
    }

    #[test]
    fn test_rejects_malformed_strings() {
        for raw in ["", "no-separator", ":name", "parent:", "a:b:c", ":"] {
            let err = raw.parse::<CompositeId>().unwrap_err();
            assert_eq!(
                err,
                IdentityError::Malformed {
                    raw: raw.to_string()
                }
            );
        }
    }

    #[test]
    fn test_rejects_bad_components() {
        assert!(matches!(
            CompositeId::new("", "g1"),
            Err(IdentityError::EmptyComponent { component: "parent" })
        ));
        assert!(matches!(
            CompositeId::new("i-1", ""),
            Err(IdentityError::EmptyComponent { component: "name" })
        ));
        assert!(matches!(
            CompositeId::new("i:1", "g1"),
            Err(IdentityError::SeparatorInComponent { component: "parent", .. })
        ));
        assert!(matches!(
            CompositeId::new("i-1", "g:1"),
            Err(IdentityError::SeparatorInComponent { component: "name", .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_round_trip(parent in "[a-zA-Z0-9._-]{1,32}", name in "[a-zA-Z0-9._-]{1,32}") {
            let id = CompositeId::new(parent.as_str(), name.as_str()).unwrap();
            let parsed: CompositeId = id.to_string().parse().unwrap();
            prop_assert_eq!(parsed.parent(), parent.as_str());
            prop_assert_eq!(parsed.name(), name.as_str());
        }
    }
}
