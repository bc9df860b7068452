use serde::{Deserialize, Serialize};
use std::fmt;

pub const REFERENCE_TYPE: &str = "reference";

/// A reference from one account resource to another.
///
/// `Id` points at a resource defined in the same resource set by its sanitized
/// ID. `Name` names a resource assumed to already exist on the account (for
/// example a built-in policy) that is not managed here.
///
/// On disk a `Name` is a bare string and an `Id` is the mapping
/// `{type: reference, id: <id>}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RefRepr", into = "RefRepr")]
pub enum Ref {
    Id(String),
    Name(String),
}

impl Ref {
    pub fn id(id: impl Into<String>) -> Self {
        Ref::Id(id.into())
    }

    pub fn name(name: impl Into<String>) -> Self {
        Ref::Name(name.into())
    }

    /// The identifying string: the referenced ID or the display name.
    pub fn id_or_name(&self) -> &str {
        match self {
            Ref::Id(id) => id,
            Ref::Name(name) => name,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Ref::Id(_))
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ref::Id(id) => write!(f, "reference '{}'", id),
            Ref::Name(name) => write!(f, "'{}'", name),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RefRepr {
    Name(String),
    Typed {
        #[serde(rename = "type")]
        kind: String,
        #[serde(default)]
        id: String,
    },
}

impl TryFrom<RefRepr> for Ref {
    type Error = String;

    fn try_from(repr: RefRepr) -> Result<Self, Self::Error> {
        match repr {
            RefRepr::Name(name) => Ok(Ref::Name(name)),
            RefRepr::Typed { kind, id } if kind == REFERENCE_TYPE => Ok(Ref::Id(id)),
            RefRepr::Typed { kind, .. } => Err(format!(
                "unknown reference type '{}', expected '{}'",
                kind, REFERENCE_TYPE
            )),
        }
    }
}

impl From<Ref> for RefRepr {
    fn from(reference: Ref) -> Self {
        match reference {
            Ref::Id(id) => RefRepr::Typed {
                kind: REFERENCE_TYPE.to_string(),
                id,
            },
            Ref::Name(name) => RefRepr::Name(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_string_reference() {
        let r: Ref = serde_yaml::from_str("Environment role - Viewer").unwrap();
        assert_eq!(r, Ref::name("Environment role - Viewer"));
    }

    #[test]
    fn test_parse_id_reference() {
        let r: Ref = serde_yaml::from_str("{type: reference, id: my-policy}").unwrap();
        assert_eq!(r, Ref::id("my-policy"));
    }

    #[test]
    fn test_parse_id_reference_without_id_keeps_it_empty() {
        let r: Ref = serde_yaml::from_str("type: reference").unwrap();
        assert_eq!(r, Ref::id(""));
    }

    #[test]
    fn test_parse_unknown_reference_type_fails() {
        let result: Result<Ref, _> = serde_yaml::from_str("{type: group, id: x}");
        assert!(result.is_err());
    }

    #[test]
    fn test_serialize_forms() {
        let id = serde_yaml::to_string(&Ref::id("my-group")).unwrap();
        assert_eq!(id, "type: reference\nid: my-group\n");

        let name = serde_yaml::to_string(&Ref::name("Admins")).unwrap();
        assert_eq!(name, "Admins\n");
    }

    #[test]
    fn test_id_or_name() {
        assert_eq!(Ref::id("my-policy").id_or_name(), "my-policy");
        assert_eq!(Ref::name("Environment role - Viewer").id_or_name(), "Environment role - Viewer");
        assert!(Ref::id("x").is_internal());
        assert!(!Ref::name("x").is_internal());
    }
}
