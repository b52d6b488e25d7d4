//! Object-and-relation identities
//!
//! Both the subject of a check and every candidate resource are
//! `(object type, object id, relation)` triples, written `type:id#relation`.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Relation used for a subject that refers to the object itself
pub const ELLIPSIS: &str = "...";

/// An object together with one of its relations
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectAndRelation {
    /// Object type (e.g., "document", "user")
    pub namespace: String,

    /// Object identifier within its type
    pub object_id: String,

    /// Relation or permission name (e.g., "viewer")
    pub relation: String,
}

impl ObjectAndRelation {
    /// Create a new identity without validation
    pub fn new(
        namespace: impl Into<String>,
        object_id: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            object_id: object_id.into(),
            relation: relation.into(),
        }
    }

    /// Create an identity that refers to the object itself (`type:id#...`)
    pub fn object(namespace: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self::new(namespace, object_id, ELLIPSIS)
    }

    /// Whether the relation is the ellipsis placeholder
    pub fn is_ellipsis(&self) -> bool {
        self.relation == ELLIPSIS
    }

    /// Parse a `type:id#relation` string
    pub fn parse(input: &str) -> Result<Self> {
        let (object, relation) = input
            .rsplit_once('#')
            .ok_or_else(|| CoreError::invalid_onr(input, "missing `#relation`"))?;
        let (namespace, object_id) = object
            .split_once(':')
            .ok_or_else(|| CoreError::invalid_onr(input, "missing `type:` prefix"))?;

        if namespace.is_empty() {
            return Err(CoreError::invalid_onr(input, "empty object type"));
        }
        if object_id.is_empty() {
            return Err(CoreError::invalid_onr(input, "empty object id"));
        }
        if relation.is_empty() {
            return Err(CoreError::invalid_onr(input, "empty relation"));
        }
        if object_id.contains('#') || relation.contains(':') {
            return Err(CoreError::invalid_onr(input, "unexpected separator"));
        }

        Ok(Self::new(namespace, object_id, relation))
    }
}

impl fmt::Display for ObjectAndRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}", self.namespace, self.object_id, self.relation)
    }
}

impl FromStr for ObjectAndRelation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
