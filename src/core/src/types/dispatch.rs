//! Check request and response types
//!
//! These mirror what a dispatch backend receives and returns for a single
//! "is the subject a member of this resource's relation" evaluation.

use super::onr::ObjectAndRelation;
use serde::{Deserialize, Serialize};

/// Default recursion budget for a fresh top-level check
pub const DEFAULT_DEPTH: u32 = 50;

/// Context threaded through dispatch calls unchanged
///
/// The dispatch engine never inspects these fields; they exist for the
/// backend (consistency, recursion budget) and for tracing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverMeta {
    /// Consistency token the check must be evaluated at
    pub at_revision: String,

    /// Remaining recursion budget
    pub depth_remaining: u32,

    /// Identifier correlating every dispatch of one logical request
    pub request_id: String,
}

impl ResolverMeta {
    /// Create metadata for a new top-level request
    pub fn new(at_revision: impl Into<String>) -> Self {
        Self {
            at_revision: at_revision.into(),
            depth_remaining: DEFAULT_DEPTH,
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Set the remaining recursion budget
    pub fn with_depth_remaining(mut self, depth_remaining: u32) -> Self {
        self.depth_remaining = depth_remaining;
        self
    }

    /// Set the request identifier
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }
}

/// A single check handed to a dispatch backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchCheckRequest {
    pub metadata: ResolverMeta,

    /// Candidate resource being tested
    pub resource: ObjectAndRelation,

    /// Subject whose membership is evaluated
    pub subject: ObjectAndRelation,
}

/// Outcome of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Membership {
    Member,
    NotMember,
}

impl Membership {
    pub fn is_member(self) -> bool {
        matches!(self, Membership::Member)
    }
}

impl From<bool> for Membership {
    fn from(member: bool) -> Self {
        if member {
            Membership::Member
        } else {
            Membership::NotMember
        }
    }
}

/// Bookkeeping a backend reports about the work behind one answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResponseMeta {
    /// Number of dispatches performed, including this one
    pub dispatch_count: u32,

    /// Recursion depth the answer required
    pub depth_required: u32,
}

/// Backend answer to a `DispatchCheckRequest`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchCheckResponse {
    pub membership: Membership,

    #[serde(default)]
    pub metadata: ResponseMeta,
}

impl DispatchCheckResponse {
    /// Response for a single, non-recursive dispatch
    pub fn new(membership: Membership) -> Self {
        Self {
            membership,
            metadata: ResponseMeta {
                dispatch_count: 1,
                depth_required: 1,
            },
        }
    }

    pub fn member() -> Self {
        Self::new(Membership::Member)
    }

    pub fn not_member() -> Self {
        Self::new(Membership::NotMember)
    }
}
