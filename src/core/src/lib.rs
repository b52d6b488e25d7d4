//! # Relgraph Core
//!
//! Shared types, traits, and error handling for relationship-based
//! permission checks. The dispatch engine and any dispatch backend
//! depend on this crate and nothing else from each other.

pub mod types;
pub mod traits;
pub mod error;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use traits::DispatchCheck;
pub use types::{
    DispatchCheckRequest, DispatchCheckResponse, Membership, ObjectAndRelation, ResolverMeta,
    ResponseMeta,
};
