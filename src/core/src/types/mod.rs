//! Shared types for permission dispatch

pub mod onr;
pub mod dispatch;

// Re-export commonly used types
pub use onr::ObjectAndRelation;
pub use dispatch::{
    DispatchCheckRequest, DispatchCheckResponse, Membership, ResolverMeta, ResponseMeta,
};
