//! Dispatch backend trait

use crate::error::Result;
use crate::types::{DispatchCheckRequest, DispatchCheckResponse};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Performs one membership check between a subject and a candidate resource
///
/// Implementations must tolerate many concurrent invocations. Once
/// `lifetime` is cancelled a call should return promptly; callers never
/// start new calls on a cancelled lifetime.
#[async_trait]
pub trait DispatchCheck: Send + Sync {
    /// Evaluate whether `request.subject` is a member of `request.resource`
    async fn dispatch_check(
        &self,
        lifetime: CancellationToken,
        request: DispatchCheckRequest,
    ) -> Result<DispatchCheckResponse>;
}

#[async_trait]
impl<T: DispatchCheck + ?Sized> DispatchCheck for Arc<T> {
    async fn dispatch_check(
        &self,
        lifetime: CancellationToken,
        request: DispatchCheckRequest,
    ) -> Result<DispatchCheckResponse> {
        (**self).dispatch_check(lifetime, request).await
    }
}
