use crate::domain::model::{DisplayTarget, FailurePolicy, FetchOutcome};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Issues one request to the update endpoint.
///
/// Transport and status failures are part of the returned outcome, not errors.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self) -> FetchOutcome;
}

#[async_trait]
impl<T: Fetcher + ?Sized> Fetcher for Arc<T> {
    async fn fetch(&self) -> FetchOutcome {
        (**self).fetch().await
    }
}

/// A surface holding named markup regions.
///
/// Regions pre-exist; writing to an unknown one fails with `TargetNotFound`.
pub trait Display: Send + Sync {
    fn replace_content(
        &self,
        target: &DisplayTarget,
        markup: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn content(
        &self,
        target: &DisplayTarget,
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn endpoint(&self) -> &str;
    fn interval(&self) -> Duration;
    fn failure_policy(&self) -> FailurePolicy;
    fn max_cycles(&self) -> Option<u64>;
    fn target(&self) -> &str;
    fn output_dir(&self) -> &str;
}
