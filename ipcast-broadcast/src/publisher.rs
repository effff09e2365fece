use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::PublishError;

#[async_trait]
/// A downstream sink which reconciles an external system to an endpoint set.
///
/// Publishers are invoked concurrently with each other by the broadcaster, they
/// must only read the endpoints given to them and share no mutable state with
/// other publishers.
pub trait Publisher: Send + Sync + 'static {
    /// A short name identifying the publisher in logs and error reports.
    fn name(&self) -> &str;

    /// Publishes the endpoint set.
    ///
    /// Long running calls should give up promptly once `cancel` fires.
    async fn publish(
        &self,
        cancel: &CancellationToken,
        endpoints: &[String],
    ) -> Result<(), PublishError>;
}

#[async_trait]
impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    fn name(&self) -> &str {
        self.as_ref().name()
    }

    async fn publish(
        &self,
        cancel: &CancellationToken,
        endpoints: &[String],
    ) -> Result<(), PublishError> {
        self.as_ref().publish(cancel, endpoints).await
    }
}
