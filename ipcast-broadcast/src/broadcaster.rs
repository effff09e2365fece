use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{AggregateError, BroadcastError, PublishError, PublishFailure};
use crate::publisher::Publisher;

/// A registered publisher, `None` slots are skipped and count as a success.
pub type PublisherSlot = Option<Arc<dyn Publisher>>;

#[derive(Clone, Default)]
/// Fans an endpoint set out to a set of publishers.
///
/// This handle is cheap to clone.
pub struct Broadcaster {
    publishers: Vec<PublisherSlot>,
    deadline: Option<Duration>,
}

impl Broadcaster {
    /// Creates a broadcaster without any publishers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a publisher.
    pub fn with_publisher(self, publisher: impl Publisher) -> Self {
        self.with_slot(Some(Arc::new(publisher)))
    }

    /// Register an already shared publisher.
    pub fn with_shared_publisher(self, publisher: Arc<dyn Publisher>) -> Self {
        self.with_slot(Some(publisher))
    }

    /// Register a publisher slot which may be empty.
    ///
    /// Empty slots are useful when a publisher is optional in the
    /// configuration, they are skipped when broadcasting.
    pub fn with_slot(mut self, slot: PublisherSlot) -> Self {
        self.publishers.push(slot);
        self
    }

    /// Register an empty slot.
    pub fn with_empty_slot(self) -> Self {
        self.with_slot(None)
    }

    /// Set the maximum amount of time each publisher may take.
    ///
    /// Publishers which overrun fail with [PublishError::DeadlineExceeded].
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[inline]
    /// The number of registered slots, including empty ones.
    pub fn len(&self) -> usize {
        self.publishers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.publishers.is_empty()
    }

    /// Publishes the endpoint set to every registered publisher.
    ///
    /// See [broadcast] for how the results are combined.
    pub async fn broadcast(
        &self,
        cancel: &CancellationToken,
        endpoints: &[String],
    ) -> Result<(), BroadcastError> {
        broadcast(cancel, endpoints, &self.publishers, self.deadline).await
    }
}

#[async_trait]
impl Publisher for Broadcaster {
    fn name(&self) -> &str {
        "broadcaster"
    }

    async fn publish(
        &self,
        cancel: &CancellationToken,
        endpoints: &[String],
    ) -> Result<(), PublishError> {
        self.broadcast(cancel, endpoints)
            .await
            .map_err(|e| PublishError::Broadcast(Box::new(e)))
    }
}

/// Publishes the endpoint set to every publisher concurrently.
///
/// Each publisher runs in its own task and the call only returns once all of
/// them have finished. Every publisher is attempted unless the round is
/// cancelled: when `cancel` has already fired, publishers are skipped without
/// being called and reported as [PublishError::Cancelled]. A publisher which
/// is still running when `cancel` fires, or when the optional `deadline`
/// elapses, is abandoned and reported as failed.
///
/// No failures is a success, a single failure is reported on its own and two
/// or more failures are combined into an [AggregateError]. Failures are always
/// ordered by the position of the publisher, not by when it finished.
///
/// Nothing is rolled back or retried, publishers may have partially applied
/// the endpoint set when they fail.
pub async fn broadcast(
    cancel: &CancellationToken,
    endpoints: &[String],
    publishers: &[PublisherSlot],
    deadline: Option<Duration>,
) -> Result<(), BroadcastError> {
    let endpoints: Arc<[String]> = Arc::from(endpoints);

    debug!(
        num_publishers = publishers.len(),
        num_endpoints = endpoints.len(),
        "Broadcasting endpoints."
    );

    let tasks = publishers.iter().map(|slot| {
        let slot = slot.clone();
        let endpoints = endpoints.clone();
        let cancel = cancel.clone();

        tokio::spawn(async move {
            match slot {
                Some(publisher) => {
                    run_publisher(publisher.as_ref(), &cancel, &endpoints, deadline).await
                },
                None => Ok(()),
            }
        })
    });
    let results = join_all(tasks).await;

    let mut failures = Vec::new();
    for (index, (slot, result)) in publishers.iter().zip(results).enumerate() {
        let error = match result {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => e,
            Err(e) => PublishError::Panicked(e.to_string()),
        };

        let publisher = slot
            .as_ref()
            .map(|publisher| publisher.name().to_string())
            .unwrap_or_default();

        warn!(
            publisher = %publisher,
            index = index,
            error = %error,
            "Publisher failed to publish endpoints."
        );

        failures.push(PublishFailure {
            index,
            publisher,
            error,
        });
    }

    match failures.len() {
        0 => {
            info!(
                num_publishers = publishers.len(),
                num_endpoints = endpoints.len(),
                "Endpoints broadcast to all publishers."
            );
            Ok(())
        },
        1 => Err(BroadcastError::Single(failures.remove(0))),
        _ => Err(BroadcastError::Multiple(AggregateError(failures))),
    }
}

async fn run_publisher(
    publisher: &dyn Publisher,
    cancel: &CancellationToken,
    endpoints: &[String],
    deadline: Option<Duration>,
) -> Result<(), PublishError> {
    let publish = async {
        match deadline {
            Some(deadline) => {
                tokio::time::timeout(deadline, publisher.publish(cancel, endpoints))
                    .await
                    .map_err(|_| PublishError::DeadlineExceeded(deadline))?
            },
            None => publisher.publish(cancel, endpoints).await,
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PublishError::Cancelled),
        res = publish => res,
    }
}
