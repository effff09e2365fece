use ipcast_broadcast::Publisher;
use ipcast_watch::EndpointWatch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
/// What happened while propagating a notifier session.
pub struct PropagationReport {
    /// The number of endpoint sets handed to the publisher.
    pub rounds: u64,
    /// The number of rounds the publisher failed.
    pub failed_rounds: u64,
}

/// Publishes every endpoint set emitted by the watch until the session
/// closes or `cancel` fires.
///
/// A failed round is logged and the next emission is awaited, rounds are
/// never retried.
pub async fn propagate<P>(
    watch: EndpointWatch,
    publisher: &P,
    cancel: &CancellationToken,
) -> PropagationReport
where
    P: Publisher + ?Sized,
{
    let mut report = PropagationReport::default();

    loop {
        let endpoints = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Received a stop signal. Stopping propagation.");
                break;
            },
            endpoints = watch.recv() => match endpoints {
                Some(endpoints) => endpoints,
                None => {
                    debug!("Notifier session closed. Stopping propagation.");
                    break;
                },
            },
        };

        report.rounds += 1;
        match publisher.publish(cancel, &endpoints).await {
            Ok(()) => {
                info!(
                    publisher = publisher.name(),
                    endpoints = %endpoints,
                    "Propagated endpoints."
                );
            },
            Err(e) => {
                report.failed_rounds += 1;
                error!(
                    error = %e,
                    publisher = publisher.name(),
                    endpoints = %endpoints,
                    "Failed to propagate endpoints, waiting for the next change."
                );
            },
        }
    }

    report
}
