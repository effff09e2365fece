use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type Counter = AtomicU64;

#[derive(Debug, Clone, Default)]
/// Live metrics around a notifier session.
pub struct NotifierStatistics(Arc<NotifierStatisticsInner>);

impl Deref for NotifierStatistics {
    type Target = NotifierStatisticsInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Default)]
pub struct NotifierStatisticsInner {
    /// The number of membership events the session has received.
    pub(crate) num_events: Counter,
    /// The number of times the endpoint set has been resolved.
    pub(crate) num_resolutions: Counter,
    /// The number of endpoint sets emitted to the consumer.
    pub(crate) num_emissions: Counter,
    /// The number of resolutions dropped as they matched the last emission.
    pub(crate) num_suppressed: Counter,
    /// The number of resolutions which failed.
    pub(crate) num_resolution_failures: Counter,
}

impl NotifierStatisticsInner {
    /// The number of membership events the session has received.
    pub fn num_events(&self) -> u64 {
        self.num_events.load(Ordering::Relaxed)
    }

    /// The number of times the endpoint set has been resolved.
    pub fn num_resolutions(&self) -> u64 {
        self.num_resolutions.load(Ordering::Relaxed)
    }

    /// The number of endpoint sets emitted to the consumer.
    pub fn num_emissions(&self) -> u64 {
        self.num_emissions.load(Ordering::Relaxed)
    }

    /// The number of resolutions dropped as they matched the last emission.
    pub fn num_suppressed(&self) -> u64 {
        self.num_suppressed.load(Ordering::Relaxed)
    }

    /// The number of resolutions which failed.
    pub fn num_resolution_failures(&self) -> u64 {
        self.num_resolution_failures.load(Ordering::Relaxed)
    }

    pub(crate) fn incr(counter: &Counter) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}
