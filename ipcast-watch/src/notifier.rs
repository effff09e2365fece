use std::fmt::{self, Display};

use flume::r#async::RecvStream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::ResolveError;
use crate::resolver::{EndpointResolver, EndpointSet};
use crate::source::MemberSource;
use crate::statistics::{NotifierStatistics, NotifierStatisticsInner};
use crate::MemberEvent;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// The lifecycle of a single notifier session.
pub enum NotifierState {
    /// The session has been created but not subscribed yet.
    Unstarted,
    /// Subscribed to the source, waiting for its initial sync.
    Syncing,
    /// The initial state has been resolved, events are being processed.
    Active,
    /// The session has stopped and its output stream is closed.
    Closed,
}

impl Display for NotifierState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NotifierState::Unstarted => "unstarted",
            NotifierState::Syncing => "syncing",
            NotifierState::Active => "active",
            NotifierState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Default)]
/// Decides which resolved endpoint sets are worth emitting.
///
/// The very first set is always emitted, after that a set is only emitted if
/// it differs from the last emitted one.
pub struct EmissionFilter {
    last_emitted: Option<EndpointSet>,
}

impl EmissionFilter {
    /// Returns the set back if it should be emitted, recording it as the last emission.
    pub fn admit(&mut self, endpoints: EndpointSet) -> Option<EndpointSet> {
        if self.last_emitted.as_ref() == Some(&endpoints) {
            return None;
        }

        self.last_emitted = Some(endpoints.clone());
        Some(endpoints)
    }

    #[inline]
    pub fn has_emitted(&self) -> bool {
        self.last_emitted.is_some()
    }

    #[inline]
    pub fn last_emitted(&self) -> Option<&EndpointSet> {
        self.last_emitted.as_ref()
    }
}

/// Watches a member source and emits the endpoint set whenever it changes.
///
/// Build one with [crate::NotifierBuilder].
pub struct Notifier<S> {
    pub(crate) resolver: EndpointResolver<S>,
    pub(crate) channel_capacity: usize,
    pub(crate) error_capacity: usize,
}

impl<S: MemberSource> Notifier<S> {
    /// Starts a new notifier session.
    ///
    /// This subscribes to the member source and waits until the source has
    /// completed its initial sync, or until `cancel` fires, before returning.
    /// Once synced the current endpoint set is always emitted first, even if
    /// the cluster never changes afterwards.
    ///
    /// Every call creates a fresh session with its own emission history. The
    /// session stops and closes its stream once `cancel` fires.
    pub async fn notify(&self, cancel: CancellationToken) -> EndpointWatch {
        let statistics = NotifierStatistics::default();
        let (state_tx, mut state_rx) = watch::channel(NotifierState::Unstarted);
        let (events_tx, events_rx) = flume::unbounded();
        let (endpoints_tx, endpoints_rx) = flume::bounded(self.channel_capacity);
        let (errors_tx, errors_rx) = flume::bounded(self.error_capacity);

        let source = self.resolver.source();
        source.subscribe(events_tx);
        let synced = source.synced();
        state_tx.send_replace(NotifierState::Syncing);

        debug!(selector = %self.resolver.selector(), "Notifier session subscribed.");

        let session = Session {
            resolver: self.resolver.clone(),
            filter: EmissionFilter::default(),
            statistics: statistics.clone(),
            endpoints: endpoints_tx,
            errors: errors_tx,
            state: state_tx,
        };
        tokio::spawn(run_session(session, synced, events_rx, cancel));

        // The session always moves past `Syncing`, either when synced or when
        // cancelled, so this only fails if the task itself has gone away.
        let _ = state_rx
            .wait_for(|state| *state != NotifierState::Syncing)
            .await;

        EndpointWatch {
            endpoints: endpoints_rx,
            errors: errors_rx,
            state: state_rx,
            statistics,
        }
    }
}

/// The consuming side of a notifier session.
pub struct EndpointWatch {
    endpoints: flume::Receiver<EndpointSet>,
    errors: flume::Receiver<ResolveError>,
    state: watch::Receiver<NotifierState>,
    statistics: NotifierStatistics,
}

impl EndpointWatch {
    /// Waits for the next emitted endpoint set.
    ///
    /// Returns `None` once the session has closed and every emission has been
    /// consumed.
    pub async fn recv(&self) -> Option<EndpointSet> {
        self.endpoints.recv_async().await.ok()
    }

    /// Returns the next emitted endpoint set if one is already waiting.
    pub fn try_recv(&self) -> Option<EndpointSet> {
        self.endpoints.try_recv().ok()
    }

    /// Converts the watch into a stream of emitted endpoint sets.
    pub fn into_stream(self) -> RecvStream<'static, EndpointSet> {
        self.endpoints.into_stream()
    }

    /// The resolution errors reported by the session.
    ///
    /// Errors are reported on a best effort basis, they are dropped when the
    /// receiver falls behind rather than stalling the session.
    pub fn errors(&self) -> flume::Receiver<ResolveError> {
        self.errors.clone()
    }

    #[inline]
    /// The current state of the session.
    pub fn state(&self) -> NotifierState {
        *self.state.borrow()
    }

    /// A stream of the session's state transitions.
    pub fn state_changes(&self) -> WatchStream<NotifierState> {
        WatchStream::new(self.state.clone())
    }

    /// Waits until the session has fully closed.
    pub async fn closed(&self) {
        let mut state = self.state.clone();
        let _ = state.wait_for(|state| *state == NotifierState::Closed).await;
    }

    #[inline]
    /// Gets the live session statistics.
    pub fn statistics(&self) -> NotifierStatistics {
        self.statistics.clone()
    }
}

struct Session<S> {
    resolver: EndpointResolver<S>,
    filter: EmissionFilter,
    statistics: NotifierStatistics,
    endpoints: flume::Sender<EndpointSet>,
    errors: flume::Sender<ResolveError>,
    state: watch::Sender<NotifierState>,
}

impl<S: MemberSource> Session<S> {
    /// Resolves the endpoint set and emits it if it passes the filter.
    ///
    /// Returns `false` if the session should stop.
    async fn refresh(
        &mut self,
        cause: &(dyn Display + Sync),
        cancel: &CancellationToken,
    ) -> bool {
        NotifierStatisticsInner::incr(&self.statistics.num_resolutions);

        let endpoints = match self.resolver.resolve() {
            Ok(endpoints) => endpoints,
            Err(e) => {
                NotifierStatisticsInner::incr(&self.statistics.num_resolution_failures);
                error!(error = ?e, cause = %cause, "Failed to resolve endpoints, ignoring event.");
                let _ = self.errors.try_send(e);
                return true;
            },
        };

        let endpoints = match self.filter.admit(endpoints) {
            Some(endpoints) => endpoints,
            None => {
                NotifierStatisticsInner::incr(&self.statistics.num_suppressed);
                debug!(cause = %cause, "Endpoints unchanged, skipping emission.");
                return true;
            },
        };

        info!(
            cause = %cause,
            num_endpoints = endpoints.len(),
            endpoints = %endpoints,
            "Endpoints have changed."
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            res = self.endpoints.send_async(endpoints) => {
                if res.is_err() {
                    debug!("Endpoint consumer has gone away. Stopping.");
                    return false;
                }
                NotifierStatisticsInner::incr(&self.statistics.num_emissions);
                true
            },
        }
    }
}

/// Runs a notifier session until it is cancelled.
///
/// The session first waits for the source to sync and resolves the initial
/// state, then re-resolves once per membership event.
async fn run_session<S: MemberSource>(
    mut session: Session<S>,
    mut synced: watch::Receiver<bool>,
    events: flume::Receiver<MemberEvent>,
    cancel: CancellationToken,
) {
    let is_synced = tokio::select! {
        _ = cancel.cancelled() => false,
        res = synced.wait_for(|synced| *synced) => {
            if res.is_err() {
                warn!("Member source closed before completing its initial sync.");
            }
            res.is_ok()
        },
    };

    if is_synced {
        session.state.send_replace(NotifierState::Active);
        info!("Member source synced, notifier is active.");

        if session.refresh(&"initial-sync", &cancel).await {
            watch_member_events(&mut session, events, &cancel).await;
        }
    }

    session.state.send_replace(NotifierState::Closed);
    info!(
        num_events = session.statistics.num_events(),
        num_emissions = session.statistics.num_emissions(),
        "Notifier session closed."
    );
    // Dropping the session closes the endpoint and error channels.
}

async fn watch_member_events<S: MemberSource>(
    session: &mut Session<S>,
    events: flume::Receiver<MemberEvent>,
    cancel: &CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Received a stop signal. Stopping.");
                break;
            },
            event = events.recv_async() => event,
        };

        let event = match event {
            Ok(event) => event,
            Err(_) => {
                warn!("Member source dropped the subscription. Stopping.");
                break;
            },
        };

        NotifierStatisticsInner::incr(&session.statistics.num_events);
        debug!(event = %event, "Received membership event.");

        if !session.refresh(&event, cancel).await {
            break;
        }
    }
}
