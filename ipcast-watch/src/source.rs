use std::sync::Arc;

use tokio::sync::watch;

use crate::{Member, MemberEvent, Selector};

/// The sending half of a subscription, the member source pushes every
/// add, update and delete event into it.
///
/// Sends must never block the source, handlers are therefore unbounded and
/// a handler whose receiver has been dropped can be discarded by the source.
pub type EventHandler = flume::Sender<MemberEvent>;

/// The cluster membership data source.
///
/// This mirrors an informer: a local cache of members which can be listed at
/// any point, a subscription which delivers every change to the cache and a
/// signal which flips once the cache has completed its initial full sync.
///
/// Sources are expected to deliver events to a single handler in the order the
/// changes were applied to the cache.
pub trait MemberSource: Send + Sync + 'static {
    /// Lists the members currently known to the source which match the selector.
    fn list(&self, selector: &Selector) -> anyhow::Result<Vec<Member>>;

    /// Registers a handler which receives every subsequent membership event.
    fn subscribe(&self, handler: EventHandler);

    /// A watcher which becomes `true` once the initial sync has completed.
    fn synced(&self) -> watch::Receiver<bool>;
}

impl<S: MemberSource> MemberSource for Arc<S> {
    fn list(&self, selector: &Selector) -> anyhow::Result<Vec<Member>> {
        self.as_ref().list(selector)
    }

    fn subscribe(&self, handler: EventHandler) {
        self.as_ref().subscribe(handler)
    }

    fn synced(&self) -> watch::Receiver<bool> {
        self.as_ref().synced()
    }
}
