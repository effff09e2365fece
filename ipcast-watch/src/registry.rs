use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::source::{EventHandler, MemberSource};
use crate::{Member, MemberEvent, Selector};

pub type MemberMap = BTreeMap<String, Member>;

#[derive(Clone)]
/// An in-memory cache of cluster members which behaves like an informer.
///
/// Changes applied to the registry are delivered, in order, to every
/// subscribed handler. New subscribers first receive an `Added` event for each
/// member already in the cache.
///
/// This handle is cheap to clone.
pub struct MemberRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    state: Mutex<RegistryState>,
    synced: watch::Sender<bool>,
}

#[derive(Default)]
struct RegistryState {
    members: MemberMap,
    handlers: Vec<EventHandler>,
}

impl RegistryState {
    /// Delivers the event to every live handler, dropping the closed ones.
    fn dispatch(&mut self, event: MemberEvent) {
        trace!(event = %event, num_handlers = self.handlers.len(), "Dispatching member event.");
        self.handlers
            .retain(|handler| handler.send(event.clone()).is_ok());
    }
}

impl Default for MemberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MemberRegistry {
    /// Creates a new, empty and not yet synced registry.
    pub fn new() -> Self {
        let (synced, _) = watch::channel(false);
        Self {
            inner: Arc::new(RegistryInner {
                state: Mutex::new(RegistryState::default()),
                synced,
            }),
        }
    }

    /// Inserts or replaces a member, emitting an `Added` or `Updated` event.
    pub fn upsert(&self, member: Member) {
        let mut state = self.inner.state.lock();
        let event = match state.members.insert(member.name.clone(), member.clone()) {
            Some(old) => MemberEvent::Updated { old, new: member },
            None => MemberEvent::Added(member),
        };
        state.dispatch(event);
    }

    /// Removes a member, emitting a `Deleted` event if it was known.
    pub fn remove(&self, name: &str) -> Option<Member> {
        let mut state = self.inner.state.lock();
        let removed = state.members.remove(name)?;
        state.dispatch(MemberEvent::Deleted(removed.clone()));
        Some(removed)
    }

    /// Replaces the whole cache with a full listing and marks the registry as synced.
    ///
    /// The difference between the old and the new listing is delivered as
    /// individual delete, update and add events.
    pub fn sync(&self, members: impl IntoIterator<Item = Member>) {
        let mut listing = members
            .into_iter()
            .map(|member| (member.name.clone(), member))
            .collect::<MemberMap>();

        {
            let mut state = self.inner.state.lock();
            let previous = std::mem::take(&mut state.members);

            for (name, old) in previous {
                match listing.remove(&name) {
                    Some(new) => {
                        state.members.insert(name, new.clone());
                        state.dispatch(MemberEvent::Updated { old, new });
                    },
                    None => state.dispatch(MemberEvent::Deleted(old)),
                }
            }

            for (name, member) in listing {
                state.members.insert(name, member.clone());
                state.dispatch(MemberEvent::Added(member));
            }

            info!(num_members = state.members.len(), "Member registry synced.");
        }

        self.mark_synced();
    }

    /// Marks the initial sync of the registry as complete.
    pub fn mark_synced(&self) {
        self.inner.synced.send_replace(true);
    }

    #[inline]
    /// Returns if the registry has completed its initial sync.
    pub fn is_synced(&self) -> bool {
        *self.inner.synced.borrow()
    }

    /// Re-delivers an `Updated` event, with identical old and new snapshots,
    /// for every cached member.
    pub fn resync(&self) {
        let mut state = self.inner.state.lock();
        let members = state.members.values().cloned().collect::<Vec<_>>();

        debug!(num_members = members.len(), "Resyncing member registry.");
        for member in members {
            state.dispatch(MemberEvent::Updated {
                old: member.clone(),
                new: member,
            });
        }
    }

    /// Spawns a task which calls [MemberRegistry::resync] every `period`
    /// until the token is cancelled.
    pub fn spawn_resync(
        &self,
        period: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut interval = interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            // The first tick completes immediately.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => registry.resync(),
                }
            }

            debug!("Received a stop signal. Stopping resync.");
        })
    }

    /// Returns a member by name.
    pub fn get(&self, name: &str) -> Option<Member> {
        self.inner.state.lock().members.get(name).cloned()
    }

    /// Returns a copy of every cached member.
    pub fn members(&self) -> MemberMap {
        self.inner.state.lock().members.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of handlers which are still subscribed.
    pub fn num_subscribers(&self) -> usize {
        let mut state = self.inner.state.lock();
        state.handlers.retain(|handler| !handler.is_disconnected());
        state.handlers.len()
    }
}

impl MemberSource for MemberRegistry {
    fn list(&self, selector: &Selector) -> anyhow::Result<Vec<Member>> {
        let state = self.inner.state.lock();
        Ok(state
            .members
            .values()
            .filter(|member| selector.matches(member))
            .cloned()
            .collect())
    }

    fn subscribe(&self, handler: EventHandler) {
        let mut state = self.inner.state.lock();

        for member in state.members.values() {
            if handler.send(MemberEvent::Added(member.clone())).is_err() {
                return;
            }
        }

        state.handlers.push(handler);
    }

    fn synced(&self) -> watch::Receiver<bool> {
        self.inner.synced.subscribe()
    }
}
