use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::bail;
use ipcast_watch::{EventHandler, Member, MemberRegistry, MemberSource, Selector};
use tokio::sync::watch;

/// A member source whose listing can be made to fail.
///
/// Events and the sync signal come from the wrapped registry.
pub struct FlakySource {
    registry: MemberRegistry,
    available: AtomicBool,
}

impl FlakySource {
    pub fn new(registry: MemberRegistry) -> Self {
        Self {
            registry,
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl MemberSource for FlakySource {
    fn list(&self, selector: &Selector) -> anyhow::Result<Vec<Member>> {
        if !self.available.load(Ordering::SeqCst) {
            bail!("member cache is unavailable");
        }
        self.registry.list(selector)
    }

    fn subscribe(&self, handler: EventHandler) {
        self.registry.subscribe(handler)
    }

    fn synced(&self) -> watch::Receiver<bool> {
        self.registry.synced()
    }
}
