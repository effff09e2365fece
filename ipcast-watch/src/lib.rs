//! # ipcast watch
//! Tracks the externally reachable, healthy endpoints of a cluster.
//!
//! A [MemberSource] delivers membership events, the [Notifier] re-resolves the
//! endpoint set on every event and emits it only when it has actually changed.
//!
//! ```rust
//! use ipcast_watch::{
//!     AddressKind,
//!     ConditionKind,
//!     ConditionStatus,
//!     Member,
//!     MemberRegistry,
//!     NotifierBuilder,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = MemberRegistry::new();
//!     registry.sync([Member::new("node1")
//!         .with_condition(ConditionKind::Ready, ConditionStatus::True)
//!         .with_address(AddressKind::ExternalIP, "1.2.3.4")]);
//!
//!     let notifier = NotifierBuilder::new(registry.clone()).build();
//!     let cancel = CancellationToken::new();
//!     let watch = notifier.notify(cancel.clone()).await;
//!
//!     let endpoints = watch.recv().await.expect("Initial endpoints.");
//!     assert_eq!(endpoints.as_slice(), ["1.2.3.4"]);
//!
//!     cancel.cancel();
//!     assert!(watch.recv().await.is_none());
//! }
//! ```

mod error;
mod member;
mod notifier;
mod registry;
mod resolver;
mod selector;
mod source;
mod statistics;

use std::sync::Arc;

pub use error::{ResolveError, SelectorError};
pub use member::{
    Address,
    AddressKind,
    Condition,
    ConditionKind,
    ConditionStatus,
    Member,
    MemberEvent,
};
pub use notifier::{EmissionFilter, EndpointWatch, Notifier, NotifierState};
pub use registry::{MemberMap, MemberRegistry};
pub use resolver::{resolve_endpoints, EndpointResolver, EndpointSet};
pub use selector::Selector;
pub use source::{EventHandler, MemberSource};
pub use statistics::NotifierStatistics;

/// The default number of endpoint sets which can be waiting for the consumer.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 128;
/// The default number of resolution errors which can be waiting for the consumer.
pub const DEFAULT_ERROR_CAPACITY: usize = 16;

/// Build a notifier using provided settings.
pub struct NotifierBuilder<S> {
    source: Arc<S>,
    selector: String,
    channel_capacity: usize,
    error_capacity: usize,
}

impl<S> NotifierBuilder<S>
where
    S: MemberSource,
{
    /// Create a new notifier builder watching the given source.
    pub fn new(source: S) -> Self {
        Self::from_shared(Arc::new(source))
    }

    /// Create a new notifier builder watching an already shared source.
    pub fn from_shared(source: Arc<S>) -> Self {
        Self {
            source,
            selector: String::new(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            error_capacity: DEFAULT_ERROR_CAPACITY,
        }
    }

    /// Set the label selector members must match to contribute endpoints.
    ///
    /// Defaults to an empty selector which matches every member.
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = selector.into();
        self
    }

    /// Set how many emitted endpoint sets may wait for the consumer before the
    /// session waits for it to catch up.
    ///
    /// A capacity of `0` is raised to `1`.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Set how many resolution errors may wait on the error channel before
    /// further errors are dropped.
    pub fn with_error_capacity(mut self, capacity: usize) -> Self {
        self.error_capacity = capacity.max(1);
        self
    }

    /// Creates the notifier.
    pub fn build(self) -> Notifier<S> {
        Notifier {
            resolver: EndpointResolver::new(self.source, self.selector),
            channel_capacity: self.channel_capacity,
            error_capacity: self.error_capacity,
        }
    }
}
