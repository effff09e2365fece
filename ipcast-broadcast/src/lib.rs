//! # ipcast broadcast
//! Propagates an endpoint set to a set of downstream publishers.
//!
//! The [Broadcaster] runs every registered [Publisher] concurrently and
//! combines their failures, the [DnsPublisher] keeps the `A` records of a name
//! in line with the endpoints and the [ChatPublisher] posts a notification
//! about the change.
//!
//! ```rust
//! use async_trait::async_trait;
//! use ipcast_broadcast::{Broadcaster, ChatClient, ChatMessage, ChatPublisher};
//! use tokio_util::sync::CancellationToken;
//!
//! struct Stdout;
//!
//! #[async_trait]
//! impl ChatClient for Stdout {
//!     async fn post_message(&self, message: &ChatMessage) -> anyhow::Result<()> {
//!         println!("{}: {}", message.channel, message.text);
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let broadcaster = Broadcaster::new()
//!         .with_publisher(ChatPublisher::new(Stdout, "#ops", "www.example.com"));
//!
//!     let cancel = CancellationToken::new();
//!     broadcaster
//!         .broadcast(&cancel, &["1.2.3.4".to_string()])
//!         .await
//!         .expect("Broadcast endpoints.");
//! }
//! ```

mod broadcaster;
mod chat;
mod dns;
mod error;
mod publisher;

pub use broadcaster::{broadcast, Broadcaster, PublisherSlot};
pub use chat::{render_message, ChatClient, ChatMessage, ChatPublisher, RenderContext};
pub use dns::{
    partition_records,
    DnsProvider,
    DnsPublisher,
    DnsRecord,
    ReconcileSummary,
    RecordData,
    RecordPartition,
    A_RECORD,
};
pub use error::{
    AggregateError,
    BroadcastError,
    ChatError,
    DnsError,
    PublishError,
    PublishFailure,
    ERROR_DELIMITER,
};
pub use publisher::Publisher;
