//! Shared fixtures for the ipcast test suites.

mod chat;
mod dns;
mod members;
mod publisher;
mod source;

pub use chat::RecordingChatClient;
pub use dns::{DnsCall, FailOn, MemoryDnsProvider};
pub use members::{
    endpoints,
    healthy,
    ips,
    next_endpoints,
    settled,
    unhealthy,
    RECV_TIMEOUT,
};
pub use publisher::{Script, ScriptedPublisher};
pub use source::FlakySource;
