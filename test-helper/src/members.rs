use std::time::Duration;

use anyhow::anyhow;
use ipcast_watch::{
    AddressKind,
    ConditionKind,
    ConditionStatus,
    EndpointSet,
    EndpointWatch,
    Member,
};

/// How long a test waits for an emission before giving up.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// A ready member exposing the given external addresses.
pub fn healthy(name: &str, addrs: &[&str]) -> Member {
    addrs.iter().fold(
        Member::new(name)
            .with_condition(ConditionKind::Ready, ConditionStatus::True)
            .with_address(AddressKind::InternalIP, "10.0.0.1")
            .with_address(AddressKind::Hostname, name),
        |member, addr| member.with_address(AddressKind::ExternalIP, *addr),
    )
}

/// A member under memory pressure which is not ready.
pub fn unhealthy(name: &str, addrs: &[&str]) -> Member {
    addrs.iter().fold(
        Member::new(name)
            .with_condition(ConditionKind::Ready, ConditionStatus::False)
            .with_condition(ConditionKind::MemoryPressure, ConditionStatus::True),
        |member, addr| member.with_address(AddressKind::ExternalIP, *addr),
    )
}

pub fn endpoints(addrs: &[&str]) -> EndpointSet {
    addrs.iter().copied().collect()
}

pub fn ips(addrs: &[&str]) -> Vec<String> {
    addrs.iter().map(|addr| addr.to_string()).collect()
}

/// Waits until the session has received `num_events` events and handled
/// every one of them, along with the initial resolution.
pub async fn settled(watch: &EndpointWatch, num_events: u64) -> anyhow::Result<()> {
    let stats = watch.statistics();
    let wait = async {
        loop {
            let handled = stats.num_emissions()
                + stats.num_suppressed()
                + stats.num_resolution_failures();
            if stats.num_events() >= num_events && handled == stats.num_events() + 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };

    tokio::time::timeout(RECV_TIMEOUT, wait)
        .await
        .map_err(|_| anyhow!("Timed out waiting for the session to settle."))
}

/// Waits for the next emission of the watch.
pub async fn next_endpoints(watch: &EndpointWatch) -> anyhow::Result<EndpointSet> {
    tokio::time::timeout(RECV_TIMEOUT, watch.recv())
        .await
        .map_err(|_| anyhow!("Timed out waiting for endpoints."))?
        .ok_or_else(|| anyhow!("Endpoint stream closed."))
}
