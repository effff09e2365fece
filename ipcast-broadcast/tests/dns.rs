use std::sync::Arc;

use ipcast_broadcast::{DnsError, DnsPublisher, PublishError, Publisher, ReconcileSummary};
use test_helper::{ips, DnsCall, FailOn, MemoryDnsProvider};
use tokio_util::sync::CancellationToken;

static DNS_NAME: &str = "www.example.com";

fn seeded_zone() -> MemoryDnsProvider {
    MemoryDnsProvider::new("example.com", "zone-1")
        .with_a_record("r1", DNS_NAME, "1.2.3.4")
        .with_a_record("r2", DNS_NAME, "9.9.9.9")
        .with_a_record("r3", "api.example.com", "1.2.3.4")
        .with_record("r4", "AAAA", DNS_NAME, "::1")
}

#[tokio::test]
async fn test_reconcile_applies_changes_in_order() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let provider = Arc::new(seeded_zone());
    let publisher = DnsPublisher::from_shared(provider.clone(), DNS_NAME);

    let summary = publisher.reconcile(&ips(&["1.2.3.4", "1.2.3.5"])).await?;
    assert_eq!(
        summary,
        ReconcileSummary {
            deleted: 1,
            updated: 1,
            created: 1,
        }
    );
    assert_eq!(
        provider.calls(),
        vec![
            DnsCall::ZoneId(DNS_NAME.to_string()),
            DnsCall::List(DNS_NAME.to_string()),
            DnsCall::Delete("r2".to_string()),
            DnsCall::Update {
                record_id: "r1".to_string(),
                content: "1.2.3.4".to_string(),
            },
            DnsCall::Create("1.2.3.5".to_string()),
        ]
    );
    assert_eq!(provider.addresses(DNS_NAME), ips(&["1.2.3.4", "1.2.3.5"]));

    // Records of other names and types are left alone.
    assert_eq!(provider.addresses("api.example.com"), ips(&["1.2.3.4"]));
    assert!(provider.records().iter().any(|record| record.id == "r4"));

    Ok(())
}

#[tokio::test]
async fn test_reconcile_is_repeatable() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let provider = Arc::new(seeded_zone());
    let publisher = DnsPublisher::from_shared(provider.clone(), DNS_NAME);

    publisher.reconcile(&ips(&["1.2.3.4", "1.2.3.5"])).await?;
    let summary = publisher.reconcile(&ips(&["1.2.3.4", "1.2.3.5"])).await?;

    // Matching records are re-submitted even when nothing changed.
    assert_eq!(
        summary,
        ReconcileSummary {
            deleted: 0,
            updated: 2,
            created: 0,
        }
    );

    Ok(())
}

#[tokio::test]
async fn test_empty_endpoints_delete_everything() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let provider = Arc::new(seeded_zone());
    let publisher = DnsPublisher::from_shared(provider.clone(), DNS_NAME);

    let summary = publisher.reconcile(&[]).await?;
    assert_eq!(summary.deleted, 2);
    assert!(provider.addresses(DNS_NAME).is_empty());

    Ok(())
}

#[tokio::test]
async fn test_empty_zone_and_endpoints_is_noop() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let provider = Arc::new(MemoryDnsProvider::new("example.com", "zone-1"));
    let publisher = DnsPublisher::from_shared(provider.clone(), DNS_NAME);

    let summary = publisher.reconcile(&[]).await?;
    assert_eq!(summary, ReconcileSummary::default());
    assert_eq!(provider.calls().len(), 2, "Only the zone lookup and listing.");

    Ok(())
}

#[tokio::test]
async fn test_unknown_zone() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let provider = Arc::new(MemoryDnsProvider::new("example.org", "zone-1"));
    let publisher = DnsPublisher::from_shared(provider.clone(), DNS_NAME);

    let err = publisher
        .reconcile(&ips(&["1.2.3.4"]))
        .await
        .expect_err("Zone lookup should fail.");
    assert!(
        matches!(&err, DnsError::ZoneResolution { name, .. } if name == DNS_NAME),
        "{err}"
    );
    assert_eq!(provider.calls().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_fetch_failure() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let provider = Arc::new(seeded_zone().fail_on(FailOn::Fetch));
    let publisher = DnsPublisher::from_shared(provider.clone(), DNS_NAME);

    let err = publisher
        .reconcile(&ips(&["1.2.3.4"]))
        .await
        .expect_err("Listing should fail.");
    assert!(
        matches!(&err, DnsError::Fetch { zone_id, .. } if zone_id == "zone-1"),
        "{err}"
    );

    Ok(())
}

#[tokio::test]
async fn test_delete_failure_aborts() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let provider = Arc::new(
        seeded_zone()
            .with_a_record("r5", DNS_NAME, "8.8.8.8")
            .fail_on(FailOn::Delete("r2".to_string())),
    );
    let publisher = DnsPublisher::from_shared(provider.clone(), DNS_NAME);

    let err = publisher
        .reconcile(&ips(&["1.2.3.4", "1.2.3.5"]))
        .await
        .expect_err("Delete should fail.");
    assert!(
        matches!(
            &err,
            DnsError::Delete { record_id, name, .. } if record_id == "r2" && name == DNS_NAME
        ),
        "{err}"
    );
    assert!(err.to_string().contains("id:r2"), "{err}");
    assert!(err.to_string().contains("dns:www.example.com"), "{err}");

    // Nothing after the failed delete was attempted.
    let calls = provider.calls();
    assert_eq!(calls.last(), Some(&DnsCall::Delete("r2".to_string())));
    assert_eq!(
        provider.addresses(DNS_NAME),
        ips(&["1.2.3.4", "8.8.8.8", "9.9.9.9"])
    );

    Ok(())
}

#[tokio::test]
async fn test_update_failure_keeps_deletes() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let provider = Arc::new(seeded_zone().fail_on(FailOn::Update("r1".to_string())));
    let publisher = DnsPublisher::from_shared(provider.clone(), DNS_NAME);

    let err = publisher
        .reconcile(&ips(&["1.2.3.4", "1.2.3.5"]))
        .await
        .expect_err("Update should fail.");
    assert!(
        matches!(
            &err,
            DnsError::Update { record_id, name, .. } if record_id == "r1" && name == DNS_NAME
        ),
        "{err}"
    );
    assert!(err.to_string().contains("dns:www.example.com"), "{err}");

    // The obsolete record was already removed and is not restored.
    assert_eq!(provider.addresses(DNS_NAME), ips(&["1.2.3.4"]));

    Ok(())
}

#[tokio::test]
async fn test_create_failure_through_publisher() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let provider = seeded_zone().fail_on(FailOn::Create("1.2.3.5".to_string()));
    let publisher = DnsPublisher::new(provider, DNS_NAME);

    let cancel = CancellationToken::new();
    let err = publisher
        .publish(&cancel, &ips(&["1.2.3.4", "1.2.3.5"]))
        .await
        .expect_err("Create should fail.");
    assert!(
        matches!(&err, PublishError::Dns(DnsError::Create { address, .. }) if address == "1.2.3.5"),
        "{err}"
    );

    Ok(())
}

#[tokio::test]
async fn test_cancelled_publish() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();

    let provider = Arc::new(seeded_zone());
    let publisher = DnsPublisher::from_shared(provider.clone(), DNS_NAME);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = publisher
        .publish(&cancel, &ips(&["1.2.3.4"]))
        .await
        .expect_err("Publish should be cancelled.");
    assert!(matches!(err, PublishError::Cancelled));
    assert!(provider.calls().is_empty());

    Ok(())
}
