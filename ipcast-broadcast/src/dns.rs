use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{DnsError, PublishError};
use crate::publisher::Publisher;

pub static A_RECORD: &str = "A";

#[derive(Debug, Clone, PartialEq, Eq)]
/// The contents of a DNS record.
pub struct RecordData {
    pub record_type: String,
    pub name: String,
    pub content: String,
}

impl RecordData {
    /// An `A` record pointing `name` at `address`.
    pub fn a_record(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            record_type: A_RECORD.to_string(),
            name: name.into(),
            content: address.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A DNS record as stored by the provider.
pub struct DnsRecord {
    pub id: String,
    pub data: RecordData,
}

impl DnsRecord {
    #[inline]
    /// The address the record points at.
    pub fn content(&self) -> &str {
        &self.data.content
    }
}

#[async_trait]
/// The API of a DNS provider hosting the zone for the published name.
pub trait DnsProvider: Send + Sync + 'static {
    /// Finds the id of the zone which manages `dns_name`.
    async fn zone_id(&self, dns_name: &str) -> anyhow::Result<String>;

    /// Lists every `A` record of `dns_name` within the zone.
    async fn a_records(&self, zone_id: &str, dns_name: &str) -> anyhow::Result<Vec<DnsRecord>>;

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> anyhow::Result<()>;

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        data: &RecordData,
    ) -> anyhow::Result<()>;

    async fn create_record(&self, zone_id: &str, data: &RecordData) -> anyhow::Result<DnsRecord>;
}

#[derive(Debug, Default, PartialEq, Eq)]
/// The existing records of a name split relative to the desired endpoints.
pub struct RecordPartition {
    /// Records whose address is no longer desired.
    pub obsolete: Vec<DnsRecord>,
    /// Records whose address is still desired.
    pub matching: Vec<DnsRecord>,
    /// Desired addresses without any record.
    pub missing: Vec<String>,
}

/// Splits the existing records into obsolete, matching and missing groups.
///
/// Every record lands in exactly one of `obsolete` and `matching`, every
/// desired address is either covered by a matching record or listed once in
/// `missing`.
pub fn partition_records(endpoints: &[String], records: Vec<DnsRecord>) -> RecordPartition {
    let desired = endpoints.iter().map(String::as_str).collect::<BTreeSet<_>>();
    let mut covered = BTreeSet::new();
    let mut partition = RecordPartition::default();

    for record in records {
        if desired.contains(record.content()) {
            covered.insert(record.content().to_string());
            partition.matching.push(record);
        } else {
            partition.obsolete.push(record);
        }
    }

    partition.missing = desired
        .into_iter()
        .filter(|addr| !covered.contains(*addr))
        .map(ToString::to_string)
        .collect();

    partition
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
/// The changes applied by a successful reconciliation.
pub struct ReconcileSummary {
    pub deleted: usize,
    pub updated: usize,
    pub created: usize,
}

/// Keeps the `A` records of a DNS name in line with the endpoint set.
pub struct DnsPublisher<P> {
    provider: Arc<P>,
    dns_name: String,
}

impl<P: DnsProvider> DnsPublisher<P> {
    /// Creates a new publisher managing the `A` records of `dns_name`.
    pub fn new(provider: P, dns_name: impl Into<String>) -> Self {
        Self::from_shared(Arc::new(provider), dns_name)
    }

    /// Creates a new publisher using an already shared provider.
    pub fn from_shared(provider: Arc<P>, dns_name: impl Into<String>) -> Self {
        Self {
            provider,
            dns_name: dns_name.into(),
        }
    }

    #[inline]
    pub fn dns_name(&self) -> &str {
        &self.dns_name
    }

    /// Reconciles the `A` records of the name with the endpoints.
    ///
    /// Obsolete records are deleted first, then every matching record is
    /// re-submitted unchanged and finally the missing records are created.
    /// The first failing call aborts the reconciliation, changes which were
    /// already applied are kept.
    pub async fn reconcile(&self, endpoints: &[String]) -> Result<ReconcileSummary, DnsError> {
        let name = self.dns_name.as_str();

        let zone_id = self.provider.zone_id(name).await.map_err(|error| {
            DnsError::ZoneResolution {
                name: name.to_string(),
                error,
            }
        })?;

        let records = self
            .provider
            .a_records(&zone_id, name)
            .await
            .map_err(|error| DnsError::Fetch {
                zone_id: zone_id.clone(),
                name: name.to_string(),
                error,
            })?;

        let partition = partition_records(endpoints, records);
        debug!(
            dns_name = name,
            zone_id = %zone_id,
            num_obsolete = partition.obsolete.len(),
            num_matching = partition.matching.len(),
            num_missing = partition.missing.len(),
            "Reconciling DNS records."
        );

        let mut summary = ReconcileSummary::default();

        for record in &partition.obsolete {
            self.provider
                .delete_record(&zone_id, &record.id)
                .await
                .map_err(|error| DnsError::Delete {
                    zone_id: zone_id.clone(),
                    name: name.to_string(),
                    record_id: record.id.clone(),
                    error,
                })?;
            summary.deleted += 1;
        }

        // Matching records are always re-submitted so the provider refreshes
        // every other attribute of the record.
        for record in &partition.matching {
            let data = RecordData::a_record(name, record.content());
            self.provider
                .update_record(&zone_id, &record.id, &data)
                .await
                .map_err(|error| DnsError::Update {
                    zone_id: zone_id.clone(),
                    name: name.to_string(),
                    record_id: record.id.clone(),
                    error,
                })?;
            summary.updated += 1;
        }

        for address in &partition.missing {
            let data = RecordData::a_record(name, address.as_str());
            self.provider
                .create_record(&zone_id, &data)
                .await
                .map_err(|error| DnsError::Create {
                    zone_id: zone_id.clone(),
                    address: address.clone(),
                    error,
                })?;
            summary.created += 1;
        }

        info!(
            dns_name = name,
            zone_id = %zone_id,
            deleted = summary.deleted,
            updated = summary.updated,
            created = summary.created,
            "DNS records reconciled."
        );

        Ok(summary)
    }
}

#[async_trait]
impl<P: DnsProvider> Publisher for DnsPublisher<P> {
    fn name(&self) -> &str {
        "dns"
    }

    async fn publish(
        &self,
        cancel: &CancellationToken,
        endpoints: &[String],
    ) -> Result<(), PublishError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PublishError::Cancelled),
            res = self.reconcile(endpoints) => {
                res.map(|_| ()).map_err(PublishError::from)
            },
        }
    }
}
