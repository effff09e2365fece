use std::collections::BTreeMap;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use ipcast_broadcast::{DnsProvider, DnsRecord, RecordData, A_RECORD};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A call made against the [MemoryDnsProvider].
pub enum DnsCall {
    ZoneId(String),
    List(String),
    Delete(String),
    Update { record_id: String, content: String },
    Create(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A call which the [MemoryDnsProvider] should reject.
pub enum FailOn {
    Zone,
    Fetch,
    /// Deleting the record with the given id.
    Delete(String),
    /// Updating the record with the given id.
    Update(String),
    /// Creating a record for the given address.
    Create(String),
}

#[derive(Default)]
struct ZoneState {
    records: BTreeMap<String, DnsRecord>,
    next_id: usize,
    calls: Vec<DnsCall>,
    failures: Vec<FailOn>,
}

/// A single zone kept in memory.
pub struct MemoryDnsProvider {
    zone_name: String,
    zone_id: String,
    state: Mutex<ZoneState>,
}

impl MemoryDnsProvider {
    pub fn new(zone_name: &str, zone_id: &str) -> Self {
        Self {
            zone_name: zone_name.to_string(),
            zone_id: zone_id.to_string(),
            state: Mutex::default(),
        }
    }

    /// Seeds the zone with a record.
    pub fn with_record(self, id: &str, record_type: &str, name: &str, content: &str) -> Self {
        let record = DnsRecord {
            id: id.to_string(),
            data: RecordData {
                record_type: record_type.to_string(),
                name: name.to_string(),
                content: content.to_string(),
            },
        };
        self.state.lock().records.insert(record.id.clone(), record);
        self
    }

    /// Seeds the zone with an `A` record.
    pub fn with_a_record(self, id: &str, name: &str, content: &str) -> Self {
        self.with_record(id, A_RECORD, name, content)
    }

    pub fn fail_on(self, failure: FailOn) -> Self {
        self.state.lock().failures.push(failure);
        self
    }

    /// Every record in the zone, ordered by id.
    pub fn records(&self) -> Vec<DnsRecord> {
        self.state.lock().records.values().cloned().collect()
    }

    /// The sorted addresses of the `A` records of `name`.
    pub fn addresses(&self, name: &str) -> Vec<String> {
        let mut addrs = self
            .state
            .lock()
            .records
            .values()
            .filter(|record| record.data.record_type == A_RECORD && record.data.name == name)
            .map(|record| record.content().to_string())
            .collect::<Vec<_>>();
        addrs.sort();
        addrs
    }

    pub fn calls(&self) -> Vec<DnsCall> {
        self.state.lock().calls.clone()
    }

    fn check_zone(&self, zone_id: &str) -> anyhow::Result<()> {
        if zone_id != self.zone_id {
            bail!("unknown zone {zone_id}");
        }
        Ok(())
    }
}

impl ZoneState {
    /// Logs the call, failing it if `failure` has been injected.
    fn record(&mut self, call: DnsCall, failure: FailOn) -> anyhow::Result<()> {
        if self.failures.contains(&failure) {
            let err = anyhow!("injected failure for {call:?}");
            self.calls.push(call);
            return Err(err);
        }
        self.calls.push(call);
        Ok(())
    }
}

#[async_trait]
impl DnsProvider for MemoryDnsProvider {
    async fn zone_id(&self, dns_name: &str) -> anyhow::Result<String> {
        self.state
            .lock()
            .record(DnsCall::ZoneId(dns_name.to_string()), FailOn::Zone)?;

        if dns_name != self.zone_name && !dns_name.ends_with(&format!(".{}", self.zone_name)) {
            bail!("no zone manages {dns_name}");
        }
        Ok(self.zone_id.clone())
    }

    async fn a_records(&self, zone_id: &str, dns_name: &str) -> anyhow::Result<Vec<DnsRecord>> {
        self.check_zone(zone_id)?;
        let mut state = self.state.lock();
        state.record(DnsCall::List(dns_name.to_string()), FailOn::Fetch)?;

        Ok(state
            .records
            .values()
            .filter(|record| record.data.record_type == A_RECORD && record.data.name == dns_name)
            .cloned()
            .collect())
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> anyhow::Result<()> {
        self.check_zone(zone_id)?;
        let mut state = self.state.lock();
        state.record(
            DnsCall::Delete(record_id.to_string()),
            FailOn::Delete(record_id.to_string()),
        )?;

        state
            .records
            .remove(record_id)
            .map(|_| ())
            .ok_or_else(|| anyhow!("record {record_id} does not exist"))
    }

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        data: &RecordData,
    ) -> anyhow::Result<()> {
        self.check_zone(zone_id)?;
        let mut state = self.state.lock();
        state.record(
            DnsCall::Update {
                record_id: record_id.to_string(),
                content: data.content.clone(),
            },
            FailOn::Update(record_id.to_string()),
        )?;

        let record = state
            .records
            .get_mut(record_id)
            .ok_or_else(|| anyhow!("record {record_id} does not exist"))?;
        record.data = data.clone();
        Ok(())
    }

    async fn create_record(&self, zone_id: &str, data: &RecordData) -> anyhow::Result<DnsRecord> {
        self.check_zone(zone_id)?;
        let mut state = self.state.lock();
        state.record(
            DnsCall::Create(data.content.clone()),
            FailOn::Create(data.content.clone()),
        )?;

        state.next_id += 1;
        let record = DnsRecord {
            id: format!("created-{}", state.next_id),
            data: data.clone(),
        };
        state.records.insert(record.id.clone(), record.clone());
        Ok(record)
    }
}
