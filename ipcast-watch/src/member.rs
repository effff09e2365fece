use std::collections::BTreeMap;
use std::fmt::{self, Display};

#[derive(Debug, Clone, PartialEq, Eq)]
/// A snapshot of a single cluster member as observed from the member source.
///
/// Members are never mutated once they have been delivered by the source,
/// every change arrives as a brand new snapshot.
pub struct Member {
    /// The unique name of the member within the cluster.
    pub name: String,
    /// The labels attached to the member, matched against selectors.
    pub labels: BTreeMap<String, String>,
    /// The reported conditions of the member, in the order the source gave them.
    pub conditions: Vec<Condition>,
    /// The addresses of the member, in the order the source gave them.
    pub addresses: Vec<Address>,
}

impl Member {
    /// Creates a new member with no labels, conditions or addresses.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: BTreeMap::new(),
            conditions: Vec::new(),
            addresses: Vec::new(),
        }
    }

    /// Attach a label to the member.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Append a condition to the member.
    pub fn with_condition(mut self, kind: ConditionKind, status: ConditionStatus) -> Self {
        self.conditions.push(Condition { kind, status });
        self
    }

    /// Append an address to the member.
    pub fn with_address(mut self, kind: AddressKind, value: impl Into<String>) -> Self {
        self.addresses.push(Address {
            kind,
            value: value.into(),
        });
        self
    }

    /// Returns if the member reports itself as ready.
    ///
    /// Only an exact `Ready=True` condition counts, other conditions are ignored
    /// and a member without any ready condition is never ready.
    pub fn is_ready(&self) -> bool {
        self.conditions.iter().any(|condition| {
            condition.kind == ConditionKind::Ready
                && condition.status == ConditionStatus::True
        })
    }

    /// The externally reachable addresses of the member.
    pub fn external_addresses(&self) -> impl Iterator<Item = &str> + '_ {
        self.addresses
            .iter()
            .filter(|addr| addr.kind == AddressKind::ExternalIP)
            .map(|addr| addr.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub kind: ConditionKind,
    pub status: ConditionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    Ready,
    MemoryPressure,
    DiskPressure,
    PIDPressure,
    NetworkUnavailable,
    /// Any condition type this crate has no special knowledge of.
    Other(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub kind: AddressKind,
    pub value: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AddressKind {
    ExternalIP,
    InternalIP,
    ExternalDNS,
    InternalDNS,
    Hostname,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A single change reported by the member source.
pub enum MemberEvent {
    Added(Member),
    Updated { old: Member, new: Member },
    Deleted(Member),
}

impl MemberEvent {
    /// The name of the member the event refers to.
    pub fn member_name(&self) -> &str {
        match self {
            MemberEvent::Added(member) => &member.name,
            MemberEvent::Updated { new, .. } => &new.name,
            MemberEvent::Deleted(member) => &member.name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MemberEvent::Added(_) => "added",
            MemberEvent::Updated { .. } => "updated",
            MemberEvent::Deleted(_) => "deleted",
        }
    }
}

impl Display for MemberEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.member_name())
    }
}
