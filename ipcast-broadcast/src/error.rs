use std::fmt::{self, Display};
use std::time::Duration;

use thiserror::Error;

/// Separates the individual failures of an [AggregateError] message.
pub const ERROR_DELIMITER: &str = "\n-----------------------\n";

#[derive(Debug, Error)]
pub enum DnsError {
    #[error("Unable to determine the zone for dns={name}: {error}")]
    ZoneResolution { name: String, error: anyhow::Error },

    #[error("Failed to fetch A-records for zone_id:{zone_id}, dns:{name}: {error}")]
    Fetch {
        zone_id: String,
        name: String,
        error: anyhow::Error,
    },

    #[error(
        "Failed to delete a record id:{record_id} for dns:{name} in zone_id:{zone_id}: {error}"
    )]
    Delete {
        zone_id: String,
        name: String,
        record_id: String,
        error: anyhow::Error,
    },

    #[error(
        "Failed to update a record id:{record_id} for dns:{name} in zone_id:{zone_id}: {error}"
    )]
    Update {
        zone_id: String,
        name: String,
        record_id: String,
        error: anyhow::Error,
    },

    #[error("Failed to create a record ip:{address} in zone_id:{zone_id}: {error}")]
    Create {
        zone_id: String,
        address: String,
        error: anyhow::Error,
    },
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    /// The chat transport failed to deliver the message.
    Send(anyhow::Error),
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Dns(#[from] DnsError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("The publish was cancelled before it completed.")]
    Cancelled,

    #[error("The publisher did not complete within the {0:?} deadline.")]
    DeadlineExceeded(Duration),

    #[error("The publisher task panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    /// A nested broadcaster failed.
    Broadcast(Box<BroadcastError>),

    #[error("{0}")]
    /// A failure from a publisher implemented outside of this crate.
    Other(anyhow::Error),
}

#[derive(Debug)]
/// A failure of a single publisher within a broadcast round.
pub struct PublishFailure {
    /// The position the publisher was registered at.
    pub index: usize,
    /// The name of the publisher.
    pub publisher: String,
    /// What went wrong.
    pub error: PublishError,
}

impl Display for PublishFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.publisher, self.error)
    }
}

impl std::error::Error for PublishFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[derive(Debug)]
/// Two or more publisher failures from the same broadcast round, in the order
/// the publishers were registered.
pub struct AggregateError(pub(crate) Vec<PublishFailure>);

impl AggregateError {
    pub fn failures(&self) -> &[PublishFailure] {
        &self.0
    }
}

impl Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(ERROR_DELIMITER)?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("One broadcast failed: {0}")]
    Single(#[source] PublishFailure),

    #[error("Multiple errors occurred during broadcasting: {0}")]
    Multiple(#[source] AggregateError),
}

impl BroadcastError {
    /// Every publisher failure of the round, in registration order.
    pub fn failures(&self) -> &[PublishFailure] {
        match self {
            BroadcastError::Single(failure) => std::slice::from_ref(failure),
            BroadcastError::Multiple(aggregate) => aggregate.failures(),
        }
    }
}
