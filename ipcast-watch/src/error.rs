use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid member selector `{selector}`: {reason}")]
/// The selector expression could not be parsed.
pub struct SelectorError {
    /// The selector expression as it was given.
    pub selector: String,
    /// Why the expression was rejected.
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{0}")]
    /// The configured selector is malformed.
    InvalidSelector(#[from] SelectorError),

    #[error("Failed to list the cluster members: {0}")]
    /// The member source could not produce a listing.
    SourceUnavailable(anyhow::Error),
}
