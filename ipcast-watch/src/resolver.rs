use std::collections::BTreeSet;
use std::fmt::{self, Display};
use std::ops::Deref;
use std::sync::Arc;

use crate::error::ResolveError;
use crate::source::MemberSource;
use crate::{Member, Selector};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
/// A sorted and deduplicated set of endpoint addresses.
///
/// Two sets are equal only if they hold the same addresses, which given the
/// canonical ordering means they are element-wise identical.
pub struct EndpointSet(Vec<String>);

impl EndpointSet {
    /// Creates an empty endpoint set.
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    #[inline]
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl Deref for EndpointSet {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[String]> for EndpointSet {
    fn as_ref(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for EndpointSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let addrs = iter.into_iter().map(Into::into).collect::<BTreeSet<_>>();
        Self(addrs.into_iter().collect())
    }
}

impl From<EndpointSet> for Vec<String> {
    fn from(set: EndpointSet) -> Self {
        set.0
    }
}

impl Display for EndpointSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Derives the endpoint set of the given members.
///
/// Members which do not match the selector or are not ready are skipped, the
/// external addresses of the remaining members are deduplicated and sorted.
pub fn resolve_endpoints<'a>(
    members: impl IntoIterator<Item = &'a Member>,
    selector: &Selector,
) -> EndpointSet {
    members
        .into_iter()
        .filter(|member| selector.matches(member))
        .filter(|member| member.is_ready())
        .flat_map(|member| member.external_addresses())
        .collect()
}

/// Resolves the current endpoint set from a member source.
pub struct EndpointResolver<S> {
    source: Arc<S>,
    selector: String,
}

impl<S> Clone for EndpointResolver<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            selector: self.selector.clone(),
        }
    }
}

impl<S: MemberSource> EndpointResolver<S> {
    /// Creates a new resolver listing members from `source` which match the
    /// `selector` expression.
    ///
    /// The expression is parsed on every resolution, so a malformed selector is
    /// reported by [EndpointResolver::resolve] rather than here.
    pub fn new(source: Arc<S>, selector: impl Into<String>) -> Self {
        Self {
            source,
            selector: selector.into(),
        }
    }

    #[inline]
    /// The raw selector expression.
    pub fn selector(&self) -> &str {
        &self.selector
    }

    #[inline]
    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Lists the matching members and derives their endpoint set.
    pub fn resolve(&self) -> Result<EndpointSet, ResolveError> {
        let selector = Selector::parse(&self.selector)?;
        let members = self
            .source
            .list(&selector)
            .map_err(ResolveError::SourceUnavailable)?;
        Ok(resolve_endpoints(&members, &selector))
    }
}
