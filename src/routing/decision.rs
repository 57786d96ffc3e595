//! Route-phase outcome.

use url::Url;

/// The upstream chosen for a request, or the absence of one.
///
/// Upstream URLs are opaque here: no resolution or health checking happens
/// before dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingDecision {
    Matched { upstream: Url },
    Unmatched,
}

impl RoutingDecision {
    pub fn matched(upstream: Url) -> Self {
        RoutingDecision::Matched { upstream }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, RoutingDecision::Matched { .. })
    }

    pub fn upstream(&self) -> Option<&Url> {
        match self {
            RoutingDecision::Matched { upstream } => Some(upstream),
            RoutingDecision::Unmatched => None,
        }
    }
}
