//! Route-phase filters compiled from configuration.
//!
//! # Responsibilities
//! - Compile each `RouteConfig` into a matcher + upstream pair
//! - Write `Matched` or `Unmatched` into the request context
//!
//! # Design Decisions
//! - One filter per route; the executor's first-match-wins rule does the rest
//! - Matching is evaluated once per request; no duplicated branches
//! - Invalid upstreams are rejected at compile time, not per request

use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::config::RouteConfig;
use crate::filter::{Filter, FilterOutcome, Phase, RequestContext};
use crate::routing::matcher::{
    AndMatcher, HostMatcher, Matcher, PathPrefixMatcher, QueryParamMatcher,
};
use crate::routing::RoutingDecision;

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("route `{route}` has invalid upstream `{upstream}`: {source}")]
    InvalidUpstream {
        route: String,
        upstream: String,
        #[source]
        source: url::ParseError,
    },
}

/// A route-phase filter selecting a fixed upstream when its conditions hold.
#[derive(Debug)]
pub struct RouteFilter {
    id: String,
    priority: i32,
    upstream: Url,
    matcher: AndMatcher,
}

impl RouteFilter {
    pub fn new(id: impl Into<String>, priority: i32, upstream: Url, matcher: AndMatcher) -> Self {
        Self {
            id: id.into(),
            priority,
            upstream,
            matcher,
        }
    }

    /// Compile a route definition.
    pub fn from_config(config: &RouteConfig) -> Result<Self, RouteError> {
        let upstream = Url::parse(&config.upstream).map_err(|source| RouteError::InvalidUpstream {
            route: config.name.clone(),
            upstream: config.upstream.clone(),
            source,
        })?;

        let mut matchers: Vec<Box<dyn Matcher>> = Vec::new();
        if let Some(host) = &config.host {
            matchers.push(Box::new(HostMatcher::new(host.clone())));
        }
        if let Some(prefix) = &config.path_prefix {
            matchers.push(Box::new(PathPrefixMatcher::new(prefix.clone())));
        }
        if let (Some(param), Some(value)) = (&config.query_param, &config.query_value) {
            matchers.push(Box::new(QueryParamMatcher::new(param.clone(), value.clone())));
        }

        Ok(Self::new(
            config.name.clone(),
            config.priority,
            upstream,
            AndMatcher::new(matchers),
        ))
    }

    pub fn upstream(&self) -> &Url {
        &self.upstream
    }
}

impl Filter for RouteFilter {
    fn id(&self) -> &str {
        &self.id
    }

    fn phase(&self) -> Phase {
        Phase::Route
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn run(&self, ctx: &mut RequestContext) -> FilterOutcome {
        let decision = if self.matcher.matches(ctx.request()) {
            RoutingDecision::matched(self.upstream.clone())
        } else {
            RoutingDecision::Unmatched
        };
        ctx.set_route(decision);
        FilterOutcome::Continue
    }
}

/// Compile every configured route into route-phase filters.
pub fn compile_routes(routes: &[RouteConfig]) -> Result<Vec<Arc<dyn Filter>>, RouteError> {
    routes
        .iter()
        .map(|route| RouteFilter::from_config(route).map(|f| Arc::new(f) as Arc<dyn Filter>))
        .collect()
}
