//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check routes: unique names, usable upstreams, complete conditions
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address `{0}`")]
    BindAddress(String),

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("limits.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("duplicate route name `{0}`")]
    DuplicateRoute(String),

    #[error("route `{route}`: invalid upstream `{upstream}`")]
    InvalidUpstream { route: String, upstream: String },

    #[error("route `{route}`: unsupported upstream scheme `{scheme}`")]
    UnsupportedScheme { route: String, scheme: String },

    #[error("route `{route}`: upstream `{upstream}` must not carry a query or fragment")]
    UpstreamQuery { route: String, upstream: String },

    #[error("route `{0}` has no match condition")]
    NoCondition(String),

    #[error("route `{0}`: query_param and query_value must be set together")]
    PartialQueryCondition(String),

    #[error("routes `{first}` and `{second}` share priority {priority} under strict ordering")]
    DuplicatePriority {
        first: String,
        second: String,
        priority: i32,
    },
}

/// Validate a parsed configuration, collecting every problem.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.timeouts.dispatch_ms == 0 {
        errors.push(ValidationError::ZeroTimeout("dispatch_ms"));
    }
    if config.timeouts.connect_ms == 0 {
        errors.push(ValidationError::ZeroTimeout("connect_ms"));
    }
    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    let mut names = HashSet::new();
    let mut priorities: HashMap<i32, &str> = HashMap::new();
    for route in &config.routes {
        if !names.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        }

        match Url::parse(&route.upstream) {
            Ok(url) if url.scheme() != "http" => errors.push(ValidationError::UnsupportedScheme {
                route: route.name.clone(),
                scheme: url.scheme().to_string(),
            }),
            Ok(url) if url.query().is_some() || url.fragment().is_some() => {
                errors.push(ValidationError::UpstreamQuery {
                    route: route.name.clone(),
                    upstream: route.upstream.clone(),
                })
            }
            Ok(_) => {}
            Err(_) => errors.push(ValidationError::InvalidUpstream {
                route: route.name.clone(),
                upstream: route.upstream.clone(),
            }),
        }

        match (&route.query_param, &route.query_value) {
            (Some(_), None) | (None, Some(_)) => {
                errors.push(ValidationError::PartialQueryCondition(route.name.clone()))
            }
            (None, None) if route.host.is_none() && route.path_prefix.is_none() => {
                errors.push(ValidationError::NoCondition(route.name.clone()))
            }
            _ => {}
        }

        if config.registry.strict_priorities {
            if let Some(first) = priorities.insert(route.priority, route.name.as_str()) {
                errors.push(ValidationError::DuplicatePriority {
                    first: first.to_string(),
                    second: route.name.clone(),
                    priority: route.priority,
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
