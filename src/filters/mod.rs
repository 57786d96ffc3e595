//! Built-in filters shipped with the gateway binary.
//!
//! - request_id.rs: post filter echoing the request id on responses
//! - error_body.rs: error filter rendering faults as JSON

pub mod error_body;
pub mod request_id;

pub use error_body::ErrorBodyFilter;
pub use request_id::RequestIdFilter;
