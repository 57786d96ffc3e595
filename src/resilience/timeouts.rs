//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap the dispatch future with the per-request deadline
//! - Observe the client disconnect signal while dispatch is pending
//! - Cancel the upstream call cleanly when either fires
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Disconnect is checked first: a vanished client never gets a late response

use std::future::Future;
use std::time::Duration;

/// Which side of the race finished first.
#[derive(Debug, PartialEq, Eq)]
pub enum DispatchRace<T> {
    Completed(T),
    TimedOut,
    Disconnected,
}

/// Race `dispatch` against `deadline` and `disconnect`.
pub async fn race_dispatch<F, C>(dispatch: F, deadline: Duration, disconnect: C) -> DispatchRace<F::Output>
where
    F: Future,
    C: Future<Output = ()>,
{
    tokio::select! {
        biased;
        _ = disconnect => DispatchRace::Disconnected,
        result = tokio::time::timeout(deadline, dispatch) => match result {
            Ok(output) => DispatchRace::Completed(output),
            Err(_) => DispatchRace::TimedOut,
        },
    }
}
