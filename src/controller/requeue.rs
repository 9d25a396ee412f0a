//! # Requeue Policy
//!
//! Maps the outcome of a reconciliation pass to a scheduling decision for the
//! controller runtime.

use kube_runtime::controller::Action;
use std::time::Duration;

/// Done, nothing pending: wait for the next change to the object
pub fn do_not_requeue<E>() -> Result<Action, E> {
    Ok(Action::await_change())
}

/// Done, but a known condition is pending: revisit after `duration`
///
/// The duration is chosen by the caller, this helper does not compute backoff.
pub fn requeue_after<E>(duration: Duration) -> Result<Action, E> {
    Ok(Action::requeue(duration))
}

/// Failed: hand the error to the runtime's error policy unchanged
pub fn requeue_on_err<E>(err: E) -> Result<Action, E> {
    Err(err)
}
