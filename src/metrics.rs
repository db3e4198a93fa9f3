//! Metric helpers for `nighthouse`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to nothing.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

use crate::protocol::Verb;

/// Name of the counter tracking requests handed to the transport.
pub const REQUESTS_TOTAL: &str = "nighthouse_requests_total";
/// Name of the counter tracking routed replies.
pub const REPLIES_TOTAL: &str = "nighthouse_replies_total";
/// Name of the counter tracking inbound messages that are not replies.
pub const MALFORMED_MESSAGES: &str = "nighthouse_malformed_messages_total";
/// Name of the gauge tracking live stream subscriptions.
pub const SUBSCRIPTIONS_ACTIVE: &str = "nighthouse_subscriptions_active";

/// What happened to an inbound reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// Delivered with a success status.
    Success,
    /// Delivered with an error status.
    Error,
    /// No consumer yet; kept in the replay buffer.
    Buffered,
    /// Dropped: no request id, or the connection is closed.
    Dropped,
}

impl ReplyOutcome {
    fn as_str(self) -> &'static str {
        match self {
            ReplyOutcome::Success => "success",
            ReplyOutcome::Error => "error",
            ReplyOutcome::Buffered => "buffered",
            ReplyOutcome::Dropped => "dropped",
        }
    }
}

/// Record a request handed to the transport.
pub fn inc_requests(verb: Verb) {
    #[cfg(feature = "metrics")]
    counter!(REQUESTS_TOTAL, "verb" => verb.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = verb;
}

/// Record the routing outcome of a reply.
pub fn inc_replies(outcome: ReplyOutcome) {
    #[cfg(feature = "metrics")]
    counter!(REPLIES_TOTAL, "outcome" => outcome.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = outcome.as_str();
}

/// Record an inbound message that could not be read as a reply.
pub fn inc_malformed() {
    #[cfg(feature = "metrics")]
    counter!(MALFORMED_MESSAGES).increment(1);
}

/// Increment the live subscriptions gauge.
pub fn inc_subscriptions() {
    #[cfg(feature = "metrics")]
    gauge!(SUBSCRIPTIONS_ACTIVE).increment(1.0);
}

/// Decrement the live subscriptions gauge by `count`.
pub fn dec_subscriptions(count: usize) {
    #[cfg(feature = "metrics")]
    {
        #[expect(clippy::cast_precision_loss, reason = "subscription counts stay small")]
        let delta = count as f64;
        gauge!(SUBSCRIPTIONS_ACTIVE).decrement(delta);
    }
    #[cfg(not(feature = "metrics"))]
    let _ = count;
}
