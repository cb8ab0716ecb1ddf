// datawash-core/src/messaging/mod.rs
//! Queue plumbing: routes, delivery envelopes, the broker seam, and the
//! consumer/publisher pair built on top of it.
//!
//! Two message classes never share a code path:
//!
//! * events (`EventRoute`) are fire-and-forget and settled with an
//!   `AckOutcome`;
//! * requests (`RpcRoute`) return a value or an error to the caller and are
//!   never acknowledged or retried.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

use crate::errors::DatawashError;

pub mod broker;
pub mod consumer;
pub mod handlers;
pub mod publisher;

/// Header carrying how many times an event has been requeued.
pub const REDELIVERY_COUNT_HEADER: &str = "x-redelivery-count";

/// Service name reported by `health-check`.
pub const SERVICE_NAME: &str = "datawash";

/// Fire-and-forget routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventRoute {
    SingleRecordReceived,
    BatchCleanRequested,
}

impl EventRoute {
    pub const ALL: [EventRoute; 2] = [EventRoute::SingleRecordReceived, EventRoute::BatchCleanRequested];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventRoute::SingleRecordReceived => "single-record-received",
            EventRoute::BatchCleanRequested => "batch-clean-requested",
        }
    }
}

/// Request/reply routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RpcRoute {
    SyncClean,
    HealthCheck,
    GetConfig,
}

impl RpcRoute {
    pub const ALL: [RpcRoute; 3] = [RpcRoute::SyncClean, RpcRoute::HealthCheck, RpcRoute::GetConfig];

    pub fn as_str(&self) -> &'static str {
        match self {
            RpcRoute::SyncClean => "sync-clean",
            RpcRoute::HealthCheck => "health-check",
            RpcRoute::GetConfig => "get-config",
        }
    }
}

/// Either kind of route, as named on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Event(EventRoute),
    Rpc(RpcRoute),
}

impl FromStr for EventRoute {
    type Err = DatawashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventRoute::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| DatawashError::Unroutable(s.to_string()))
    }
}

impl FromStr for RpcRoute {
    type Err = DatawashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RpcRoute::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| DatawashError::Unroutable(s.to_string()))
    }
}

impl FromStr for Route {
    type Err = DatawashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<EventRoute>()
            .map(Route::Event)
            .or_else(|_| s.parse::<RpcRoute>().map(Route::Rpc))
    }
}

impl fmt::Display for EventRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for RpcRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Queue declaration and consumer limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueArguments {
    pub durable: bool,
    /// Maximum messages in flight per consumer.
    pub prefetch: usize,
    /// Events older than this are dead-lettered instead of delivered.
    pub message_ttl: Option<Duration>,
    /// Requeues allowed before an event is dead-lettered.
    pub max_retries: u32,
    /// How long a publisher waits for a request/reply answer.
    pub reply_timeout: Duration,
}

impl Default for QueueArguments {
    fn default() -> Self {
        Self {
            durable: true,
            prefetch: 10,
            message_ttl: Some(Duration::from_secs(24 * 60 * 60)),
            max_retries: 3,
            reply_timeout: Duration::from_secs(5),
        }
    }
}

/// An event handed to a consumer.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub delivery_tag: u64,
    pub route: String,
    pub payload: Vec<u8>,
    pub headers: HashMap<String, String>,
    /// When the message was first published. Not reset on requeue.
    pub enqueued_at: Instant,
}

impl Delivery {
    /// Number of times this message has already been requeued.
    pub fn redelivery_count(&self) -> u32 {
        self.headers
            .get(REDELIVERY_COUNT_HEADER)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }
}

/// How a consumer settles an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckOutcome {
    /// Processed; remove from the queue.
    Ack,
    /// Transport-level failure; deliver again.
    Requeue,
    /// Give up on the message.
    DeadLetter { reason: String },
}

/// A request waiting for a reply.
#[derive(Debug)]
pub struct RpcCall {
    pub route: String,
    pub payload: Vec<u8>,
    pub reply: oneshot::Sender<Result<Vec<u8>, String>>,
}

/// Anything a consumer can pull from a source.
#[derive(Debug)]
pub enum Inbound {
    Event(Delivery),
    Rpc(RpcCall),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_names_round_trip_through_from_str() {
        for r in EventRoute::ALL {
            assert_eq!(r.as_str().parse::<Route>().unwrap(), Route::Event(r));
        }
        for r in RpcRoute::ALL {
            assert_eq!(r.as_str().parse::<Route>().unwrap(), Route::Rpc(r));
        }
        assert!(matches!("reindex".parse::<Route>(), Err(DatawashError::Unroutable(_))));
    }

    #[test]
    fn test_serde_names_match_wire_names() {
        assert_eq!(serde_json::to_value(EventRoute::BatchCleanRequested).unwrap(), "batch-clean-requested");
        assert_eq!(serde_json::to_value(RpcRoute::GetConfig).unwrap(), "get-config");
    }

    #[test]
    fn test_redelivery_count_defaults_to_zero() {
        let mut delivery = Delivery {
            delivery_tag: 1,
            route: "single-record-received".into(),
            payload: vec![],
            headers: HashMap::new(),
            enqueued_at: Instant::now(),
        };
        assert_eq!(delivery.redelivery_count(), 0);
        delivery.headers.insert(REDELIVERY_COUNT_HEADER.into(), "2".into());
        assert_eq!(delivery.redelivery_count(), 2);
    }
}
