// datawash-core/src/messaging/consumer.rs
//! The queue consumer.
//!
//! Pulls from a `DeliverySource`, dispatches events and requests through two
//! separate handler tables, and decides how each event is settled. At most
//! `prefetch` messages are in flight at once; completion order is not
//! arrival order.
//!
//! Settlement rules for events:
//! * handler returned `Ok` → ack, regardless of the record's business status;
//! * handler returned a retryable error → requeue until `max_retries`
//!   redeliveries have been used, then dead-letter;
//! * no handler for the route → dead-letter at once.
//!
//! Handlers run in their own task, so a panic surfaces as a retryable
//! `HandlerCrashed` error instead of leaving the message unsettled.
//!
//! Requests are answered with the handler's value or its error message and
//! are never retried.
//!
//! License: MIT OR APACHE 2.0

use log::{debug, error, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

use super::broker::DeliverySource;
use super::handlers::{
    BatchCleanHandler, EventHandler, GetConfigHandler, HealthCheckHandler, RpcHandler, SingleRecordHandler,
    SyncCleanHandler,
};
use super::{AckOutcome, Delivery, EventRoute, Inbound, QueueArguments, RpcCall, RpcRoute};
use crate::engine::SanitizationEngine;
use crate::errors::DatawashError;

/// Snapshot of what a consumer has done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerStats {
    pub events_acked: u64,
    pub events_requeued: u64,
    pub events_dead_lettered: u64,
    pub requests_answered: u64,
    pub requests_failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    events_acked: AtomicU64,
    events_requeued: AtomicU64,
    events_dead_lettered: AtomicU64,
    requests_answered: AtomicU64,
    requests_failed: AtomicU64,
}

/// Maps a handler result to a settlement.
///
/// `redelivery_count` is how many times the message was already requeued.
pub fn decide_outcome(result: &Result<(), DatawashError>, redelivery_count: u32, max_retries: u32) -> AckOutcome {
    match result {
        Ok(()) => AckOutcome::Ack,
        Err(e) if !e.is_retryable() => AckOutcome::DeadLetter { reason: e.to_string() },
        Err(e) if redelivery_count >= max_retries => AckOutcome::DeadLetter {
            reason: format!("retries exhausted after {} attempts: {}", redelivery_count + 1, e),
        },
        Err(_) => AckOutcome::Requeue,
    }
}

pub struct QueueConsumer {
    source: Arc<dyn DeliverySource>,
    events: HashMap<EventRoute, Arc<dyn EventHandler>>,
    requests: HashMap<RpcRoute, Arc<dyn RpcHandler>>,
    prefetch: usize,
    max_retries: u32,
    counters: Counters,
}

impl QueueConsumer {
    /// Creates a consumer with no handlers registered.
    pub fn new(source: Arc<dyn DeliverySource>, args: &QueueArguments) -> Self {
        Self {
            source,
            events: HashMap::new(),
            requests: HashMap::new(),
            prefetch: args.prefetch.max(1),
            max_retries: args.max_retries,
            counters: Counters::default(),
        }
    }

    /// Creates a consumer with the standard handlers wired to `engine`.
    pub fn with_engine(
        source: Arc<dyn DeliverySource>,
        args: &QueueArguments,
        engine: Arc<dyn SanitizationEngine>,
    ) -> Self {
        Self::new(source, args)
            .on_event(EventRoute::SingleRecordReceived, Arc::new(SingleRecordHandler::new(Arc::clone(&engine))))
            .on_event(EventRoute::BatchCleanRequested, Arc::new(BatchCleanHandler::new(Arc::clone(&engine))))
            .on_request(RpcRoute::SyncClean, Arc::new(SyncCleanHandler::new(Arc::clone(&engine))))
            .on_request(RpcRoute::HealthCheck, Arc::new(HealthCheckHandler))
            .on_request(RpcRoute::GetConfig, Arc::new(GetConfigHandler::new(engine)))
    }

    pub fn on_event(mut self, route: EventRoute, handler: Arc<dyn EventHandler>) -> Self {
        self.events.insert(route, handler);
        self
    }

    pub fn on_request(mut self, route: RpcRoute, handler: Arc<dyn RpcHandler>) -> Self {
        self.requests.insert(route, handler);
        self
    }

    pub fn stats(&self) -> ConsumerStats {
        ConsumerStats {
            events_acked: self.counters.events_acked.load(Ordering::SeqCst),
            events_requeued: self.counters.events_requeued.load(Ordering::SeqCst),
            events_dead_lettered: self.counters.events_dead_lettered.load(Ordering::SeqCst),
            requests_answered: self.counters.requests_answered.load(Ordering::SeqCst),
            requests_failed: self.counters.requests_failed.load(Ordering::SeqCst),
        }
    }

    /// Consumes until the source is exhausted and all in-flight work is
    /// settled.
    pub async fn run(self: Arc<Self>) -> ConsumerStats {
        info!("Consumer started (prefetch={}, max_retries={}).", self.prefetch, self.max_retries);
        let permits = Arc::new(Semaphore::new(self.prefetch));

        loop {
            let permit = match Arc::clone(&permits).acquire_owned().await {
                Ok(p) => p,
                Err(_) => break,
            };
            let Some(inbound) = self.source.next().await else {
                break;
            };
            let consumer = Arc::clone(&self);
            tokio::spawn(async move {
                match inbound {
                    Inbound::Event(delivery) => consumer.process_event(delivery).await,
                    Inbound::Rpc(call) => consumer.process_request(call).await,
                }
                drop(permit);
            });
        }

        // Wait for every in-flight message to finish.
        let _all = permits.acquire_many(self.prefetch as u32).await;
        let stats = self.stats();
        info!("Consumer stopped: {:?}", stats);
        stats
    }

    async fn dispatch_event(&self, delivery: &Delivery) -> Result<(), DatawashError> {
        let route: EventRoute = delivery.route.parse()?;
        let handler = self
            .events
            .get(&route)
            .ok_or_else(|| DatawashError::Unroutable(delivery.route.clone()))?;
        let handler = Arc::clone(handler);
        let payload = delivery.payload.clone();
        // A panicking handler must still end in a settlement.
        tokio::spawn(async move { handler.handle(&payload).await })
            .await
            .map_err(|e| DatawashError::HandlerCrashed(e.to_string()))?
    }

    async fn process_event(&self, delivery: Delivery) {
        debug!("Handling message {} on '{}'.", delivery.delivery_tag, delivery.route);
        let result = self.dispatch_event(&delivery).await;
        if let Err(e) = &result {
            warn!("Handler for message {} on '{}' failed: {}", delivery.delivery_tag, delivery.route, e);
        }

        let outcome = decide_outcome(&result, delivery.redelivery_count(), self.max_retries);
        let counter = match &outcome {
            AckOutcome::Ack => &self.counters.events_acked,
            AckOutcome::Requeue => &self.counters.events_requeued,
            AckOutcome::DeadLetter { .. } => &self.counters.events_dead_lettered,
        };
        counter.fetch_add(1, Ordering::SeqCst);

        let tag = delivery.delivery_tag;
        if let Err(e) = self.source.settle(delivery, outcome).await {
            error!("Failed to settle message {}: {}", tag, e);
        }
    }

    async fn process_request(&self, call: RpcCall) {
        let RpcCall { route, payload, reply } = call;
        debug!("Handling request on '{}'.", route);

        let result = match route.parse::<RpcRoute>().ok().and_then(|r| self.requests.get(&r)) {
            Some(handler) => {
                let handler = Arc::clone(handler);
                tokio::spawn(async move { handler.call(&payload).await })
                    .await
                    .unwrap_or_else(|e| Err(DatawashError::HandlerCrashed(e.to_string())))
            }
            None => Err(DatawashError::Unroutable(route.clone())),
        };

        let response = result.and_then(|value| serde_json::to_vec(&value).map_err(DatawashError::from));
        let response = match response {
            Ok(bytes) => {
                self.counters.requests_answered.fetch_add(1, Ordering::SeqCst);
                Ok(bytes)
            }
            Err(e) => {
                warn!("Request on '{}' failed: {}", route, e);
                self.counters.requests_failed.fetch_add(1, Ordering::SeqCst);
                Err(e.to_string())
            }
        };

        if reply.send(response).is_err() {
            debug!("Caller for '{}' went away before the reply; discarding.", route);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_is_acked() {
        assert_eq!(decide_outcome(&Ok(()), 0, 3), AckOutcome::Ack);
        assert_eq!(decide_outcome(&Ok(()), 5, 3), AckOutcome::Ack);
    }

    #[test]
    fn test_retryable_error_requeues_until_budget_spent() {
        let err = Err(DatawashError::HandlerCrashed("boom".into()));
        assert_eq!(decide_outcome(&err, 0, 3), AckOutcome::Requeue);
        assert_eq!(decide_outcome(&err, 2, 3), AckOutcome::Requeue);
        match decide_outcome(&err, 3, 3) {
            AckOutcome::DeadLetter { reason } => assert!(reason.contains("after 4 attempts")),
            other => panic!("expected dead letter, got {:?}", other),
        }
    }

    #[test]
    fn test_unroutable_is_dead_lettered_immediately() {
        let err = Err(DatawashError::Unroutable("reindex".into()));
        assert!(matches!(decide_outcome(&err, 0, 3), AckOutcome::DeadLetter { .. }));
    }

    #[test]
    fn test_zero_retries_dead_letters_first_failure() {
        let err = Err(DatawashError::Fatal("x".into()));
        assert!(matches!(decide_outcome(&err, 0, 0), AckOutcome::DeadLetter { .. }));
    }
}
