// datawash-core/src/messaging/broker.rs
//! The broker seam and an in-process implementation.
//!
//! `Broker` is what publishers talk to, `DeliverySource` is what consumers
//! pull from. `InMemoryBroker` implements both on tokio channels with
//! manual acknowledgement: an event stays outstanding until it is settled,
//! requeued events carry a redelivery counter, and expired or abandoned
//! events end up in a dead-letter store.
//!
//! License: MIT OR APACHE 2.0

use async_trait::async_trait;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, Notify};

use super::{AckOutcome, Delivery, Inbound, QueueArguments, RpcCall, REDELIVERY_COUNT_HEADER};
use crate::errors::DatawashError;

/// Publisher-side operations.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Publishes a fire-and-forget event.
    async fn emit(&self, route: &str, payload: Vec<u8>) -> Result<(), DatawashError>;

    /// Sends a request and waits up to `timeout` for the reply.
    async fn request(&self, route: &str, payload: Vec<u8>, timeout: Duration) -> Result<Vec<u8>, DatawashError>;

    /// Closes the connection. Further publishes fail with `BrokerClosed`.
    async fn close(&self);
}

/// Consumer-side operations.
#[async_trait]
pub trait DeliverySource: Send + Sync {
    /// Waits for the next inbound message. `None` once the source is closed
    /// and every outstanding event has been settled.
    async fn next(&self) -> Option<Inbound>;

    /// Settles an event previously returned by `next`.
    async fn settle(&self, delivery: Delivery, outcome: AckOutcome) -> Result<(), DatawashError>;
}

/// An event that will not be delivered again.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub delivery: Delivery,
    pub reason: String,
}

/// Counter snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrokerStats {
    pub published: u64,
    pub acked: u64,
    pub requeued: u64,
    pub dead_lettered: u64,
    pub expired: u64,
    pub requests: u64,
}

#[derive(Debug, Default)]
struct Counters {
    published: AtomicU64,
    acked: AtomicU64,
    requeued: AtomicU64,
    dead_lettered: AtomicU64,
    expired: AtomicU64,
    requests: AtomicU64,
}

#[derive(Debug)]
pub struct InMemoryBroker {
    args: QueueArguments,
    event_tx: mpsc::UnboundedSender<Delivery>,
    event_rx: Mutex<mpsc::UnboundedReceiver<Delivery>>,
    rpc_tx: mpsc::UnboundedSender<RpcCall>,
    rpc_rx: Mutex<mpsc::UnboundedReceiver<RpcCall>>,
    closed: AtomicBool,
    /// Events published or requeued but not yet acked or dead-lettered.
    outstanding: AtomicU64,
    next_tag: AtomicU64,
    dead_letters: Mutex<Vec<DeadLetter>>,
    counters: Counters,
    state_changed: Notify,
}

impl InMemoryBroker {
    pub fn new(args: QueueArguments) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (rpc_tx, rpc_rx) = mpsc::unbounded_channel();
        info!(
            "Broker ready (durable={}, prefetch={}, ttl={:?}, max_retries={}).",
            args.durable, args.prefetch, args.message_ttl, args.max_retries
        );
        Self {
            args,
            event_tx,
            event_rx: Mutex::new(event_rx),
            rpc_tx,
            rpc_rx: Mutex::new(rpc_rx),
            closed: AtomicBool::new(false),
            outstanding: AtomicU64::new(0),
            next_tag: AtomicU64::new(1),
            dead_letters: Mutex::new(Vec::new()),
            counters: Counters::default(),
            state_changed: Notify::new(),
        }
    }

    pub fn arguments(&self) -> &QueueArguments {
        &self.args
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.dead_letters.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn stats(&self) -> BrokerStats {
        BrokerStats {
            published: self.counters.published.load(Ordering::SeqCst),
            acked: self.counters.acked.load(Ordering::SeqCst),
            requeued: self.counters.requeued.load(Ordering::SeqCst),
            dead_lettered: self.counters.dead_lettered.load(Ordering::SeqCst),
            expired: self.counters.expired.load(Ordering::SeqCst),
            requests: self.counters.requests.load(Ordering::SeqCst),
        }
    }

    fn is_expired(&self, delivery: &Delivery) -> bool {
        self.args
            .message_ttl
            .is_some_and(|ttl| delivery.enqueued_at.elapsed() > ttl)
    }

    fn dead_letter(&self, delivery: Delivery, reason: String) {
        warn!(
            "Dead-lettering message {} on '{}': {}",
            delivery.delivery_tag, delivery.route, reason
        );
        self.dead_letters
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(DeadLetter { delivery, reason });
        self.counters.dead_lettered.fetch_add(1, Ordering::SeqCst);
        self.finish_outstanding();
    }

    fn finish_outstanding(&self) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        self.state_changed.notify_waiters();
    }

    fn enqueue(&self, delivery: Delivery) -> Result<(), DatawashError> {
        self.event_tx.send(delivery).map_err(|_| DatawashError::BrokerClosed)?;
        self.state_changed.notify_waiters();
        Ok(())
    }

    fn try_next(&self) -> Option<Inbound> {
        loop {
            let next = self.event_rx.lock().unwrap_or_else(|e| e.into_inner()).try_recv();
            match next {
                Ok(delivery) if self.is_expired(&delivery) => {
                    self.counters.expired.fetch_add(1, Ordering::SeqCst);
                    self.dead_letter(delivery, "expired".to_string());
                }
                Ok(delivery) => return Some(Inbound::Event(delivery)),
                Err(_) => break,
            }
        }
        self.rpc_rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .try_recv()
            .ok()
            .map(Inbound::Rpc)
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn emit(&self, route: &str, payload: Vec<u8>) -> Result<(), DatawashError> {
        // Count the message before looking at `closed`, so a drained `next()`
        // can never miss an emit that was accepted.
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        if self.is_closed() {
            self.finish_outstanding();
            return Err(DatawashError::BrokerClosed);
        }
        let delivery = Delivery {
            delivery_tag: self.next_tag.fetch_add(1, Ordering::SeqCst),
            route: route.to_string(),
            payload,
            headers: HashMap::new(),
            enqueued_at: Instant::now(),
        };
        debug!("Publishing message {} to '{}'.", delivery.delivery_tag, route);
        if let Err(e) = self.enqueue(delivery) {
            self.finish_outstanding();
            return Err(e);
        }
        self.counters.published.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn request(&self, route: &str, payload: Vec<u8>, timeout: Duration) -> Result<Vec<u8>, DatawashError> {
        if self.is_closed() {
            return Err(DatawashError::BrokerClosed);
        }
        let (reply, rx) = oneshot::channel();
        self.rpc_tx
            .send(RpcCall { route: route.to_string(), payload, reply })
            .map_err(|_| DatawashError::BrokerClosed)?;
        self.counters.requests.fetch_add(1, Ordering::SeqCst);
        self.state_changed.notify_waiters();

        match tokio::time::timeout(timeout, rx).await {
            Err(_) => Err(DatawashError::Timeout { route: route.to_string(), timeout_ms: timeout.as_millis() }),
            Ok(Err(_)) => Err(DatawashError::BrokerClosed),
            Ok(Ok(Err(message))) => Err(DatawashError::Remote { route: route.to_string(), message }),
            Ok(Ok(Ok(bytes))) => Ok(bytes),
        }
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("Broker connection closed.");
        }
        self.state_changed.notify_waiters();
    }
}

#[async_trait]
impl DeliverySource for InMemoryBroker {
    async fn next(&self) -> Option<Inbound> {
        loop {
            let mut changed = pin!(self.state_changed.notified());
            changed.as_mut().enable();

            if let Some(inbound) = self.try_next() {
                return Some(inbound);
            }
            if self.is_closed() && self.outstanding.load(Ordering::SeqCst) == 0 {
                debug!("Broker drained; no more deliveries.");
                return None;
            }
            changed.await;
        }
    }

    async fn settle(&self, mut delivery: Delivery, outcome: AckOutcome) -> Result<(), DatawashError> {
        match outcome {
            AckOutcome::Ack => {
                debug!("Acked message {}.", delivery.delivery_tag);
                self.counters.acked.fetch_add(1, Ordering::SeqCst);
                self.finish_outstanding();
            }
            AckOutcome::Requeue => {
                let count = delivery.redelivery_count() + 1;
                delivery.headers.insert(REDELIVERY_COUNT_HEADER.to_string(), count.to_string());
                debug!("Requeueing message {} (redelivery {}).", delivery.delivery_tag, count);
                self.counters.requeued.fetch_add(1, Ordering::SeqCst);
                self.enqueue(delivery)?;
            }
            AckOutcome::DeadLetter { reason } => self.dead_letter(delivery, reason),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broker() -> InMemoryBroker {
        InMemoryBroker::new(QueueArguments::default())
    }

    async fn next_event(broker: &InMemoryBroker) -> Delivery {
        match broker.next().await {
            Some(Inbound::Event(d)) => d,
            other => panic!("expected event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_requeue_increments_counter_and_redelivers() {
        let broker = broker();
        broker.emit("single-record-received", b"{}".to_vec()).await.unwrap();

        let first = next_event(&broker).await;
        let tag = first.delivery_tag;
        broker.settle(first, AckOutcome::Requeue).await.unwrap();

        let second = next_event(&broker).await;
        assert_eq!(second.delivery_tag, tag);
        assert_eq!(second.redelivery_count(), 1);
        broker.settle(second, AckOutcome::Ack).await.unwrap();

        let stats = broker.stats();
        assert_eq!(stats.requeued, 1);
        assert_eq!(stats.acked, 1);
    }

    #[tokio::test]
    async fn test_closed_broker_rejects_publish_and_drains() {
        let broker = broker();
        broker.emit("single-record-received", b"{}".to_vec()).await.unwrap();
        broker.close().await;

        assert!(matches!(
            broker.emit("single-record-received", vec![]).await,
            Err(DatawashError::BrokerClosed)
        ));

        let pending = next_event(&broker).await;
        broker.settle(pending, AckOutcome::Ack).await.unwrap();
        assert!(broker.next().await.is_none());
    }

    #[tokio::test]
    async fn test_expired_message_is_dead_lettered() {
        let broker = InMemoryBroker::new(QueueArguments {
            message_ttl: Some(Duration::from_millis(1)),
            ..QueueArguments::default()
        });
        broker.emit("single-record-received", b"{}".to_vec()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        broker.close().await;

        assert!(broker.next().await.is_none());
        let dead = broker.dead_letters();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].reason, "expired");
        assert_eq!(broker.stats().expired, 1);
    }

    #[tokio::test]
    async fn test_request_times_out_without_consumer() {
        let broker = broker();
        let err = broker
            .request("health-check", b"{}".to_vec(), Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, DatawashError::Timeout { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_accepted_emit_is_delivered_when_close_races() {
        let broker = std::sync::Arc::new(broker());

        let drainer = {
            let broker = std::sync::Arc::clone(&broker);
            tokio::spawn(async move {
                let mut delivered = 0u64;
                while let Some(inbound) = broker.next().await {
                    if let Inbound::Event(d) = inbound {
                        broker.settle(d, AckOutcome::Ack).await.unwrap();
                        delivered += 1;
                    }
                }
                delivered
            })
        };

        let emitters: Vec<_> = (0..8)
            .map(|_| {
                let broker = std::sync::Arc::clone(&broker);
                tokio::spawn(async move {
                    let mut accepted = 0u64;
                    for _ in 0..200 {
                        if broker.emit("single-record-received", b"{}".to_vec()).await.is_ok() {
                            accepted += 1;
                        }
                        tokio::task::yield_now().await;
                    }
                    accepted
                })
            })
            .collect();

        tokio::task::yield_now().await;
        broker.close().await;

        let mut accepted = 0;
        for emitter in emitters {
            accepted += emitter.await.unwrap();
        }
        let delivered = tokio::time::timeout(Duration::from_secs(5), drainer)
            .await
            .expect("drainer stops once closed and settled")
            .unwrap();

        assert_eq!(delivered, accepted);
        assert_eq!(broker.stats().published, accepted);
        assert_eq!(broker.outstanding.load(Ordering::SeqCst), 0);
    }
}
