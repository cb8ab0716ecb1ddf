// datawash-core/src/messaging/publisher.rs
//! Producer-side API over a shared broker connection.
//!
//! The broker handle is created once at startup and closed once at shutdown;
//! every method here reuses it.

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use super::broker::Broker;
use super::{EventRoute, RpcRoute};
use crate::config::CleaningConfig;
use crate::errors::DatawashError;
use crate::record::{CleanedRecord, HealthStatus, RawRecord};

#[derive(Clone)]
pub struct QueuePublisher {
    broker: Arc<dyn Broker>,
    reply_timeout: Duration,
}

impl QueuePublisher {
    pub fn new(broker: Arc<dyn Broker>, reply_timeout: Duration) -> Self {
        Self { broker, reply_timeout }
    }

    /// Serializes `payload` and publishes it as an event on `route`.
    pub async fn emit<T: Serialize + ?Sized>(&self, route: EventRoute, payload: &T) -> Result<(), DatawashError> {
        let bytes = serde_json::to_vec(payload)?;
        debug!("Emitting {} bytes on '{}'.", bytes.len(), route);
        self.broker.emit(route.as_str(), bytes).await
    }

    /// Sends a request on `route` and decodes the reply.
    pub async fn request<T, R>(&self, route: RpcRoute, payload: &T) -> Result<R, DatawashError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let bytes = serde_json::to_vec(payload)?;
        let reply = self.broker.request(route.as_str(), bytes, self.reply_timeout).await?;
        serde_json::from_slice(&reply).map_err(|e| DatawashError::MalformedPayload {
            route: route.as_str().to_string(),
            reason: e.to_string(),
        })
    }

    pub async fn emit_record(&self, record: &RawRecord) -> Result<(), DatawashError> {
        self.emit(EventRoute::SingleRecordReceived, record).await
    }

    pub async fn emit_batch(&self, records: &[RawRecord]) -> Result<(), DatawashError> {
        self.emit(EventRoute::BatchCleanRequested, records).await
    }

    pub async fn sync_clean(&self, record: &RawRecord) -> Result<CleanedRecord, DatawashError> {
        self.request(RpcRoute::SyncClean, record).await
    }

    pub async fn health_check(&self) -> Result<HealthStatus, DatawashError> {
        self.request(RpcRoute::HealthCheck, &serde_json::json!({})).await
    }

    pub async fn get_config(&self) -> Result<CleaningConfig, DatawashError> {
        self.request(RpcRoute::GetConfig, &serde_json::json!({})).await
    }

    /// Closes the shared broker connection.
    pub async fn close(&self) {
        self.broker.close().await;
    }
}
