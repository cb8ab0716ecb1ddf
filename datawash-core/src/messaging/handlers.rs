// datawash-core/src/messaging/handlers.rs
//! Handlers bridging queue messages to a `SanitizationEngine`.
//!
//! Event handlers succeed whenever the record was processed, whatever its
//! business status. They only fail on transport problems: an unparseable
//! payload or a crashed worker task. Request handlers return the reply body.

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use super::{EventRoute, RpcRoute, SERVICE_NAME};
use crate::batch::BatchSummary;
use crate::engine::SanitizationEngine;
use crate::errors::DatawashError;
use crate::record::{CleanStatus, HealthStatus, RawRecord};

/// Handles a fire-and-forget event. `Ok` means acknowledge.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, payload: &[u8]) -> Result<(), DatawashError>;
}

/// Handles a request and produces the reply body.
#[async_trait]
pub trait RpcHandler: Send + Sync {
    async fn call(&self, payload: &[u8]) -> Result<Value, DatawashError>;
}

/// Decodes a JSON payload, mapping failures to `MalformedPayload`.
pub fn parse_payload<T: DeserializeOwned>(route: &str, payload: &[u8]) -> Result<T, DatawashError> {
    serde_json::from_slice(payload).map_err(|e| DatawashError::MalformedPayload {
        route: route.to_string(),
        reason: e.to_string(),
    })
}

/// Runs CPU-bound work off the async executor.
async fn run_blocking<T, F>(work: F) -> Result<T, DatawashError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| DatawashError::HandlerCrashed(e.to_string()))
}

pub struct SingleRecordHandler {
    engine: Arc<dyn SanitizationEngine>,
}

impl SingleRecordHandler {
    pub fn new(engine: Arc<dyn SanitizationEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl EventHandler for SingleRecordHandler {
    async fn handle(&self, payload: &[u8]) -> Result<(), DatawashError> {
        let record: RawRecord = parse_payload(EventRoute::SingleRecordReceived.as_str(), payload)?;
        let engine = Arc::clone(&self.engine);
        let cleaned = run_blocking(move || engine.sanitize(&record)).await?;

        match cleaned.status {
            CleanStatus::Success => info!("Record '{}' cleaned.", cleaned.id),
            status => warn!(
                "Record '{}' cleaned with status {}: {:?}",
                cleaned.id,
                status.as_str(),
                cleaned.diagnostics()
            ),
        }
        Ok(())
    }
}

pub struct BatchCleanHandler {
    engine: Arc<dyn SanitizationEngine>,
}

impl BatchCleanHandler {
    pub fn new(engine: Arc<dyn SanitizationEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl EventHandler for BatchCleanHandler {
    async fn handle(&self, payload: &[u8]) -> Result<(), DatawashError> {
        let records: Vec<RawRecord> = parse_payload(EventRoute::BatchCleanRequested.as_str(), payload)?;
        let engine = Arc::clone(&self.engine);
        let items = run_blocking(move || engine.sanitize_batch(&records)).await?;

        let summary = BatchSummary::from_items(&items);
        info!(
            "Batch cleaned: total={}, success={}, partial={}, failed={}, errored={}",
            summary.total, summary.success, summary.partial, summary.failed, summary.errored
        );
        for failure in items.iter().filter_map(|i| i.as_ref().err()) {
            warn!("Batch item '{}' aborted: {}", failure.id, failure.error);
        }
        Ok(())
    }
}

pub struct SyncCleanHandler {
    engine: Arc<dyn SanitizationEngine>,
}

impl SyncCleanHandler {
    pub fn new(engine: Arc<dyn SanitizationEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl RpcHandler for SyncCleanHandler {
    async fn call(&self, payload: &[u8]) -> Result<Value, DatawashError> {
        let record: RawRecord = parse_payload(RpcRoute::SyncClean.as_str(), payload)?;
        let engine = Arc::clone(&self.engine);
        let cleaned = run_blocking(move || engine.sanitize(&record)).await?;
        debug!("sync-clean replying for record '{}'.", cleaned.id);
        Ok(serde_json::to_value(cleaned)?)
    }
}

pub struct HealthCheckHandler;

#[async_trait]
impl RpcHandler for HealthCheckHandler {
    async fn call(&self, _payload: &[u8]) -> Result<Value, DatawashError> {
        Ok(serde_json::to_value(HealthStatus::healthy(SERVICE_NAME))?)
    }
}

pub struct GetConfigHandler {
    engine: Arc<dyn SanitizationEngine>,
}

impl GetConfigHandler {
    pub fn new(engine: Arc<dyn SanitizationEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl RpcHandler for GetConfigHandler {
    async fn call(&self, _payload: &[u8]) -> Result<Value, DatawashError> {
        Ok(serde_json::to_value(self.engine.get_config())?)
    }
}
