// datawash/src/commands/serve.rs
//! `datawash serve`: run the consumer against an in-process broker.
//!
//! Each stdin line is a JSON object `{"route": "<name>", "payload": <json>}`.
//! Event routes are emitted; request routes are called and their replies are
//! printed to stdout as one JSON line each. At EOF the broker is closed, the
//! consumer drains in-flight work, and its statistics go to stderr.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use datawash_core::{
    InMemoryBroker, QueueConsumer, QueuePublisher, RegexEngine, Route, SanitizationEngine,
};

use super::resolve_valid_config;
use crate::cli::ServeCommand;

#[derive(Debug, Deserialize)]
struct InputLine {
    route: String,
    #[serde(default)]
    payload: Value,
}

/// Publishes one input line and returns the line to print, if any.
pub async fn dispatch_line(publisher: &QueuePublisher, line: &str) -> Option<Value> {
    let input: InputLine = match serde_json::from_str(line) {
        Ok(input) => input,
        Err(e) => {
            warn!("Skipping unparseable input line: {}", e);
            return Some(json!({ "error": format!("invalid input line: {}", e) }));
        }
    };

    match input.route.parse::<Route>() {
        Ok(Route::Event(route)) => match publisher.emit(route, &input.payload).await {
            Ok(()) => {
                debug!("Queued event on '{}'.", route);
                None
            }
            Err(e) => Some(json!({ "route": input.route, "error": e.to_string() })),
        },
        Ok(Route::Rpc(route)) => match publisher.request::<Value, Value>(route, &input.payload).await {
            Ok(reply) => Some(json!({ "route": input.route, "reply": reply })),
            Err(e) => Some(json!({ "route": input.route, "error": e.to_string() })),
        },
        Err(e) => {
            warn!("Rejecting input for unknown route '{}'.", input.route);
            Some(json!({ "route": input.route, "error": e.to_string() }))
        }
    }
}

pub async fn run_serve(cmd: ServeCommand) -> Result<()> {
    let config = resolve_valid_config(&cmd.config)?;
    let args = cmd.queue.to_arguments();

    let broker = Arc::new(InMemoryBroker::new(args.clone()));
    let engine: Arc<dyn SanitizationEngine> = Arc::new(RegexEngine::new(Arc::new(config)));
    let consumer = Arc::new(QueueConsumer::with_engine(broker.clone(), &args, engine));
    let consumer_task = tokio::spawn(consumer.run());
    let publisher = QueuePublisher::new(broker.clone(), args.reply_timeout);
    info!("Serving; reading commands from stdin.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read from stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(output) = dispatch_line(&publisher, line).await {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", output).context("Failed to write to stdout")?;
        }
    }

    info!("Input closed; draining.");
    publisher.close().await;
    let stats = consumer_task.await.context("Consumer task failed")?;
    let broker_stats = broker.stats();

    let summary = json!({
        "consumer": stats,
        "published": broker_stats.published,
        "expired": broker_stats.expired,
        "deadLetters": broker.dead_letters().len(),
    });
    eprintln!("{}", summary);
    Ok(())
}
