/// Public library interface for the Insight Engine MCP server
///
/// This module exports the event store, analytics, orchestrator and AI
/// dispatcher, plus the server that exposes them over MCP.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

pub mod analytics;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod mcp;
pub mod orchestrator;
pub mod storage;
pub mod tools;

// Re-export public modules and types
pub use analytics::{AnalyticsEngine, InsightReport};
pub use config::{ConfigError, EngineConfig};
pub use dispatch::{AiDispatcher, DispatchError, DispatchResponse, DispatchSource};
pub use domain::*;
pub use orchestrator::InsightOrchestrator;
pub use storage::{
    EventSlice, EventStore, MemorySnapshotStore, SnapshotStore, SqliteSnapshotStore, StorageError,
    StoreSnapshot,
};

/// Errors that can occur during server operation
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Domain validation error: {0}")]
    Domain(#[from] domain::DomainError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] dispatch::DispatchError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Insight engine server implementing the MCP protocol
///
/// Cheap to clone; clones share the same orchestrator and dispatcher.
#[derive(Clone)]
pub struct InsightServer {
    orchestrator: Arc<InsightOrchestrator>,
    dispatcher: Arc<AiDispatcher>,
}

impl InsightServer {
    /// Create a server persisting snapshots to the SQLite database at `db_path`
    ///
    /// The database and its schema are created if they don't already exist.
    pub async fn new(db_path: PathBuf, config: EngineConfig) -> Result<Self, EngineError> {
        tracing::info!("Initializing Insight Engine with database: {:?}", db_path);
        let persistence = SqliteSnapshotStore::new(db_path)?;
        Self::with_persistence(config, Arc::new(persistence))
    }

    /// Create a server with any snapshot store
    pub fn with_persistence(
        config: EngineConfig,
        persistence: Arc<dyn SnapshotStore>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let dispatcher = AiDispatcher::from_config(config.dispatch)?;
        let orchestrator = InsightOrchestrator::open(config.store, config.analytics, persistence);

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            dispatcher: Arc::new(dispatcher),
        })
    }

    /// Run the MCP server over stdin/stdout until the client disconnects
    ///
    /// Background maintenance runs for the lifetime of the call and the
    /// store is flushed before returning.
    pub async fn run(self) -> Result<(), EngineError> {
        self.orchestrator.start_background();
        tracing::info!(
            events = self.orchestrator.store().total_len(),
            features = self.dispatcher.features().len(),
            "Server started"
        );

        let mut mcp_server = mcp::McpServer::new(self.clone());
        let result = mcp_server.run().await;

        self.close().await;
        result
    }

    /// Stop background work and flush the store
    pub async fn close(&self) {
        self.orchestrator.close().await;
    }

    pub fn orchestrator(&self) -> &InsightOrchestrator {
        &self.orchestrator
    }

    pub fn dispatcher(&self) -> &AiDispatcher {
        &self.dispatcher
    }
}
