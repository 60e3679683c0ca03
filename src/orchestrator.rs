/// Insight orchestrator
///
/// Owns the event store, its persistence collaborator, the analytics engine
/// and a bounded per-user report history. Hosts construct one instance,
/// optionally start background maintenance, and close it on shutdown.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::analytics::{AnalyticsEngine, InsightReport};
use crate::config::{AnalyticsConfig, StoreConfig};
use crate::domain::{DomainError, Event, EventCategory, EventPayload, TimeRange};
use crate::storage::{EventStore, SnapshotStore, StorageError};

struct BackgroundTasks {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

pub struct InsightOrchestrator {
    store: EventStore,
    persistence: Arc<dyn SnapshotStore>,
    analytics: AnalyticsEngine,
    history: RwLock<HashMap<String, VecDeque<InsightReport>>>,
    config: StoreConfig,
    background: Mutex<Option<BackgroundTasks>>,
}

impl InsightOrchestrator {
    /// Create the orchestrator and hydrate the store from persistence
    ///
    /// A snapshot that cannot be loaded is logged and the store starts empty.
    pub fn open(
        config: StoreConfig,
        analytics: AnalyticsConfig,
        persistence: Arc<dyn SnapshotStore>,
    ) -> Self {
        let store = EventStore::new(&config);

        match persistence.load() {
            Ok(Some(snapshot)) => {
                store.restore(snapshot);
            }
            Ok(None) => tracing::info!("No snapshot found, starting with an empty event store"),
            Err(e) => tracing::error!(error = %e, "Failed to load snapshot, starting with an empty event store"),
        }

        Self {
            store,
            persistence,
            analytics: AnalyticsEngine::new(analytics),
            history: RwLock::new(HashMap::new()),
            config,
            background: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn analytics(&self) -> &AnalyticsEngine {
        &self.analytics
    }

    /// Record an event; persistence happens on the next flush
    pub fn record(
        &self,
        payload: EventPayload,
        user_id: Option<String>,
        session_id: Option<String>,
    ) -> Result<Event, DomainError> {
        self.store.record(payload, user_id, session_id)
    }

    pub fn query(
        &self,
        category: EventCategory,
        user_id: Option<&str>,
        since: Option<DateTime<Utc>>,
    ) -> Vec<Event> {
        self.store.query(category, user_id, since)
    }

    /// Generate a fresh report and append it to the user's history
    ///
    /// Works on a slice copied at call time; concurrent records are not
    /// blocked while analytics run.
    pub fn generate_insights(&self, user_id: &str, range: TimeRange) -> InsightReport {
        let since = Utc::now() - AnalyticsEngine::lookback(range);
        let slice = self.store.slice(Some(user_id), since);
        let report = self.analytics.generate_report(user_id, range, &slice);

        {
            let mut history = self.history.write().unwrap_or_else(|poisoned| {
                tracing::warn!("Report history lock poisoned, recovering data");
                poisoned.into_inner()
            });
            let reports = history.entry(user_id.to_string()).or_default();
            reports.push_front(report.clone());
            reports.truncate(self.config.history_limit);
        }

        report
    }

    /// Past reports for a user, most recent first
    pub fn history(&self, user_id: &str) -> Vec<InsightReport> {
        let history = self.history.read().unwrap_or_else(|poisoned| {
            tracing::warn!("Report history lock poisoned, recovering data");
            poisoned.into_inner()
        });
        history
            .get(user_id)
            .map(|reports| reports.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Write the store to persistence if it changed since the last flush
    ///
    /// Returns whether a snapshot was written. On failure the store stays
    /// dirty so the next flush retries.
    pub async fn flush_now(&self) -> Result<bool, StorageError> {
        if !self.store.take_dirty() {
            return Ok(false);
        }

        let result = match self.store.snapshot() {
            Ok(snapshot) => {
                let persistence = Arc::clone(&self.persistence);
                tokio::task::spawn_blocking(move || persistence.save(&snapshot).map(|_| snapshot.len()))
                    .await
                    .map_err(|e| StorageError::Task(e.to_string()))
                    .and_then(|saved| saved)
            }
            Err(e) => Err(StorageError::Serialization(e)),
        };

        match result {
            Ok(records) => {
                tracing::debug!(records, "Flushed event store");
                Ok(true)
            }
            Err(e) => {
                self.store.mark_dirty();
                Err(e)
            }
        }
    }

    /// Spawn compaction, flush and analysis loops
    ///
    /// Calling this again while tasks are running has no effect.
    pub fn start_background(self: &Arc<Self>) {
        let mut background = self.background.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if background.is_some() {
            tracing::debug!("Background tasks already running");
            return;
        }

        let (shutdown, receiver) = watch::channel(false);
        let mut handles = Vec::new();

        let compaction = Duration::from_secs(self.config.compaction_interval_secs);
        if !compaction.is_zero() {
            let orchestrator = Arc::clone(self);
            handles.push(spawn_interval(compaction, receiver.clone(), move || {
                let orchestrator = Arc::clone(&orchestrator);
                async move {
                    let removed = orchestrator.store.compact_all();
                    if removed > 0 {
                        tracing::info!(removed, "Periodic compaction removed expired events");
                    }
                }
            }));
        }

        let flush = Duration::from_secs(self.config.flush_interval_secs);
        if !flush.is_zero() {
            let orchestrator = Arc::clone(self);
            handles.push(spawn_interval(flush, receiver.clone(), move || {
                let orchestrator = Arc::clone(&orchestrator);
                async move {
                    if let Err(e) = orchestrator.flush_now().await {
                        tracing::error!(error = %e, "Periodic flush failed");
                    }
                }
            }));
        }

        let analysis = Duration::from_secs(self.config.analysis_interval_secs);
        if !analysis.is_zero() {
            let orchestrator = Arc::clone(self);
            handles.push(spawn_interval(analysis, receiver, move || {
                let orchestrator = Arc::clone(&orchestrator);
                async move {
                    let analyzed = tokio::task::spawn_blocking(move || {
                        let users = orchestrator.store.user_ids();
                        for user_id in &users {
                            orchestrator.generate_insights(user_id, TimeRange::default());
                        }
                        users.len()
                    })
                    .await;
                    match analyzed {
                        Ok(users) => tracing::debug!(users, "Periodic analysis complete"),
                        Err(e) => tracing::error!(error = %e, "Periodic analysis failed"),
                    }
                }
            }));
        }

        tracing::info!(tasks = handles.len(), "Started background tasks");
        *background = Some(BackgroundTasks { shutdown, handles });
    }

    /// Stop background work, wait for it, and flush one last time
    pub async fn close(&self) {
        let background = self
            .background
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        if let Some(tasks) = background {
            let _ = tasks.shutdown.send(true);
            for result in futures::future::join_all(tasks.handles).await {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "Background task ended abnormally");
                }
            }
        }

        match self.flush_now().await {
            Ok(true) => tracing::info!("Final flush complete"),
            Ok(false) => tracing::debug!("Nothing to flush on close"),
            Err(e) => tracing::error!(error = %e, "Final flush failed"),
        }
    }
}

/// Run `tick` every `period` until shutdown is signalled
///
/// The first tick happens one period after start.
fn spawn_interval<F, Fut>(period: Duration, mut shutdown: watch::Receiver<bool>, mut tick: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => tick().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    })
}
