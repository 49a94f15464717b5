//! Run Registry — at most one bot run at a time.
//!
//! `Idle → Running → Idle`. A start while running is rejected, never queued.
//! The running state is held by a `RunTicket`; dropping the ticket (normal
//! end, error or panic in the run task) returns the registry to idle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("A bot run is already in progress (run {0})")]
    AlreadyRunning(Uuid),

    #[error("No bot run is in progress")]
    NotRunning,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RunInfo {
    pub run_id: Uuid,
    pub account: Option<String>,
    pub started_at: DateTime<Utc>,
    /// Set once a stop has been requested.
    pub stopping: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FinishedRun {
    pub run_id: Uuid,
    pub finished_at: DateTime<Utc>,
    pub outcome: String,
}

#[derive(Debug)]
struct ActiveRun {
    info: RunInfo,
    cancel: CancellationToken,
}

#[derive(Debug, Default)]
struct Inner {
    active: Option<ActiveRun>,
    last: Option<FinishedRun>,
}

#[derive(Debug, Clone, Default)]
pub struct RunRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves to running, or reports the run that is already active.
    pub fn try_start(&self, account: Option<String>) -> Result<RunTicket, RegistryError> {
        let mut inner = self.lock();
        if let Some(active) = &inner.active {
            return Err(RegistryError::AlreadyRunning(active.info.run_id));
        }

        let run_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        inner.active = Some(ActiveRun {
            info: RunInfo {
                run_id,
                account,
                started_at: Utc::now(),
                stopping: false,
            },
            cancel: cancel.clone(),
        });
        info!("Run {run_id} registered");

        Ok(RunTicket {
            registry: self.clone(),
            run_id,
            cancel,
            outcome: None,
        })
    }

    /// Requests cancellation of the active run. The run observes it at its
    /// next loop boundary.
    pub fn stop(&self) -> Result<Uuid, RegistryError> {
        let mut inner = self.lock();
        let active = inner.active.as_mut().ok_or(RegistryError::NotRunning)?;
        active.cancel.cancel();
        active.info.stopping = true;
        info!("Stop requested for run {}", active.info.run_id);
        Ok(active.info.run_id)
    }

    /// The active run, if any.
    pub fn current(&self) -> Option<RunInfo> {
        self.lock().active.as_ref().map(|a| a.info.clone())
    }

    pub fn last_finished(&self) -> Option<FinishedRun> {
        self.lock().last.clone()
    }

    fn release(&self, run_id: Uuid, outcome: String) {
        let mut inner = self.lock();
        if inner.active.as_ref().map(|a| a.info.run_id) == Some(run_id) {
            inner.active = None;
            inner.last = Some(FinishedRun {
                run_id,
                finished_at: Utc::now(),
                outcome,
            });
            info!("Run {run_id} released");
        }
    }
}

/// Proof of the running state. Dropping it returns the registry to idle.
#[derive(Debug)]
pub struct RunTicket {
    registry: RunRegistry,
    run_id: Uuid,
    cancel: CancellationToken,
    outcome: Option<String>,
}

impl RunTicket {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Records how the run ended, reported once the ticket is dropped.
    pub fn set_outcome(&mut self, outcome: impl Into<String>) {
        self.outcome = Some(outcome.into());
    }
}

impl Drop for RunTicket {
    fn drop(&mut self) {
        let outcome = self
            .outcome
            .take()
            .unwrap_or_else(|| "ended unexpectedly".to_string());
        self.registry.release(self.run_id, outcome);
    }
}
