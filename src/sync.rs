//! Best-effort bridge between the local store and the remote task store.
//!
//! Startup reconciliation is a whole-collection decision, not a merge:
//! - remote non-empty: remote wins and overwrites local
//! - remote empty, local non-empty: local is uploaded once
//! - both empty: nothing happens, so an empty push can never wipe the remote
//!
//! Known limitation: because remote wins whenever it has data, edits made
//! offline on this device are discarded if another device populated the
//! remote in the meantime.
//!
//! After startup every local mutation launches a background full-collection
//! push. Pushes are not awaited, not retried and not ordered against each
//! other; the next mutation resends the current state. Their errors are
//! logged and discarded, and [`SyncCoordinator::flush`] lets callers (and
//! tests) observe the outcomes of pushes still being tracked.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::Task;
use crate::remote::RemoteClient;
use crate::storage::LocalStore;

/// What startup reconciliation decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The remote could not be reached; local state stands.
    Offline,
    /// The remote snapshot of this many tasks replaced the local collection.
    AdoptedRemote(usize),
    /// The remote was empty; this many local tasks were uploaded.
    PushedLocal(usize),
    /// Both sides were empty.
    BothEmpty,
}

pub struct SyncCoordinator {
    client: RemoteClient,
    connected: bool,
    runtime: Handle,
    in_flight: Mutex<Vec<JoinHandle<Result<()>>>>,
    attempts: AtomicUsize,
}

impl SyncCoordinator {
    /// Background pushes are spawned on `runtime`.
    pub fn new(client: RemoteClient, runtime: Handle) -> Self {
        Self {
            client,
            connected: false,
            runtime,
            in_flight: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Advisory: gates whether pushes are attempted, never whether a local
    /// mutation succeeds.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn client(&self) -> &RemoteClient {
        &self.client
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.client = self.client.clone().with_token(token);
    }

    /// Probes the remote and decides which side is authoritative.
    pub async fn reconcile_on_startup(&mut self, store: &mut LocalStore) -> Reconciliation {
        if let Err(e) = self.client.ping().await {
            info!(error = %e, "remote unreachable, running local-only");
            self.connected = false;
            return Reconciliation::Offline;
        }
        self.connected = true;

        let remote = match self.client.fetch_tasks(None).await {
            Ok(tasks) => tasks,
            Err(e) => {
                warn!(error = %e, "failed to fetch remote snapshot, running local-only");
                self.connected = false;
                return Reconciliation::Offline;
            }
        };

        if !remote.is_empty() {
            let count = remote.len();
            if let Err(e) = store.replace(remote) {
                warn!(error = %e, "failed to persist adopted remote snapshot");
            }
            info!(count, "adopted remote snapshot");
            Reconciliation::AdoptedRemote(count)
        } else if !store.tasks().is_empty() {
            let count = store.tasks().len();
            self.push_snapshot(store.tasks().to_vec());
            info!(count, "remote empty, uploading local tasks");
            Reconciliation::PushedLocal(count)
        } else {
            debug!("remote and local both empty");
            Reconciliation::BothEmpty
        }
    }

    /// Launches a full-collection replace without waiting for it.
    ///
    /// Returns whether a push was attempted (only while connected).
    pub fn push_snapshot(&self, tasks: Vec<Task>) -> bool {
        if !self.connected {
            debug!("not connected, skipping push");
            return false;
        }
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let client = self.client.clone();
        let handle = self.runtime.spawn(async move {
            let result = client.replace_all(&tasks).await;
            if let Err(e) = &result {
                warn!(error = %e, "background push failed, next change will resend");
            }
            result
        });
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.retain(|h| !h.is_finished());
        in_flight.push(handle);
        true
    }

    /// Number of pushes attempted since creation.
    pub fn push_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Waits for tracked pushes and returns their outcomes.
    pub async fn flush(&self) -> Vec<Result<()>> {
        let handles = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *in_flight)
        };
        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => outcomes.push(result),
                Err(e) => warn!(error = %e, "push task did not complete"),
            }
        }
        outcomes
    }
}
