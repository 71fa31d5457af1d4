// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! One long-lived watch per secret name, each firing a reconcile trigger on real changes.

use crate::error::{CredentialError, Result};
use crate::store::{SecretEvent, SecretEventStream, SecretStore};
use crate::watch::filter::{classify_event, EventDecision};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Callback fired when a watched secret's credentials change
pub type ReconcileTrigger = Arc<dyn Fn() + Send + Sync>;

struct Registration {
    id: u64,
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

type Registrations = Arc<Mutex<HashMap<String, Registration>>>;

/// Keeps at most one active watch per secret name.
///
/// The first registrant of a name wins: registering it again while its watch is
/// running is a no-op and does not replace the trigger.
#[derive(Clone)]
pub struct WatchRegistry {
    store: Arc<dyn SecretStore>,
    watchers: Registrations,
    next_id: Arc<AtomicU64>,
}

impl WatchRegistry {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self {
            store,
            watchers: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start watching every name that is not watched yet.
    ///
    /// Fails on the first invalid name or watch that cannot be opened; watches opened
    /// before the failure keep running.
    #[instrument(skip(self, names, on_change))]
    pub async fn register<S: AsRef<str>>(&self, names: &[S], on_change: ReconcileTrigger) -> Result<()> {
        for name in names {
            let name = name.as_ref();
            if name.trim().is_empty() {
                return Err(CredentialError::PreconditionError(
                    "cannot watch a secret without a name".to_string(),
                ));
            }

            if self.watchers.lock().await.contains_key(name) {
                info!("Active watcher for secret {} already exists", name);
                continue;
            }

            // Opened without holding the registry lock
            let events = self.store.watch(name).await?;

            let mut watchers = self.watchers.lock().await;
            if watchers.contains_key(name) {
                debug!("Secret {} was registered concurrently, dropping duplicate watch", name);
                continue;
            }
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let (stop_tx, stop_rx) = oneshot::channel();
            let task = tokio::spawn(run_watcher(
                name.to_string(),
                id,
                events,
                stop_rx,
                Arc::clone(&on_change),
                Arc::clone(&self.watchers),
            ));
            watchers.insert(name.to_string(), Registration { id, stop_tx, task });
            info!("Watcher for secret {} registered", name);
        }
        Ok(())
    }

    /// Stop the watch of `name` and wait for its task. Returns false if none was running.
    ///
    /// The name is free for a new registration as soon as this returns.
    pub async fn stop(&self, name: &str) -> bool {
        let registration = self.watchers.lock().await.remove(name);
        match registration {
            Some(registration) => {
                shutdown(name, registration).await;
                true
            }
            None => false,
        }
    }

    pub async fn stop_all(&self) {
        let registrations: Vec<_> = self.watchers.lock().await.drain().collect();
        for (name, registration) in registrations {
            shutdown(&name, registration).await;
        }
    }

    pub async fn is_watching(&self, name: &str) -> bool {
        self.watchers.lock().await.contains_key(name)
    }

}

async fn shutdown(name: &str, registration: Registration) {
    // The task may already be gone if its stream ended
    let _ = registration.stop_tx.send(());
    if let Err(e) = registration.task.await {
        warn!("Watcher task for secret {} failed: {}", name, e);
    }
    info!("Watcher for secret {} stopped", name);
}

async fn run_watcher(
    name: String,
    id: u64,
    mut events: SecretEventStream,
    mut stop_rx: oneshot::Receiver<()>,
    on_change: ReconcileTrigger,
    watchers: Registrations,
) {
    info!("Credentials watcher for secret {} started", name);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            event = events.next() => match event {
                Some(Ok(event)) => handle_event(&name, &event, on_change.as_ref()),
                Some(Err(e)) => warn!("Skipping watch event for secret {}: {}", name, e),
                None => {
                    warn!("Watch stream for secret {} ended", name);
                    break;
                }
            },
        }
    }

    // Only drop our own entry, the name may have been registered again after a stop
    let mut watchers = watchers.lock().await;
    if watchers.get(&name).is_some_and(|r| r.id == id) {
        watchers.remove(&name);
    }
    info!("Credentials watcher for secret {} finished", name);
}

fn handle_event(name: &str, event: &SecretEvent, on_change: &(dyn Fn() + Send + Sync)) {
    let decision = classify_event(event);
    match decision {
        EventDecision::Locked => {
            info!("Secret {} is locked by the update job, skipping reconcile", name);
        }
        EventDecision::JustUnlocked => {
            info!("Secret {} was just unlocked, skipping reconcile", name);
        }
        EventDecision::Changed => {
            info!("New credentials found in secret {}, starting reconcile", name);
        }
        EventDecision::Unchanged => {
            debug!("Secret {} updated without credential changes", name);
        }
    }
    if decision.should_reconcile() {
        on_change();
    }
}
