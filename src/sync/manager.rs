// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Serializes actualization of the managed secrets.

use crate::credentials::{CredentialManager, CredentialMigration};
use crate::watch::ReconcileTrigger;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, instrument};

/// Events that watchers send to the ActualizationManager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActualizationEvent {
    /// Credentials of at least one managed secret changed
    CredentialsChanged,
}

/// Runs `actualize` for every managed secret, one pass at a time, so no two
/// actualizations of the same secret ever overlap.
pub struct ActualizationManager<M: CredentialMigration> {
    credentials: Arc<CredentialManager>,
    secret_names: Vec<String>,
    migration: Arc<M>,
    event_rx: mpsc::Receiver<ActualizationEvent>,
}

/// Handle to request an actualization pass
#[derive(Clone)]
pub struct ActualizationHandle {
    event_tx: mpsc::Sender<ActualizationEvent>,
}

impl ActualizationHandle {
    /// Request a pass. Requests made while one is already queued are merged into it.
    pub fn trigger(&self) {
        match self.event_tx.try_send(ActualizationEvent::CredentialsChanged) {
            Ok(()) => debug!("Actualization requested"),
            Err(TrySendError::Full(_)) => debug!("Actualization already pending"),
            Err(TrySendError::Closed(_)) => error!("ActualizationManager is not running"),
        }
    }

    /// A trigger for [`WatchRegistry::register`](crate::watch::WatchRegistry::register)
    pub fn reconcile_trigger(&self) -> ReconcileTrigger {
        let handle = self.clone();
        Arc::new(move || handle.trigger())
    }
}

impl<M: CredentialMigration> ActualizationManager<M> {
    pub fn new(
        credentials: Arc<CredentialManager>,
        secret_names: Vec<String>,
        migration: Arc<M>,
    ) -> (Self, ActualizationHandle) {
        let (event_tx, event_rx) = mpsc::channel(1);

        let manager = Self {
            credentials,
            secret_names,
            migration,
            event_rx,
        };

        let handle = ActualizationHandle { event_tx };
        (manager, handle)
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        info!("ActualizationManager started, performing initial actualization...");
        self.actualize_all().await;
        info!("Initial actualization complete, listening for events...");

        while let Some(event) = self.event_rx.recv().await {
            debug!("Handling event: {:?}", event);
            self.actualize_all().await;
        }

        Ok(())
    }

    /// Actualize every secret; a failure is logged and the remaining secrets still run
    #[instrument(skip(self))]
    async fn actualize_all(&self) -> usize {
        let mut failures = 0;
        for name in &self.secret_names {
            if let Err(e) = self
                .credentials
                .actualize(name, self.migration.as_ref())
                .await
            {
                error!("Failed to actualize secret {}: {}", name, e);
                failures += 1;
            }
        }
        failures
    }
}
