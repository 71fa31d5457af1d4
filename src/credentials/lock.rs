// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The `locked-for-watcher` annotation protocol.
//!
//! The pre-deploy hook snapshots a live secret into its shadow and then locks it.
//! Only actualization unlocks it again, after the shadow caught up with the live data.

use crate::constants::annotations::LOCKED_FOR_WATCHER;
use crate::credentials::{shadow_name, CredentialManager};
use crate::error::{CredentialError, Result};
use k8s_openapi::api::core::v1::Secret;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked,
}

impl LockState {
    /// Only an explicit "true" locks; a missing annotation reads as unlocked
    pub fn of(secret: &Secret) -> Self {
        let locked = secret
            .metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(LOCKED_FOR_WATCHER))
            .is_some_and(|v| v == "true");
        if locked {
            LockState::Locked
        } else {
            LockState::Unlocked
        }
    }

    pub fn is_locked(self) -> bool {
        self == LockState::Locked
    }

    fn annotation_value(self) -> &'static str {
        match self {
            LockState::Locked => "true",
            LockState::Unlocked => "false",
        }
    }
}

pub fn is_locked(secret: &Secret) -> bool {
    LockState::of(secret).is_locked()
}

/// Write the lock annotation, creating the annotation map if needed
pub fn set_lock_state(secret: &mut Secret, state: LockState) {
    secret
        .metadata
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(LOCKED_FOR_WATCHER.to_string(), state.annotation_value().to_string());
}

impl CredentialManager {
    /// Copy every live secret into its shadow and lock it for the watchers.
    ///
    /// Missing and already locked secrets are skipped. The first failure aborts the call.
    #[instrument(skip(self, names))]
    pub async fn snapshot_and_lock<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        for name in names {
            self.snapshot_and_lock_one(name.as_ref()).await?;
        }
        Ok(())
    }

    async fn snapshot_and_lock_one(&self, name: &str) -> Result<()> {
        let shadow_name = shadow_name(name);
        info!("Snapshot of secret {} into {} started", name, shadow_name);

        let mut live = match self.store.get(name).await {
            Ok(secret) => secret,
            Err(CredentialError::NotFound(_)) => {
                info!("Secret {} is not found, skipping", name);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if is_locked(&live) {
            info!("Secret {} is locked, rotation already in progress, skipping", name);
            return Ok(());
        }

        // The shadow must hold the pre-rotation copy before anyone can observe the lock
        match self.store.get(&shadow_name).await {
            Ok(mut shadow) => {
                shadow.data = live.data.clone();
                shadow.metadata.labels = live.metadata.labels.clone();
                self.store.update(&shadow).await?;
                debug!("Shadow secret {} updated", shadow_name);
            }
            Err(CredentialError::NotFound(_)) => {
                let mut shadow = self.new_shadow(name, live.metadata.labels.clone());
                shadow.data = live.data.clone();
                self.store.create(&shadow).await?;
                debug!("Shadow secret {} created", shadow_name);
            }
            Err(e) => return Err(e),
        }

        set_lock_state(&mut live, LockState::Locked);
        self.store.update(&live).await?;
        info!("Secret {} locked", name);
        Ok(())
    }

    /// Clear the lock on the live secret. Only actualization may call this.
    pub(crate) async fn unlock(&self, name: &str) -> Result<()> {
        let mut live = self.store.get(name).await?;
        set_lock_state(&mut live, LockState::Unlocked);
        self.store.update(&live).await?;
        info!("Secret {} unlocked", name);
        Ok(())
    }
}
