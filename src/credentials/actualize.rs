// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Bring a shadow secret up to date with its live secret.

use crate::credentials::{fields_changed, shadow_name, CredentialManager};
use crate::error::{CredentialError, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use tracing::{debug, error, info, instrument};

/// Caller supplied step that moves dependent state (e.g. a database user) from the
/// `previous` credentials to the `current` ones.
///
/// A migration that succeeded may run again for the same change when persisting the
/// shadow afterwards fails, so implementations must be idempotent.
#[async_trait]
pub trait CredentialMigration: Send + Sync {
    async fn migrate(&self, current: &Secret, previous: &Secret) -> anyhow::Result<()>;
}

impl CredentialManager {
    /// Run one reconciliation pass for the live secret `name`.
    ///
    /// Order matters: migrate, then sync the shadow, then unlock. A failed migration
    /// leaves both the shadow and the lock untouched so the pass can be retried.
    #[instrument(skip(self, migration))]
    pub async fn actualize<M>(&self, name: &str, migration: &M) -> Result<()>
    where
        M: CredentialMigration + ?Sized,
    {
        let current = self.store.get(name).await?;
        let shadow_name = shadow_name(name);

        match self.store.get(&shadow_name).await {
            Ok(mut previous) => {
                if fields_changed(previous.data.as_ref(), current.data.as_ref()) {
                    info!("Credentials changed, starting migration");
                    migration
                        .migrate(&current, &previous)
                        .await
                        .map_err(|reason| CredentialError::MigrationError {
                            name: name.to_string(),
                            reason,
                        })?;

                    previous.data = current.data.clone();
                    self.store.update(&previous).await?;
                    info!("Shadow secret {} synced", shadow_name);
                } else {
                    debug!("Credentials unchanged");
                }
            }
            Err(CredentialError::NotFound(_)) => {
                info!("Shadow secret {} not found, seeding it from the live secret", shadow_name);
                let mut shadow = self.new_shadow(name, Some(self.labels.clone()));
                shadow.data = current.data.clone();
                self.store.create(&shadow).await?;
            }
            Err(e) => return Err(e),
        }

        self.unlock(name).await.inspect_err(|e| {
            error!("Credentials secret {} wasn't unlocked: {}", name, e);
        })
    }
}
