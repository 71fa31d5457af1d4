// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Shadow secret bookkeeping: change detection, the lock protocol and actualization.

pub mod actualize;
pub mod hash;
pub mod lock;

pub use actualize::CredentialMigration;
pub use hash::{data_hash, fields_changed};
pub use lock::LockState;

use crate::constants::SHADOW_SUFFIX;
use crate::error::Result;
use crate::store::SecretStore;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Name of the shadow secret holding the last actualized copy of `name`
pub fn shadow_name(name: &str) -> String {
    format!("{}{}", name, SHADOW_SUFFIX)
}

/// Entry point for everything that reads or writes live and shadow secrets
pub struct CredentialManager {
    store: Arc<dyn SecretStore>,
    /// Labels put on shadow secrets created during actualization
    labels: BTreeMap<String, String>,
}

impl CredentialManager {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self {
            store,
            labels: BTreeMap::new(),
        }
    }

    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    fn new_shadow(&self, name: &str, labels: Option<BTreeMap<String, String>>) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some(shadow_name(name)),
                namespace: Some(self.store.namespace().to_string()),
                labels,
                ..Default::default()
            },
            type_: Some("Opaque".to_string()),
            ..Default::default()
        }
    }

    /// True if any of the secrets differs from its shadow
    #[instrument(skip(self, names))]
    pub async fn are_changed<S: AsRef<str>>(&self, names: &[S]) -> Result<bool> {
        for name in names {
            let name = name.as_ref();
            let current = self.store.get(name).await?;
            let previous = self.store.get(&shadow_name(name)).await?;
            if fields_changed(previous.data.as_ref(), current.data.as_ref()) {
                info!("Credentials of secret {} changed", name);
                return Ok(true);
            }
        }
        debug!("No credential changes found");
        Ok(false)
    }

    /// Hand the shadow secrets over to `owner_references` so they are collected with the owner
    #[instrument(skip(self, names, owner_references))]
    pub async fn set_owner_references<S: AsRef<str>>(
        &self,
        names: &[S],
        owner_references: &[OwnerReference],
    ) -> Result<()> {
        for name in names {
            let mut shadow = self.store.get(&shadow_name(name.as_ref())).await?;
            shadow.metadata.owner_references = Some(owner_references.to_vec());
            self.store.update(&shadow).await?;
            debug!("Owner references set on shadow of secret {}", name.as_ref());
        }
        Ok(())
    }
}
