// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Secret {0} not found")]
    NotFound(String),

    #[error("Secret store access failed: {0}")]
    StoreAccess(String),

    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Failed to configure Kubernetes client: {0}")]
    KubeconfigError(String),

    #[error("Precondition failed: {0}")]
    PreconditionError(String),

    #[error("Migration of secret {name} failed: {reason:#}")]
    MigrationError { name: String, reason: anyhow::Error },

    #[error("Failed to hash secret data: {0}")]
    HashError(#[from] serde_json::Error),
}

impl CredentialError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CredentialError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, CredentialError>;
