// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes client creation

use crate::error::{CredentialError, Result};
use kube::{Client, Config as KConfig};
use std::time::Duration;
use tracing::{debug, instrument};

/// Create a client from the in-cluster service account or the local kubeconfig,
/// bounding connects and reads by `timeout`
#[instrument]
pub async fn create_client(timeout: Duration) -> Result<Client> {
    let config = KConfig::infer()
        .await
        .map_err(|e| CredentialError::KubeconfigError(format!("Failed to infer config: {}", e)))?;
    let config = with_timeout(config, timeout);

    debug!("Connecting to Kubernetes API at {}", config.cluster_url);

    Client::try_from(config)
        .map_err(|e| CredentialError::KubeconfigError(format!("Failed to create client: {}", e)))
}

fn with_timeout(mut config: KConfig, timeout: Duration) -> KConfig {
    config.connect_timeout = Some(timeout);
    config.read_timeout = Some(timeout);
    config
}
