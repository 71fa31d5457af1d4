// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use credential_manager::config::Config;
use credential_manager::credentials::CredentialManager;
use credential_manager::hook::clear_hooks;
use credential_manager::store::KubeSecretStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting credential manager");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: namespace={}, secrets={:?}, hook={}",
        config.namespace, config.secret_names, config.is_hook
    );

    // Connects on first use
    let store = Arc::new(KubeSecretStore::lazy(
        &config.namespace,
        config.request_timeout,
    ));

    if config.is_hook {
        info!("Running pre-deploy hook: snapshotting and locking credentials");
        let manager = CredentialManager::new(store).with_labels(config.shadow_labels());
        manager.snapshot_and_lock(&config.secret_names).await?;
        info!("Credentials snapshotted and locked");
    } else {
        info!("Removing hook objects with prefix {}", config.hook_name);
        let client = store.client().await?;
        clear_hooks(&client, &config.namespace, &config.hook_name).await?;
        info!("Hook objects removed");
    }

    Ok(())
}
