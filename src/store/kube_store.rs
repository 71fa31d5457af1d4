// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes backed secret store

use crate::constants::timeouts::{
    REQUEST_TIMEOUT_SECS, WATCH_TIMEOUT_MARGIN_SECS, WATCH_TIMEOUT_MAX_SECS,
};
use crate::error::{CredentialError, Result};
use crate::kubernetes::create_client;
use crate::store::{SecretEvent, SecretEventStream, SecretStore};
use async_trait::async_trait;
use futures::{future, Stream, StreamExt};
use k8s_openapi::api::core::v1::Secret;
use kube::{
    api::{ListParams, PostParams},
    Api, Client, ResourceExt,
};
use kube_runtime::{watcher, WatchStreamExt};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

/// Secret store over the Kubernetes API of one namespace.
///
/// The client is created on first use unless one is handed in up front.
pub struct KubeSecretStore {
    namespace: String,
    request_timeout: Duration,
    client: OnceCell<Client>,
}

impl KubeSecretStore {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            client: OnceCell::new_with(Some(client)),
        }
    }

    pub fn lazy(namespace: &str, request_timeout: Duration) -> Self {
        Self {
            namespace: namespace.to_string(),
            request_timeout,
            client: OnceCell::new(),
        }
    }

    /// The shared client, connecting on the first call
    pub async fn client(&self) -> Result<Client> {
        self.client
            .get_or_try_init(|| create_client(self.request_timeout))
            .await
            .cloned()
    }

    async fn api(&self) -> Result<Api<Secret>> {
        Ok(Api::namespaced(self.client().await?, &self.namespace))
    }

    fn watcher_config(&self, name: &str) -> watcher::Config {
        let timeout = self
            .request_timeout
            .as_secs()
            .saturating_sub(WATCH_TIMEOUT_MARGIN_SECS)
            .clamp(1, WATCH_TIMEOUT_MAX_SECS);
        watcher::Config::default()
            .fields(&format!("metadata.name={}", name))
            .timeout(timeout as u32)
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    #[instrument(skip(self), fields(namespace = %self.namespace))]
    async fn get(&self, name: &str) -> Result<Secret> {
        self.api()
            .await?
            .get(name)
            .await
            .map_err(|e| store_error("get", name, e))
    }

    #[instrument(skip(self, secret), fields(namespace = %self.namespace, secret = %secret.name_any()))]
    async fn create(&self, secret: &Secret) -> Result<()> {
        self.api()
            .await?
            .create(&PostParams::default(), secret)
            .await
            .map_err(|e| store_error("create", &secret.name_any(), e))?;
        debug!("Secret created");
        Ok(())
    }

    #[instrument(skip(self, secret), fields(namespace = %self.namespace, secret = %secret.name_any()))]
    async fn update(&self, secret: &Secret) -> Result<()> {
        let name = secret.name_any();
        self.api()
            .await?
            .replace(&name, &PostParams::default(), secret)
            .await
            .map_err(|e| store_error("update", &name, e))?;
        debug!("Secret updated");
        Ok(())
    }

    #[instrument(skip(self), fields(namespace = %self.namespace))]
    async fn list(&self, field_selector: &str) -> Result<Vec<Secret>> {
        let secrets = self
            .api()
            .await?
            .list(&ListParams::default().fields(field_selector))
            .await
            .map_err(|e| store_error("list", field_selector, e))?;
        Ok(secrets.items)
    }

    async fn watch(&self, name: &str) -> Result<SecretEventStream> {
        // Failed list/watch calls are retried with exponential backoff
        let events = watcher(self.api().await?, self.watcher_config(name)).default_backoff();
        Ok(pair_events(events, name.to_string()))
    }
}

/// Turn raw watch events into `(previous, current)` pairs.
///
/// The first object seen only seeds the previous snapshot, a delete forgets it.
fn pair_events<S>(events: S, name: String) -> SecretEventStream
where
    S: Stream<Item = std::result::Result<watcher::Event<Secret>, watcher::Error>> + Send + 'static,
{
    events
        .scan(None::<Secret>, move |last, event| {
            let item = match event {
                Ok(watcher::Event::Apply(current)) | Ok(watcher::Event::InitApply(current)) => last
                    .replace(current.clone())
                    .map(|previous| Ok(SecretEvent { previous, current })),
                Ok(watcher::Event::Delete(_)) => {
                    *last = None;
                    None
                }
                Ok(watcher::Event::Init) | Ok(watcher::Event::InitDone) => None,
                Err(e) => Some(Err(CredentialError::StoreAccess(format!(
                    "watch on secret {} failed: {}",
                    name, e
                )))),
            };
            future::ready(Some(item))
        })
        .filter_map(future::ready)
        .boxed()
}

fn store_error(action: &str, name: &str, err: kube::Error) -> CredentialError {
    match err {
        kube::Error::Api(response) if response.code == 404 => {
            CredentialError::NotFound(name.to_string())
        }
        e => CredentialError::StoreAccess(format!("failed to {} secret {}: {}", action, name, e)),
    }
}
