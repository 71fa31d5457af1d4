// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Removal of finished hook Jobs and their Pods.

use crate::error::Result;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::{DeleteParams, ListParams},
    Api, Client, Resource, ResourceExt,
};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::{error, info, instrument};

/// Delete every Job and Pod in `namespace` whose name starts with `hook_name`
#[instrument(skip(client))]
pub async fn clear_hooks(client: &Client, namespace: &str, hook_name: &str) -> Result<()> {
    let jobs: Api<Job> = Api::namespaced(client.clone(), namespace);
    let pods: Api<Pod> = Api::namespaced(client.clone(), namespace);

    let job_names = hook_object_names(&jobs, "Job", hook_name).await?;
    let pod_names = hook_object_names(&pods, "Pod", hook_name).await?;

    delete_all(&jobs, "Job", &job_names, &DeleteParams::background()).await?;
    delete_all(&pods, "Pod", &pod_names, &DeleteParams::default()).await?;

    info!(
        "Removed {} hook jobs and {} hook pods",
        job_names.len(),
        pod_names.len()
    );
    Ok(())
}

async fn hook_object_names<K>(api: &Api<K>, kind: &str, hook_name: &str) -> Result<Vec<String>>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    let objects = api.list(&ListParams::default()).await.inspect_err(|e| {
        error!("Cannot get {} list: {}", kind, e);
    })?;

    Ok(objects
        .items
        .iter()
        .map(|o| o.name_any())
        .filter(|name| name.starts_with(hook_name))
        .collect())
}

async fn delete_all<K>(api: &Api<K>, kind: &str, names: &[String], params: &DeleteParams) -> Result<()>
where
    K: Resource + Clone + DeserializeOwned + Debug,
{
    for name in names {
        api.delete(name, params).await.inspect_err(|e| {
            error!("Cannot delete hook {} {}: {}", kind, name, e);
        })?;
        info!("Credential hook {} {} has been deleted", kind, name);
    }
    Ok(())
}
