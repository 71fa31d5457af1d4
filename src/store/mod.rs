// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespaced secret storage with watch support.

pub mod kube_store;

pub use kube_store::KubeSecretStore;

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use k8s_openapi::api::core::v1::Secret;

/// An update observed on a watched secret
#[derive(Debug, Clone)]
pub struct SecretEvent {
    pub previous: Secret,
    pub current: Secret,
}

/// Stream of updates for one watched secret
pub type SecretEventStream = BoxStream<'static, Result<SecretEvent>>;

/// Read/write/watch access to the secrets of a single namespace.
///
/// `get` reports an absent object as [`CredentialError::NotFound`](crate::error::CredentialError::NotFound);
/// every other failure is a store access error.
#[async_trait]
pub trait SecretStore: Send + Sync {
    fn namespace(&self) -> &str;

    async fn get(&self, name: &str) -> Result<Secret>;

    async fn create(&self, secret: &Secret) -> Result<()>;

    /// Replace the stored object with `secret`
    async fn update(&self, secret: &Secret) -> Result<()>;

    async fn list(&self, field_selector: &str) -> Result<Vec<Secret>>;

    /// Subscribe to updates of the named secret. The stream is not restartable once closed.
    async fn watch(&self, name: &str) -> Result<SecretEventStream>;
}
