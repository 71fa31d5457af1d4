// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: an in-memory secret store and a mocked Kubernetes API.

use crate::constants::annotations::LOCKED_FOR_WATCHER;
use crate::error::{CredentialError, Result};
use crate::store::{SecretEvent, SecretEventStream, SecretStore};
use async_trait::async_trait;
use futures::channel::mpsc;
use futures::StreamExt;
use http::{Request, Response};
use http_body_util::BodyExt;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::client::Body;
use kube::{Client, ResourceExt};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// Build an Opaque secret in the "default" namespace
pub fn make_secret(name: &str, data: &[(&str, &str)]) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            ..Default::default()
        },
        data: Some(
            data.iter()
                .map(|(k, v)| (k.to_string(), ByteString(v.as_bytes().to_vec())))
                .collect(),
        ),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    }
}

/// Set the lock annotation to "true" or "false"
pub fn locked(mut secret: Secret, locked: bool) -> Secret {
    secret
        .metadata
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(LOCKED_FOR_WATCHER.to_string(), locked.to_string());
    secret
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    Create,
    Update,
    List,
    Watch,
}

type Subscriber = mpsc::UnboundedSender<Result<SecretEvent>>;

/// Secret store kept in memory. Updates are broadcast to open watches as
/// `(previous, current)` events, like the Kubernetes adapter does.
#[derive(Default)]
pub struct InMemorySecretStore {
    secrets: Mutex<BTreeMap<String, Secret>>,
    subscribers: Mutex<HashMap<String, Vec<Subscriber>>>,
    failures: Mutex<HashMap<(StoreOp, String), String>>,
    writes: Mutex<Vec<(StoreOp, String)>>,
    watches_opened: Mutex<HashMap<String, usize>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(self, secret: Secret) -> Self {
        self.put(secret);
        self
    }

    /// Store a secret without recording a write or notifying watches
    pub fn put(&self, secret: Secret) {
        self.secrets
            .lock()
            .unwrap()
            .insert(secret.name_any(), secret);
    }

    pub fn secret(&self, name: &str) -> Option<Secret> {
        self.secrets.lock().unwrap().get(name).cloned()
    }

    /// Make `op` on `name` fail with a store access error
    pub fn fail(&self, op: StoreOp, name: &str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert((op, name.to_string()), message.to_string());
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Successful creates and updates, in order
    pub fn writes(&self) -> Vec<(StoreOp, String)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn watches_opened(&self, name: &str) -> usize {
        self.watches_opened
            .lock()
            .unwrap()
            .get(name)
            .copied()
            .unwrap_or_default()
    }

    /// Push an event to every open watch of `name`
    pub fn emit(&self, name: &str, event: Result<SecretEvent>) {
        let mut event = Some(event);
        let mut subscribers = self.subscribers.lock().unwrap();
        if let Some(senders) = subscribers.get_mut(name) {
            let count = senders.len();
            for (i, sender) in senders.iter().enumerate() {
                let item = if i + 1 == count {
                    event.take()
                } else {
                    event.as_ref().map(clone_event)
                };
                if let Some(item) = item {
                    let _ = sender.unbounded_send(item);
                }
            }
        }
    }

    pub fn emit_update(&self, name: &str, previous: Secret, current: Secret) {
        self.emit(name, Ok(SecretEvent { previous, current }));
    }

    /// End every open watch of `name`
    pub fn close_watches(&self, name: &str) {
        self.subscribers.lock().unwrap().remove(name);
    }

    fn check(&self, op: StoreOp, name: &str) -> Result<()> {
        match self.failures.lock().unwrap().get(&(op, name.to_string())) {
            Some(message) => Err(CredentialError::StoreAccess(message.clone())),
            None => Ok(()),
        }
    }

    fn record(&self, op: StoreOp, name: &str) {
        self.writes.lock().unwrap().push((op, name.to_string()));
    }
}

fn clone_event(event: &Result<SecretEvent>) -> Result<SecretEvent> {
    match event {
        Ok(event) => Ok(event.clone()),
        Err(e) => Err(CredentialError::StoreAccess(e.to_string())),
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    fn namespace(&self) -> &str {
        "default"
    }

    async fn get(&self, name: &str) -> Result<Secret> {
        self.check(StoreOp::Get, name)?;
        self.secret(name)
            .ok_or_else(|| CredentialError::NotFound(name.to_string()))
    }

    async fn create(&self, secret: &Secret) -> Result<()> {
        let name = secret.name_any();
        self.check(StoreOp::Create, &name)?;
        let mut secrets = self.secrets.lock().unwrap();
        if secrets.contains_key(&name) {
            return Err(CredentialError::StoreAccess(format!("secret {} already exists", name)));
        }
        secrets.insert(name.clone(), secret.clone());
        drop(secrets);
        self.record(StoreOp::Create, &name);
        Ok(())
    }

    async fn update(&self, secret: &Secret) -> Result<()> {
        let name = secret.name_any();
        self.check(StoreOp::Update, &name)?;
        let mut secrets = self.secrets.lock().unwrap();
        let Some(previous) = secrets.get(&name).cloned() else {
            return Err(CredentialError::NotFound(name));
        };
        secrets.insert(name.clone(), secret.clone());
        drop(secrets);
        self.record(StoreOp::Update, &name);
        self.emit_update(&name, previous, secret.clone());
        Ok(())
    }

    async fn list(&self, field_selector: &str) -> Result<Vec<Secret>> {
        self.check(StoreOp::List, field_selector)?;
        let name = field_selector.strip_prefix("metadata.name=");
        Ok(self
            .secrets
            .lock()
            .unwrap()
            .values()
            .filter(|s| name.map_or(true, |n| s.name_any() == n))
            .cloned()
            .collect())
    }

    async fn watch(&self, name: &str) -> Result<SecretEventStream> {
        self.check(StoreOp::Watch, name)?;
        let (tx, rx) = mpsc::unbounded();
        self.subscribers
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .push(tx);
        *self
            .watches_opened
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default() += 1;
        Ok(rx.boxed())
    }
}

/// A request seen by the [`MockService`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: String,
}

/// A mock HTTP service that returns predefined responses based on request paths
/// and records every request it receives.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.on("DELETE", path, status, body)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        self.responses
            .lock()
            .unwrap()
            .get(&(method.to_string(), path.to_string()))
            .cloned()
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let query = req.uri().query().map(str::to_string);
        let response = self.find_response(&method, &path);
        let requests = Arc::clone(&self.requests);

        Box::pin(async move {
            let body = req.into_body().collect().await?.to_bytes();
            requests.lock().unwrap().push(RecordedRequest {
                method,
                path: path.clone(),
                query,
                body: String::from_utf8_lossy(&body).into_owned(),
            });

            let (status, body) = response.unwrap_or_else(|| {
                (404, status_json(404, "NotFound", &format!("{} not found", path)))
            });
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

pub fn secret_json(secret: &Secret) -> String {
    let mut value = serde_json::to_value(secret).unwrap();
    value["apiVersion"] = "v1".into();
    value["kind"] = "Secret".into();
    value.to_string()
}

/// A Kubernetes Status failure body
pub fn status_json(code: u16, reason: &str, message: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}
