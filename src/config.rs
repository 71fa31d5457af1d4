// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{labels, DEFAULT_HOOK_NAME, MANAGER_NAME, NAMESPACE_FILE};
use crate::constants::timeouts::REQUEST_TIMEOUT_SECS;
use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use std::{env, fs};

/// Credential manager configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Live secrets whose rotation is coordinated
    pub secret_names: Vec<String>,
    /// Name prefix of the hook objects removed by the cleanup routine
    pub hook_name: String,
    /// Run the pre-deploy snapshot-and-lock step instead of the cleanup
    pub is_hook: bool,
    pub namespace: String,
    pub session_id: Option<String>,
    pub application_name: Option<String>,
    /// Bounded timeout for every object store request
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::load(Path::new(NAMESPACE_FILE), |key| env::var(key).ok())
    }

    fn load(namespace_file: &Path, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let secret_names = var("SECRET_NAMES")
            .map(|names| parse_secret_names(&names))
            .unwrap_or_default();

        let hook_name = var("HOOK_NAME")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_HOOK_NAME.to_string());

        let is_hook = match var("IS_HOOK").filter(|v| !v.is_empty()) {
            Some(v) => v
                .parse::<bool>()
                .with_context(|| format!("IS_HOOK must be true or false, got '{}'", v))?,
            None => false,
        };

        let namespace = resolve_namespace(namespace_file, var("NAMESPACE"))?;

        let request_timeout = match var("REQUEST_TIMEOUT_SECS").filter(|v| !v.is_empty()) {
            Some(v) => v
                .parse::<u64>()
                .with_context(|| format!("REQUEST_TIMEOUT_SECS is not a number: '{}'", v))?,
            None => REQUEST_TIMEOUT_SECS,
        };

        Ok(Config {
            secret_names,
            hook_name,
            is_hook,
            namespace,
            session_id: lowercase_var(&var, "SESSION_ID"),
            application_name: lowercase_var(&var, "APPLICATION_NAME"),
            request_timeout: Duration::from_secs(request_timeout),
        })
    }

    /// Provenance labels for shadow secrets created by this process
    pub fn shadow_labels(&self) -> BTreeMap<String, String> {
        let mut result = BTreeMap::from([(labels::MANAGED_BY.to_string(), MANAGER_NAME.to_string())]);
        if let Some(session_id) = &self.session_id {
            result.insert(labels::SESSION_ID.to_string(), session_id.clone());
        }
        if let Some(application_name) = &self.application_name {
            result.insert(labels::PART_OF.to_string(), application_name.clone());
        }
        result
    }
}

fn parse_secret_names(names: &str) -> Vec<String> {
    names
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn lowercase_var(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    var(key)
        .map(|v| v.to_lowercase())
        .filter(|v| !v.is_empty())
}

/// The service account namespace wins over the NAMESPACE fallback
fn resolve_namespace(namespace_file: &Path, fallback: Option<String>) -> Result<String> {
    if let Ok(contents) = fs::read_to_string(namespace_file) {
        let namespace = contents.trim();
        if !namespace.is_empty() {
            return Ok(namespace.to_string());
        }
    }
    match fallback.filter(|ns| !ns.is_empty()) {
        Some(namespace) => Ok(namespace),
        None => bail!(
            "namespace can't be extracted from {} and NAMESPACE is not set",
            namespace_file.display()
        ),
    }
}
