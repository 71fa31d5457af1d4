// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Kubernetes annotation keys used by the credential manager
pub mod annotations {
    /// Set to "true" on a live secret while a rotation is being staged
    pub const LOCKED_FOR_WATCHER: &str = "locked-for-watcher";
    /// Prefix of the pod template checksum annotations, suffixed with the secret index
    pub const CHECKSUM_PREFIX: &str = "checksum/secret";
}

/// Provenance labels put on shadow secrets
pub mod labels {
    pub const MANAGED_BY: &str = "app.kubernetes.io/managed-by";
    pub const PART_OF: &str = "app.kubernetes.io/part-of";
    pub const SESSION_ID: &str = "deployment.netcracker.com/sessionId";
}

/// The name written into the managed-by label
pub const MANAGER_NAME: &str = "credential-manager";

/// Suffix appended to a live secret name to get its shadow secret
pub const SHADOW_SUFFIX: &str = "-old";

/// Name prefix of the hook Jobs and Pods removed by the cleanup routine
pub const DEFAULT_HOOK_NAME: &str = "credentials-saver";

/// Where the in-cluster service account exposes its namespace
pub const NAMESPACE_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

/// Object store timeouts
pub mod timeouts {
    /// Default request timeout in seconds
    pub const REQUEST_TIMEOUT_SECS: u64 = 60;
    /// The server closes a watch this many seconds before the client read timeout fires
    pub const WATCH_TIMEOUT_MARGIN_SECS: u64 = 5;
    /// Upper bound the API server accepts for a watch timeout
    pub const WATCH_TIMEOUT_MAX_SECS: u64 = 290;
}
