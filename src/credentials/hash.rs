// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Secret data hashing and change detection.

use crate::constants::annotations::CHECKSUM_PREFIX;
use crate::credentials::CredentialManager;
use crate::error::Result;
use k8s_openapi::api::core::v1::PodTemplateSpec;
use k8s_openapi::ByteString;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

pub type SecretData = BTreeMap<String, ByteString>;

/// SHA-256 (hex) of the JSON encoded data map.
///
/// Keys serialize in lexicographic order and values as base64, so the digest only
/// depends on the content. Missing data hashes as `null`.
pub fn data_hash(data: Option<&SecretData>) -> Result<String> {
    let serialized = serde_json::to_vec(&data)?;
    Ok(format!("{:x}", Sha256::digest(&serialized)))
}

/// True when a field of `current` holds a different value than in `previous`.
///
/// A field missing from `previous` compares as empty; fields that only exist in
/// `previous` are not a change.
pub fn fields_changed(previous: Option<&SecretData>, current: Option<&SecretData>) -> bool {
    let Some(current) = current else {
        return false;
    };
    current.iter().any(|(field, value)| {
        let old = previous
            .and_then(|p| p.get(field))
            .map(|v| v.0.as_slice())
            .unwrap_or_default();
        old != value.0.as_slice()
    })
}

/// Annotation key for the secret at `index` of a checksum list
pub fn checksum_annotation(index: usize) -> String {
    format!("{}{}", CHECKSUM_PREFIX, index)
}

/// Merge `annotations` into the pod template, keeping unrelated keys
pub fn add_annotations_to_pod_template(
    template: &mut PodTemplateSpec,
    annotations: BTreeMap<String, String>,
) {
    template
        .metadata
        .get_or_insert_with(Default::default)
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .extend(annotations);
}

impl CredentialManager {
    /// Hash of the live secret's data
    pub async fn secret_hash(&self, name: &str) -> Result<String> {
        let secret = self.store.get(name).await?;
        data_hash(secret.data.as_ref())
    }

    /// Annotate the pod template with `checksum/secret<i>` for every secret so a
    /// credential change rolls the pods
    #[instrument(skip(self, names, template))]
    pub async fn compute_and_annotate<S: AsRef<str>>(
        &self,
        names: &[S],
        template: &mut PodTemplateSpec,
    ) -> Result<()> {
        for (index, name) in names.iter().enumerate() {
            let hash = self.secret_hash(name.as_ref()).await?;
            debug!("Secret {} hashes to {}", name.as_ref(), hash);
            add_annotations_to_pod_template(
                template,
                BTreeMap::from([(checksum_annotation(index), hash)]),
            );
        }
        Ok(())
    }
}
