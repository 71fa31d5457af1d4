// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Decides which secret updates are real credential changes.

use crate::credentials::fields_changed;
use crate::credentials::lock::is_locked;
use crate::store::SecretEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDecision {
    /// A rotation is being staged, the data is not meant to be observed yet
    Locked,
    /// The unlock written by actualization itself
    JustUnlocked,
    /// Credential data changed outside a rotation
    Changed,
    Unchanged,
}

impl EventDecision {
    pub fn should_reconcile(self) -> bool {
        self == EventDecision::Changed
    }
}

pub fn classify_event(event: &SecretEvent) -> EventDecision {
    if is_locked(&event.current) {
        EventDecision::Locked
    } else if is_locked(&event.previous) {
        EventDecision::JustUnlocked
    } else if fields_changed(event.previous.data.as_ref(), event.current.data.as_ref()) {
        EventDecision::Changed
    } else {
        EventDecision::Unchanged
    }
}
