// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Credential change watching.

pub mod filter;
pub mod registry;

pub use filter::{classify_event, EventDecision};
pub use registry::{ReconcileTrigger, WatchRegistry};
