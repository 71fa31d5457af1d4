// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Serialized actualization driven by watch triggers.

pub mod manager;

pub use manager::{ActualizationEvent, ActualizationHandle, ActualizationManager};
