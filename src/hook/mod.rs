// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Pre-deploy hook support.

pub mod cleanup;

pub use cleanup::clear_hooks;
