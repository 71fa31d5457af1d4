// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod config;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod hook;
pub mod kubernetes;
pub mod store;
pub mod sync;
pub mod watch;

#[cfg(test)]
mod test_utils;
