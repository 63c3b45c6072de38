// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Storage, provider and validator adapters extend the [`PluginAdapter`]
//! base trait and use `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod extraction;
pub mod provider;
pub mod storage;
pub mod validator;

// Re-export all traits at the traits module level for convenience.
pub use adapter::PluginAdapter;
pub use extraction::ExtractionStrategy;
pub use provider::ProviderAdapter;
pub use storage::StorageAdapter;
pub use validator::DeepValidator;
