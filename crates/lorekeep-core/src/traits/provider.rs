// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for reasoning backends (Anthropic, etc.).

use async_trait::async_trait;

use crate::error::LorekeepError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ProviderRequest, ProviderResponse};

/// Adapter for a language model used by the reasoning extraction strategy.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Sends a completion request and returns the full response.
    ///
    /// Transport and availability failures are returned as
    /// [`LorekeepError::Provider`].
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, LorekeepError>;
}
