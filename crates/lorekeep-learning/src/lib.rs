// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Learning extraction strategies.
//!
//! [`HeuristicStrategy`] works offline; [`ReasoningStrategy`] asks a
//! reasoning provider and falls back to the heuristic when the provider is
//! unavailable or replies with something unusable.

pub mod heuristic;
pub mod reasoning;

use std::sync::Arc;

use lorekeep_config::model::ExtractionConfig;
use lorekeep_core::traits::{ExtractionStrategy, ProviderAdapter};
use tracing::info;

pub use heuristic::HeuristicStrategy;
pub use reasoning::ReasoningStrategy;

/// Pick the extraction strategy for `config`.
///
/// Reasoning is used only when it is enabled and a provider is available.
pub fn strategy_from_config(
    config: &ExtractionConfig,
    provider: Option<Arc<dyn ProviderAdapter>>,
) -> Arc<dyn ExtractionStrategy> {
    match provider {
        Some(provider) if config.reasoning_enabled => {
            info!(model = %config.model, "using reasoning extraction");
            Arc::new(ReasoningStrategy::new(
                provider,
                config.model.clone(),
                config.max_tokens,
            ))
        }
        _ => {
            info!("using heuristic extraction");
            Arc::new(HeuristicStrategy)
        }
    }
}
