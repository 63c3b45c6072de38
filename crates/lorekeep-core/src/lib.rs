// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Lorekeep.
//!
//! This crate provides the error type, the domain types (conversations,
//! messages, jobs, findings, learnings), typed job payloads and the adapter
//! traits the store, the workers and the entry point are written against.

pub mod error;
pub mod job;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::LorekeepError;
pub use job::JobPayload;
pub use types::{AdapterType, HealthStatus, JobStatus, JobType};

// Re-export all adapter traits at crate root.
pub use traits::{
    DeepValidator, ExtractionStrategy, PluginAdapter, ProviderAdapter, StorageAdapter,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lorekeep_error_has_all_variants() {
        let _config = LorekeepError::Config("test".into());
        let _storage = LorekeepError::storage(std::io::Error::other("test"));
        let _provider = LorekeepError::Provider {
            message: "test".into(),
            source: None,
        };
        let _validator = LorekeepError::Validator {
            message: "test".into(),
            source: None,
        };
        let _payload = LorekeepError::MalformedPayload {
            job_type: "extract".into(),
            message: "missing field".into(),
        };
        let _not_found = LorekeepError::NotFound {
            entity: "message",
            id: "m1".into(),
        };
        let _timeout = LorekeepError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = LorekeepError::Internal("test".into());
    }

    #[test]
    fn adapter_type_round_trips() {
        use std::str::FromStr;

        for variant in [
            AdapterType::Storage,
            AdapterType::Provider,
            AdapterType::Validator,
        ] {
            let s = variant.to_string();
            assert_eq!(AdapterType::from_str(&s).expect("should parse back"), variant);
        }
    }

    #[test]
    fn health_status_variants() {
        let healthy = HealthStatus::Healthy;
        assert_ne!(HealthStatus::Degraded("slow".into()), healthy);
        assert_ne!(HealthStatus::Unhealthy("down".into()), healthy);
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
        fn _assert_provider_adapter<T: ProviderAdapter>() {}
        fn _assert_deep_validator<T: DeepValidator>() {}
        fn _assert_extraction_strategy<T: ExtractionStrategy>() {}
    }
}
