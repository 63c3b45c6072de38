// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Lorekeep integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - Mock reasoning provider with pre-configured replies
//! - [`MockValidator`] - Mock deep validator with scripted verdicts
//! - [`TestHarness`] - Temp database, capture path and both workers

pub mod harness;
pub mod mock_provider;
pub mod mock_validator;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_provider::MockProvider;
pub use mock_validator::MockValidator;
