// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background workers for Lorekeep.
//!
//! A [`Worker`] polls the job queue for the job types of one [`JobHandler`]
//! and runs it under the execution contract in [`harness`]. Two handlers
//! exist: [`SanitizationHandler`] audits stored messages with a deep
//! validator and [`LearningHandler`] derives learnings from conversations.
//! Any number of worker processes may share one database.

pub mod harness;
pub mod learning;
pub mod sanitization;
pub mod shutdown;

pub use harness::{JobHandler, JobOutcome, Tick, Worker};
pub use learning::LearningHandler;
pub use sanitization::SanitizationHandler;
pub use shutdown::install_signal_handler;
