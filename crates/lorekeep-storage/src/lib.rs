// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Lorekeep.
//!
//! Provides WAL-mode SQLite storage with embedded migrations and typed
//! operations for conversations, messages, the durable job queue,
//! sanitization findings and learnings. Several handles (and several
//! processes) may share one database file; every cross-row invariant is
//! enforced inside a single transaction or statement.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::{Database, DatabaseOptions};
pub use models::*;
