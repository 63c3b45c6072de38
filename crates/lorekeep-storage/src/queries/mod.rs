// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules, one per stored entity.

pub mod conversations;
pub mod findings;
pub mod jobs;
pub mod learnings;
pub mod messages;
