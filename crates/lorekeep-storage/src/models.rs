// SPDX-FileCopyrightText: 2026 Lorekeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types and column helpers shared by the query modules.

use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::Row;

pub use lorekeep_core::types::{
    Conversation, Job, JobCounts, JobStatus, Learning, LearningCategory, Message, Role,
    SanitizationFinding, StoreCounts,
};

/// Read a text column and parse it into an enum.
pub(crate) fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a JSON array column of strings.
pub(crate) fn json_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        correlation_key: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

pub(crate) fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        role: parse_column(row, 2)?,
        content: row.get(3)?,
        sequence: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub(crate) fn job_from_row(row: &Row<'_>) -> rusqlite::Result<Job> {
    Ok(Job {
        id: row.get(0)?,
        job_type: row.get(1)?,
        payload: row.get(2)?,
        status: parse_column(row, 3)?,
        attempts: row.get(4)?,
        max_attempts: row.get(5)?,
        error: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

pub(crate) fn finding_from_row(row: &Row<'_>) -> rusqlite::Result<SanitizationFinding> {
    Ok(SanitizationFinding {
        id: row.get(0)?,
        message_id: row.get(1)?,
        issues: json_column(row, 2)?,
        created_at: row.get(3)?,
    })
}

pub(crate) fn learning_from_row(row: &Row<'_>) -> rusqlite::Result<Learning> {
    Ok(Learning {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        category: parse_column(row, 2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        created_at: row.get(5)?,
    })
}
