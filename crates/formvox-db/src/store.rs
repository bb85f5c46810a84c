//! Submitted answer sets.

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The session already has a stored submission.
    #[error("session {0} was already submitted")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// A stored answer set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSubmission {
    pub session_id: String,
    pub field_count: usize,
    pub values: BTreeMap<String, String>,
    /// UTC, `YYYY-MM-DDTHH:MM:SSZ`.
    pub submitted_at: String,
}

/// Stores the answers of `session_id`. Each session can be stored once.
pub fn insert_submission(
    conn: &Connection,
    session_id: &str,
    field_count: usize,
    values: &BTreeMap<String, String>,
) -> Result<(), StoreError> {
    let tx = conn.unchecked_transaction()?;
    let inserted = tx.execute(
        "INSERT INTO submissions (session_id, field_count) VALUES (?1, ?2)",
        params![session_id, field_count as i64],
    );
    match inserted {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            return Err(StoreError::Duplicate(session_id.to_string()));
        }
        Err(e) => return Err(e.into()),
    }

    {
        let mut stmt = tx.prepare(
            "INSERT INTO submission_answers (session_id, field_id, value) VALUES (?1, ?2, ?3)",
        )?;
        for (field_id, value) in values {
            stmt.execute(params![session_id, field_id, value])?;
        }
    }
    tx.commit()?;

    tracing::info!(session_id, answers = values.len(), "stored submission");
    Ok(())
}

/// Loads the answers of `session_id`, `None` if it never submitted.
pub fn get_submission(
    conn: &Connection,
    session_id: &str,
) -> Result<Option<StoredSubmission>, StoreError> {
    let header = conn
        .query_row(
            "SELECT field_count, submitted_at FROM submissions WHERE session_id = ?1",
            [session_id],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;
    let Some((field_count, submitted_at)) = header else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT field_id, value FROM submission_answers WHERE session_id = ?1 ORDER BY field_id",
    )?;
    let values = stmt
        .query_map([session_id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<BTreeMap<String, String>, _>>()?;

    Ok(Some(StoredSubmission {
        session_id: session_id.to_string(),
        field_count: field_count as usize,
        values,
        submitted_at,
    }))
}

/// Number of stored submissions.
pub fn count_submissions(conn: &Connection) -> Result<usize, StoreError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM submissions", [], |row| row.get(0))?;
    Ok(count as usize)
}
