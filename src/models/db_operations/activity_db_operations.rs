use crate::models::{ActivityAction, ActivityEntry, Choice};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Error as RusqliteError};

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<ActivityEntry> {
    let action_str: String = row.get(1)?;
    let created_at: String = row.get(5)?;
    let action = ActivityAction::parse_choice(&action_str).ok_or_else(|| {
        RusqliteError::FromSqlConversionFailure(1, rusqlite::types::Type::Text, format!("unknown action '{}'", action_str).into())
    })?;
    let timestamp = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RusqliteError::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e)))?;
    Ok(ActivityEntry {
        id: row.get(0)?,
        action,
        module: row.get(2)?,
        detail: row.get(3)?,
        actor: row.get(4)?,
        timestamp,
    })
}

/// Appends an entry and trims the log to the newest `cap` rows in one transaction.
pub fn append(
    conn: &mut Connection,
    action: ActivityAction,
    module: &str,
    detail: &str,
    actor: &str,
    cap: u32,
) -> Result<i64, RusqliteError> {
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO activity_logs (action, module, detail, actor, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![action.as_str(), module, detail, actor, Utc::now().to_rfc3339()],
    )?;
    let id = tx.last_insert_rowid();
    tx.execute(
        "DELETE FROM activity_logs WHERE id NOT IN (SELECT id FROM activity_logs ORDER BY id DESC LIMIT ?1)",
        [cap],
    )?;
    tx.commit()?;
    Ok(id)
}

/// Newest first.
pub fn read_recent(conn: &Connection, limit: u32) -> Result<Vec<ActivityEntry>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT id, action, module, detail, actor, created_at FROM activity_logs ORDER BY id DESC LIMIT ?1",
    )?;
    let entries = stmt.query_map([limit], row_to_entry)?;
    entries.collect()
}

/// Keeps the newest `keep` rows. Returns how many were removed.
pub fn prune(conn: &Connection, keep: u32) -> Result<usize, RusqliteError> {
    conn.execute(
        "DELETE FROM activity_logs WHERE id NOT IN (SELECT id FROM activity_logs ORDER BY id DESC LIMIT ?1)",
        [keep],
    )
}
