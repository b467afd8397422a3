use crate::models::db_operations::resource_db_operations::table_for;
use crate::models::ResourceKind;
use redb::{CommitError, Database, StorageError, TableError, TransactionError};
use rusqlite::Connection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("Redb storage error: {0}")]
    RedbStorage(#[from] StorageError),
    #[error("Redb transaction error: {0}")]
    RedbTransaction(#[from] TransactionError),
    #[error("Redb table error: {0}")]
    RedbTable(#[from] TableError),
    #[error("Redb commit error: {0}")]
    RedbCommit(#[from] CommitError),
}

pub fn setup_activity_db(conn: &mut Connection) -> Result<(), SetupError> {
    let tx = conn.transaction()?;
    log::info!("Creating 'activity_logs' table...");
    tx.execute(
        "CREATE TABLE IF NOT EXISTS activity_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            action TEXT NOT NULL CHECK(action IN ('create', 'update', 'delete')),
            module TEXT NOT NULL,
            detail TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    tx.commit()?;
    Ok(())
}

/// Opens (creating if missing) one table per resource kind.
pub fn setup_resources_db(db: &Database) -> Result<(), SetupError> {
    let write_txn = db.begin_write()?;
    {
        for kind in ResourceKind::ALL {
            log::info!("Creating '{}' table in Redb...", kind.table_name());
            write_txn.open_table(table_for(kind))?;
        }
    }
    write_txn.commit()?;
    Ok(())
}
