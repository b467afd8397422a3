use crate::helper::form_helpers::JsonMap;
use crate::helper::verification_helpers::{self, Operation};
use crate::models::object_id::generate_object_id;
use crate::models::{EntityMeta, Resource, ResourceKind};
use chrono::Utc;
use redb::{CommitError, Database, ReadableTable, StorageError, TableDefinition, TableError, TransactionError};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Redb storage error: {0}")]
    RedbStorage(#[from] StorageError),
    #[error("Redb transaction error: {0}")]
    RedbTransaction(#[from] TransactionError),
    #[error("Redb table error: {0}")]
    RedbTable(#[from] TableError),
    #[error("Redb commit error: {0}")]
    RedbCommit(#[from] CommitError),
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("Storage verification failed: {0}")]
    Verification(String),
}

/// Result of a versioned update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome<R> {
    Updated(R),
    NotFound,
    Conflict { current: u64 },
}

/// One table per resource kind: 24-hex id -> entity JSON.
pub fn table_for(kind: ResourceKind) -> TableDefinition<'static, &'static str, &'static str> {
    TableDefinition::new(kind.table_name())
}

pub fn list<R: Resource>(db: &Database) -> Result<Vec<R>, DbError> {
    let read_txn = db.begin_read()?;
    let table = match read_txn.open_table(table_for(R::KIND)) {
        Ok(table) => table,
        Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut records = Vec::new();
    for row in table.iter()? {
        let (id, json) = row?;
        match serde_json::from_str::<R>(json.value()) {
            Ok(record) => records.push(record),
            Err(e) => log::warn!(
                "Skipping unreadable {} record {}: {}",
                R::KIND.module_name(),
                id.value(),
                e
            ),
        }
    }
    Ok(records)
}

pub fn find<R: Resource>(db: &Database, id: &str) -> Result<Option<R>, DbError> {
    let read_txn = db.begin_read()?;
    let table = match read_txn.open_table(table_for(R::KIND)) {
        Ok(table) => table,
        Err(TableError::TableDoesNotExist(_)) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let found = match table.get(id)? {
        Some(guard) => Some(serde_json::from_str(guard.value())?),
        None => None,
    };
    Ok(found)
}

pub fn count<R: Resource>(db: &Database) -> Result<u64, DbError> {
    let read_txn = db.begin_read()?;
    let n = match read_txn.open_table(table_for(R::KIND)) {
        Ok(table) => table.len()?,
        Err(TableError::TableDoesNotExist(_)) => 0,
        Err(e) => return Err(e.into()),
    };
    Ok(n)
}

/// Assigns a fresh id, timestamps and version 1, then persists the record.
/// Nothing is committed unless the insert acknowledgement verifies.
pub fn create<R: Resource>(db: &Database, mut entity: R) -> Result<R, DbError> {
    let now = Utc::now();
    let id = generate_object_id();
    {
        let meta = entity.meta_mut();
        meta.id = id.clone();
        meta.created_at = now;
        meta.updated_at = now;
        meta.version = 1;
    }
    let entity_json = serde_json::to_string(&entity)?;

    let write_txn = db.begin_write()?;
    let ack = {
        let mut table = write_txn.open_table(table_for(R::KIND))?;
        let collided = table.get(id.as_str())?.is_some();
        if collided {
            json!({ "acknowledged": true })
        } else {
            table.insert(id.as_str(), entity_json.as_str())?;
            json!({ "acknowledged": true, "insertedId": id })
        }
    };

    let check = verification_helpers::verify(Operation::Create, &ack);
    if !check.success {
        log::error!("{} create failed verification: {}", R::KIND.module_name(), check.message);
        write_txn.abort()?;
        return Err(DbError::Verification(check.message));
    }
    write_txn.commit()?;
    Ok(entity)
}

/// Merges `patch` over the stored record. Store-owned keys in the patch are ignored.
/// When `expected_version` is given it must match the stored version.
pub fn update<R: Resource>(
    db: &Database,
    id: &str,
    patch: &JsonMap,
    expected_version: Option<u64>,
) -> Result<UpdateOutcome<R>, DbError> {
    let write_txn = db.begin_write()?;
    let (updated, ack) = {
        let mut table = write_txn.open_table(table_for(R::KIND))?;

        let existing: R = match table.get(id)? {
            Some(guard) => serde_json::from_str(guard.value())?,
            None => return Ok(UpdateOutcome::NotFound),
        };

        let current = existing.meta().version;
        if let Some(expected) = expected_version {
            if expected != current {
                return Ok(UpdateOutcome::Conflict { current });
            }
        }

        let mut merged = serde_json::to_value(&existing)?;
        if let Value::Object(target) = &mut merged {
            for (key, value) in patch {
                if !EntityMeta::KEYS.contains(&key.as_str()) {
                    target.insert(key.clone(), value.clone());
                }
            }
        }

        let mut updated: R = serde_json::from_value(merged)?;
        {
            let meta = updated.meta_mut();
            meta.updated_at = Utc::now();
            meta.version = current + 1;
        }

        let updated_json = serde_json::to_string(&updated)?;
        let replaced = table.insert(id, updated_json.as_str())?.is_some();
        let ack = json!({
            "modifiedCount": if replaced { 1 } else { 0 },
            "value": if replaced { serde_json::to_value(&updated)? } else { Value::Null },
        });
        (updated, ack)
    };

    let check = verification_helpers::verify(Operation::Update, &ack);
    if !check.success {
        log::error!("{} update of {} failed verification: {}", R::KIND.module_name(), id, check.message);
        write_txn.abort()?;
        return Err(DbError::Verification(check.message));
    }
    write_txn.commit()?;
    Ok(UpdateOutcome::Updated(updated))
}

/// Removes a record and hands it back so the caller can clean up its asset.
pub fn remove<R: Resource>(db: &Database, id: &str) -> Result<Option<R>, DbError> {
    let write_txn = db.begin_write()?;
    let removed_json = {
        let mut table = write_txn.open_table(table_for(R::KIND))?;
        let removed = table.remove(id)?.map(|guard| guard.value().to_string());
        removed
    };

    let ack = json!({ "deletedCount": if removed_json.is_some() { 1 } else { 0 } });
    let check = verification_helpers::verify(Operation::Delete, &ack);
    let Some(json) = removed_json.filter(|_| check.success) else {
        log::debug!("{} delete of {}: {}", R::KIND.module_name(), id, check.message);
        write_txn.abort()?;
        return Ok(None);
    };

    // Parse before committing so an unreadable row is not silently dropped.
    let record: R = serde_json::from_str(&json)?;
    write_txn.commit()?;
    Ok(Some(record))
}

/// Returns whether exactly one record was removed.
pub fn delete<R: Resource>(db: &Database, id: &str) -> Result<bool, DbError> {
    Ok(remove::<R>(db, id)?.is_some())
}
