use crate::models::db_operations::activity_db_operations;
use crate::models::{ActivityAction, ResourceKind};
use crate::DbPool;
use actix_web::{rt, web};

fn verb(action: ActivityAction) -> &'static str {
    match action {
        ActivityAction::Create => "Created",
        ActivityAction::Update => "Updated",
        ActivityAction::Delete => "Deleted",
    }
}

/// Detail line stored with each entry, e.g. "Created notice: Maintenance".
pub fn describe(action: ActivityAction, kind: ResourceKind, label: &str) -> String {
    format!("{} {}: {}", verb(action), kind.noun(), label)
}

/// Records a mutation in the activity log without holding up the caller.
/// The write runs on a spawned task; problems are only logged.
pub fn record(pool: &DbPool, action: ActivityAction, kind: ResourceKind, label: &str, actor: &str, cap: u32) {
    let pool = pool.clone();
    let detail = describe(action, kind, label);
    let actor = actor.to_string();

    rt::spawn(async move {
        let outcome = web::block(move || -> Result<i64, String> {
            let mut conn = pool.get().map_err(|e| e.to_string())?;
            activity_db_operations::append(&mut conn, action, kind.module_name(), &detail, &actor, cap)
                .map_err(|e| e.to_string())
        })
        .await;

        match outcome {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => log::error!("Failed to record {} activity for {}: {}", action.as_str(), kind.module_name(), e),
            Err(e) => log::error!("Activity logging task failed: {}", e),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::db_setup;
    use r2d2_sqlite::SqliteConnectionManager;
    use rusqlite::Connection;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn details_read_naturally() {
        assert_eq!(
            describe(ActivityAction::Create, ResourceKind::Notice, "Maintenance"),
            "Created notice: Maintenance"
        );
        assert_eq!(
            describe(ActivityAction::Delete, ResourceKind::CarouselSlide, "Harvest"),
            "Deleted carousel slide: Harvest"
        );
    }

    #[actix_web::test]
    async fn recording_does_not_wait_for_a_busy_pool() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("activity.db");
        db_setup::setup_activity_db(&mut Connection::open(&path).unwrap()).unwrap();
        let pool = r2d2::Pool::builder().max_size(1).build(SqliteConnectionManager::file(&path)).unwrap();

        // With the only connection checked out, the write cannot start yet.
        let busy = pool.get().unwrap();
        record(&pool, ActivityAction::Create, ResourceKind::Notice, "Maintenance", "admin", 10);
        assert!(activity_db_operations::read_recent(&busy, 10).unwrap().is_empty());
        drop(busy);

        let mut entries = Vec::new();
        for _ in 0..100 {
            entries = activity_db_operations::read_recent(&pool.get().unwrap(), 10).unwrap();
            if !entries.is_empty() {
                break;
            }
            rt::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].detail, "Created notice: Maintenance");
    }
}
