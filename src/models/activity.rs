use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

choice_enum!(ActivityAction {
    Create => "create",
    Update => "update",
    Delete => "delete",
});

/// One row of the capped, most-recent-first audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: i64,
    pub action: ActivityAction,
    pub module: String,
    pub detail: String,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
}
