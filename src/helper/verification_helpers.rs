use serde::Serialize;
use serde_json::Value;

/// The operation a provider response is claimed to acknowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
    Upload,
    AssetDelete,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verification {
    pub success: bool,
    pub message: String,
}

impl Verification {
    fn ok(message: impl Into<String>) -> Self {
        Verification { success: true, message: message.into() }
    }

    fn failed(message: impl Into<String>) -> Self {
        Verification { success: false, message: message.into() }
    }
}

fn non_empty_str<'a>(response: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| response.get(*key))
        .find_map(|v| v.as_str().filter(|s| !s.is_empty()))
}

fn positive_count(response: &Value, key: &str) -> bool {
    response.get(key).and_then(Value::as_u64).map_or(false, |n| n > 0)
}

/// Turns a raw provider response into a success flag plus a diagnostic message.
/// No retries and no side effects; the caller decides whether to log or escalate.
pub fn verify(operation: Operation, response: &Value) -> Verification {
    match operation {
        Operation::Create => match non_empty_str(response, &["insertedId"]) {
            Some(id) => Verification::ok(format!("Created with id {}.", id)),
            None => Verification::failed(format!("Create was not acknowledged with a new id: {}", response)),
        },
        Operation::Update => {
            let has_document = response.get("value").map_or(false, |v| v.is_object());
            if has_document || positive_count(response, "modifiedCount") {
                Verification::ok("Update acknowledged.")
            } else {
                Verification::failed(format!("Update modified nothing: {}", response))
            }
        }
        Operation::Delete => {
            if positive_count(response, "deletedCount") {
                Verification::ok("Delete acknowledged.")
            } else {
                Verification::failed(format!("Delete removed nothing: {}", response))
            }
        }
        Operation::Upload => {
            let url = non_empty_str(response, &["url", "secure_url"]);
            let storage_id = non_empty_str(response, &["storageId", "public_id"]);
            match (url, storage_id) {
                (Some(url), Some(_)) => Verification::ok(format!("Uploaded to {}.", url)),
                (None, _) => Verification::failed(format!("Upload response has no URL: {}", response)),
                (_, None) => Verification::failed(format!("Upload response has no storage id: {}", response)),
            }
        }
        Operation::AssetDelete => {
            let result_ok = response.get("result").and_then(Value::as_str) == Some("ok");
            let deleted_entry = response
                .get("deleted")
                .and_then(Value::as_object)
                .map_or(false, |map| map.values().any(|v| v.as_str() == Some("deleted")));
            if result_ok || deleted_entry {
                Verification::ok("Asset deleted.")
            } else {
                Verification::failed(format!("Asset deletion not confirmed: {}", response))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_requires_inserted_id() {
        assert!(verify(Operation::Create, &json!({"acknowledged": true, "insertedId": "507f1f77bcf86cd799439011"})).success);
        assert!(!verify(Operation::Create, &json!({"acknowledged": true})).success);
        assert!(!verify(Operation::Create, &json!({"insertedId": ""})).success);
    }

    #[test]
    fn update_accepts_document_or_positive_count() {
        assert!(verify(Operation::Update, &json!({"value": {"title": "x"}})).success);
        assert!(verify(Operation::Update, &json!({"modifiedCount": 1})).success);
        assert!(!verify(Operation::Update, &json!({"modifiedCount": 0, "value": null})).success);
    }

    #[test]
    fn delete_requires_positive_count() {
        assert!(verify(Operation::Delete, &json!({"deletedCount": 1})).success);
        let failed = verify(Operation::Delete, &json!({"deletedCount": 0}));
        assert!(!failed.success);
        assert!(failed.message.contains("removed nothing"));
    }

    #[test]
    fn upload_needs_url_and_storage_id() {
        assert!(verify(Operation::Upload, &json!({"secure_url": "https://cdn/x.png", "public_id": "products/x"})).success);
        assert!(verify(Operation::Upload, &json!({"url": "/media/x.png", "storageId": "x"})).success);
        assert!(!verify(Operation::Upload, &json!({"url": "/media/x.png"})).success);
        assert!(!verify(Operation::Upload, &json!({"error": {"message": "Invalid preset"}})).success);
    }

    #[test]
    fn asset_delete_shapes() {
        assert!(verify(Operation::AssetDelete, &json!({"result": "ok"})).success);
        assert!(verify(Operation::AssetDelete, &json!({"deleted": {"notices/x": "deleted"}})).success);
        assert!(!verify(Operation::AssetDelete, &json!({"deleted": {"notices/x": "not_found"}})).success);
    }
}
