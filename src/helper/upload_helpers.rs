use crate::config::RemoteMediaConfig;
use crate::helper::verification_helpers::{self, Operation};
use crate::models::{AssetKind, ValidationError};
use actix_web::web;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("Media host rejected the request: {0}")]
    Rejected(String),
    #[error("Could not reach the media host: {0}")]
    Transport(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Blocking task failed: {0}")]
    Blocking(#[from] actix_web::error::BlockingError),
}

/// Where uploaded bytes are stored. Both operations return the provider's raw
/// response; callers run it through the verification layer.
#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        folder: &str,
        kind: Option<AssetKind>,
        filename: &str,
    ) -> Result<Value, UploadError>;

    async fn delete(&self, storage_id: &str, kind: AssetKind) -> Result<Value, UploadError>;
}

/// Verified result of an upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedAsset {
    pub url: String,
    pub storage_id: String,
    pub format: String,
    pub byte_size: u64,
}

fn extension_of(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.trim().to_lowercase())
        .unwrap_or_default()
}

/// Folder names may only hold ASCII letters, digits, '-', '_' and '/'.
pub fn sanitize_folder(folder: &str) -> Result<String, ValidationError> {
    let trimmed = folder.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Err(ValidationError::new("Upload folder cannot be empty."));
    }
    let valid = trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '/')
        && !trimmed.split('/').any(|segment| segment.is_empty());
    if !valid {
        return Err(ValidationError::new(format!("Invalid upload folder '{}'.", folder)));
    }
    Ok(trimmed.to_string())
}

// --- Local filesystem host ---

/// Stores files under `<media_path>/uploads/<folder>/aa/bb/<uuid>.<ext>`;
/// they are served by the `/media` static route.
pub struct LocalMediaHost {
    media_path: PathBuf,
    url_prefix: String,
}

impl LocalMediaHost {
    pub fn new(media_path: impl Into<PathBuf>) -> Self {
        LocalMediaHost { media_path: media_path.into(), url_prefix: "/media".to_string() }
    }

    fn uploads_root(&self) -> PathBuf {
        self.media_path.join("uploads")
    }

    /// Maps a storage id back to a file, refusing anything that escapes the uploads root.
    fn resolve(&self, storage_id: &str) -> Option<PathBuf> {
        let relative = Path::new(storage_id);
        let safe = !storage_id.is_empty()
            && relative.components().all(|c| matches!(c, Component::Normal(_)));
        safe.then(|| self.uploads_root().join(relative))
    }
}

#[async_trait]
impl MediaHost for LocalMediaHost {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        folder: &str,
        kind: Option<AssetKind>,
        filename: &str,
    ) -> Result<Value, UploadError> {
        let folder = sanitize_folder(folder)?;
        let extension = extension_of(filename);
        if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::new(format!("Cannot store '{}' without a file extension.", filename)).into());
        }

        let file_id = Uuid::new_v4().to_string();
        let dir1 = &file_id[0..2];
        let dir2 = &file_id[2..4];
        let storage_id = format!("{}/{}/{}/{}.{}", folder, dir1, dir2, file_id, extension);
        let dir = self.uploads_root().join(&folder).join(dir1).join(dir2);
        let final_path = dir.join(format!("{}.{}", file_id, extension));
        let byte_size = bytes.len() as u64;

        web::block(move || -> std::io::Result<()> {
            fs::create_dir_all(&dir)?;
            let mut f = fs::File::create(&final_path)?;
            f.write_all(&bytes)?;
            f.sync_all()
        })
        .await??;

        let resource_type = kind.unwrap_or_else(|| {
            crate::models::upload::mime_for_extension(&extension)
                .map(AssetKind::infer)
                .unwrap_or(AssetKind::Raw)
        });

        Ok(json!({
            "url": format!("{}/uploads/{}", self.url_prefix, storage_id),
            "storageId": storage_id,
            "format": extension,
            "bytes": byte_size,
            "resource_type": resource_type.as_str(),
        }))
    }

    async fn delete(&self, storage_id: &str, _kind: AssetKind) -> Result<Value, UploadError> {
        let Some(path) = self.resolve(storage_id) else {
            return Ok(json!({ "result": "invalid storage id" }));
        };
        match web::block(move || fs::remove_file(&path)).await? {
            Ok(()) => Ok(json!({ "result": "ok" })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(json!({ "result": "not found" })),
            Err(e) => Err(e.into()),
        }
    }
}

// --- Hosted media service ---

/// Talks to a hosted media service with unsigned preset uploads and
/// basic-auth admin deletes.
pub struct HttpMediaHost {
    client: reqwest::Client,
    config: RemoteMediaConfig,
}

impl HttpMediaHost {
    pub fn new(config: RemoteMediaConfig) -> Self {
        HttpMediaHost { client: reqwest::Client::new(), config }
    }

    fn endpoint(&self, tail: &str) -> String {
        format!("{}/{}/{}", self.config.base_url.trim_end_matches('/'), self.config.cloud_name, tail)
    }

    async fn read_response(response: reqwest::Response) -> Result<Value, UploadError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        if status.is_client_error() || status.is_server_error() {
            let detail = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or(body);
            return Err(UploadError::Rejected(format!("{}: {}", status, detail)));
        }
        serde_json::from_str(&body).map_err(|e| UploadError::Rejected(format!("unreadable response: {}", e)))
    }
}

#[async_trait]
impl MediaHost for HttpMediaHost {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        folder: &str,
        kind: Option<AssetKind>,
        filename: &str,
    ) -> Result<Value, UploadError> {
        let folder = sanitize_folder(folder)?;
        let resource_type = kind.map(|k| k.as_str()).unwrap_or("auto");
        let url = self.endpoint(&format!("{}/upload", resource_type));

        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("upload_preset", self.config.upload_preset.clone())
            .text("folder", folder);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        Self::read_response(response).await
    }

    async fn delete(&self, storage_id: &str, kind: AssetKind) -> Result<Value, UploadError> {
        let url = self.endpoint(&format!("resources/{}/upload", kind.as_str()));
        let response = self
            .client
            .delete(&url)
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .query(&[("public_ids[]", storage_id)])
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        Self::read_response(response).await
    }
}

// --- Gateway operations ---

fn string_field(response: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| response.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Uploads through `host` and only returns once the response verifies.
pub async fn upload_asset(
    host: &dyn MediaHost,
    bytes: Vec<u8>,
    folder: &str,
    kind: Option<AssetKind>,
    filename: &str,
) -> Result<UploadedAsset, UploadError> {
    let byte_len = bytes.len() as u64;
    let response = host.upload(bytes, folder, kind, filename).await?;

    let check = verification_helpers::verify(Operation::Upload, &response);
    if !check.success {
        log::error!("Upload of '{}' to folder '{}' failed verification: {}", filename, folder, check.message);
        return Err(UploadError::Rejected(check.message));
    }

    let url = string_field(&response, &["secure_url", "url"]).unwrap_or_default();
    let storage_id = string_field(&response, &["storageId", "public_id"]).unwrap_or_default();
    let format = string_field(&response, &["format"]).unwrap_or_else(|| extension_of(filename));
    let byte_size = response
        .get("bytes")
        .or_else(|| response.get("byteSize"))
        .and_then(Value::as_u64)
        .unwrap_or(byte_len);

    log::info!("Uploaded '{}' as {}", filename, storage_id);
    Ok(UploadedAsset { url, storage_id, format, byte_size })
}

/// Best-effort removal of a stored asset. Failures are logged, never returned.
pub async fn delete_asset(host: &dyn MediaHost, storage_id: &str, kind: AssetKind) -> bool {
    match host.delete(storage_id, kind).await {
        Ok(response) => {
            let check = verification_helpers::verify(Operation::AssetDelete, &response);
            if !check.success {
                log::warn!("Asset {} may be orphaned: {}", storage_id, check.message);
            }
            check.success
        }
        Err(e) => {
            log::error!("Failed to delete asset {} ({}): {}", storage_id, kind.as_str(), e);
            false
        }
    }
}
