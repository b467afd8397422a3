use crate::middleware::ACTOR_HEADER;
use crate::models::upload::validate_upload;
use crate::models::{ActivityEntry, Resource, ResourceKind, ValidationError};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Could not reach the server: {0}")]
    Transport(String),
    #[error("Server returned {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("Unexpected response: {0}")]
    Decode(String),
    #[error("Local cache error: {0}")]
    LocalStore(String),
    #[error("A save is already in progress.")]
    Busy,
}

/// Server side of the client cache: the `/api` resource endpoints.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    async fn list<R: Resource>(&self) -> Result<Vec<R>, ClientError>;

    /// Creates a record; the server assigns id, timestamps and version.
    async fn create<R: Resource>(&self, record: &R) -> Result<R, ClientError>;

    /// Replaces a record, sending its version as the concurrency token.
    async fn update<R: Resource>(&self, record: &R) -> Result<R, ClientError>;

    async fn delete<R: Resource>(&self, id: &str) -> Result<(), ClientError>;

    async fn activity(&self, limit: u32) -> Result<Vec<ActivityEntry>, ClientError>;
}

/// What `POST /api/upload` hands back; copied into the owning record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub url: String,
    pub storage_id: String,
    pub format: String,
    pub byte_size: u64,
    pub file_type: String,
    pub original_name: String,
    pub mime_type: String,
}

pub struct HttpResourceApi {
    client: reqwest::Client,
    base_url: String,
    actor: Option<String>,
}

impl HttpResourceApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpResourceApi { client: reqwest::Client::new(), base_url: base_url.into(), actor: None }
    }

    /// Name sent in the `X-Actor` header and recorded in the activity log.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/api/{}", self.base_url.trim_end_matches('/'), path);
        let builder = self.client.request(method, url);
        match &self.actor {
            Some(actor) => builder.header(ACTOR_HEADER, actor),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder) -> Result<Value, ClientError> {
        let response = builder.send().await.map_err(|e| ClientError::Transport(e.to_string()))?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| ClientError::Transport(e.to_string()))?;
        let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        if status.is_success() && body.get("success").and_then(Value::as_bool) == Some(true) {
            return Ok(body);
        }

        let message = body
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());
        Err(match status.as_u16() {
            400 => ClientError::Validation(ValidationError::new(message)),
            404 => ClientError::NotFound(message),
            409 => ClientError::Conflict(message),
            200..=299 => ClientError::Decode(format!("response without success flag: {}", body)),
            code => ClientError::Rejected { status: code, message },
        })
    }

    fn take<T: DeserializeOwned>(mut body: Value, key: &str) -> Result<T, ClientError> {
        let value = body
            .get_mut(key)
            .map(Value::take)
            .ok_or_else(|| ClientError::Decode(format!("missing '{}' in response", key)))?;
        serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Checks the upload policy locally, then sends the file. Oversized or
    /// disallowed files never leave the machine.
    pub async fn upload_file(
        &self,
        kind: ResourceKind,
        filename: &str,
        mime_type: Option<&str>,
        bytes: Vec<u8>,
        folder: Option<&str>,
    ) -> Result<UploadReceipt, ClientError> {
        let accepted = validate_upload(kind, filename, mime_type, bytes.len() as u64)?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(&accepted.mime_type)
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        let mut form = reqwest::multipart::Form::new().part("file", part);
        if let Some(folder) = folder {
            form = form.text("folder", folder.to_string());
        }

        let builder = self
            .request(Method::POST, "upload")
            .query(&[("resource", kind.path())])
            .multipart(form);
        let body = Self::send(builder).await?;
        serde_json::from_value(body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ResourceApi for HttpResourceApi {
    async fn list<R: Resource>(&self) -> Result<Vec<R>, ClientError> {
        let body = Self::send(self.request(Method::GET, R::KIND.path())).await?;
        Self::take(body, R::KIND.collection())
    }

    async fn create<R: Resource>(&self, record: &R) -> Result<R, ClientError> {
        let body = Self::send(self.request(Method::POST, R::KIND.path()).json(record)).await?;
        Self::take(body, R::KIND.singular())
    }

    async fn update<R: Resource>(&self, record: &R) -> Result<R, ClientError> {
        let body = Self::send(self.request(Method::PUT, R::KIND.path()).json(record)).await?;
        Self::take(body, R::KIND.singular())
    }

    async fn delete<R: Resource>(&self, id: &str) -> Result<(), ClientError> {
        let builder = self.request(Method::DELETE, R::KIND.path()).query(&[("id", id)]);
        Self::send(builder).await.map(|_| ())
    }

    async fn activity(&self, limit: u32) -> Result<Vec<ActivityEntry>, ClientError> {
        let builder = self.request(Method::GET, "activity-logs").query(&[("limit", limit)]);
        let body = Self::send(builder).await?;
        Self::take(body, "activityLogs")
    }
}
