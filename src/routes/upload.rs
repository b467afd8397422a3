use crate::helper::api_errors::ApiError;
use crate::helper::upload_helpers::{self, sanitize_folder};
use crate::models::upload::{self as upload_policy, AcceptedUpload};
use crate::models::{ResourceKind, ValidationError};
use crate::AppState;
use actix_multipart::Multipart;
use actix_web::{web, web::BytesMut, HttpResponse};
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
pub struct UploadQuery {
    resource: Option<String>,
}

struct ReceivedFile {
    filename: String,
    declared_mime: Option<String>,
    bytes: BytesMut,
}

pub fn config_upload(cfg: &mut web::ServiceConfig) {
    cfg.route("/upload", web::post().to(upload_file));
}

/// Type label stored on the owning record (e.g. a document's `fileType`).
fn file_type_label(kind: ResourceKind, accepted: &AcceptedUpload) -> String {
    let label = match kind {
        ResourceKind::Document => upload_policy::document_file_type(&accepted.mime_type).map(|t| t.as_str()),
        ResourceKind::Notice => upload_policy::notice_file_type(&accepted.mime_type).map(|t| t.as_str()),
        _ => None,
    };
    label.unwrap_or(accepted.asset_kind.as_str()).to_string()
}

async fn read_text_field(field: &mut actix_multipart::Field) -> Result<String, ApiError> {
    let mut data = BytesMut::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| ApiError::Validation(format!("Malformed form data: {}", e)))?;
        if data.len() + chunk.len() > 1024 {
            return Err(ValidationError::new("Form field is too long.").into());
        }
        data.extend_from_slice(&chunk);
    }
    String::from_utf8(data.to_vec()).map_err(|_| ValidationError::new("Invalid UTF-8 in form field.").into())
}

async fn upload_file(
    state: web::Data<AppState>,
    query: web::Query<UploadQuery>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let kind = query
        .resource
        .as_deref()
        .and_then(ResourceKind::from_path)
        .ok_or_else(|| ApiError::Validation("A valid 'resource' query parameter is required.".to_string()))?;

    let max_bytes = state.max_upload_mb * 1024 * 1024;
    let mut file: Option<ReceivedFile> = None;
    let mut folder: Option<String> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| ApiError::Validation(format!("Malformed form data: {}", e)))?;
        let field_name = field.content_disposition().get_name().unwrap_or_default().to_string();

        match field_name.as_str() {
            "file" => {
                let filename = field.content_disposition().get_filename().unwrap_or("upload").to_string();
                let declared_mime = field.content_type().map(|m| m.to_string());
                let mut bytes = BytesMut::new();
                while let Some(chunk) = field.next().await {
                    let chunk = chunk.map_err(|e| ApiError::Validation(format!("Malformed form data: {}", e)))?;
                    // Stop reading as soon as the limit is crossed.
                    if (bytes.len() + chunk.len()) as u64 > max_bytes {
                        return Err(ValidationError::new(format!(
                            "File is too large. Maximum size is {}MB.",
                            state.max_upload_mb
                        ))
                        .into());
                    }
                    bytes.extend_from_slice(&chunk);
                }
                file = Some(ReceivedFile { filename, declared_mime, bytes });
            }
            "folder" => folder = Some(read_text_field(&mut field).await?),
            _ => (),
        }
    }

    let Some(file) = file else {
        return Err(ValidationError::new("No file was uploaded.").into());
    };

    let accepted = upload_policy::validate_upload_with_limit(
        kind,
        &file.filename,
        file.declared_mime.as_deref(),
        file.bytes.len() as u64,
        state.max_upload_mb,
    )?;
    let folder = match folder.as_deref().map(str::trim).filter(|f| !f.is_empty()) {
        Some(f) => sanitize_folder(f)?,
        None => kind.path().to_string(),
    };

    let asset = upload_helpers::upload_asset(
        state.media_host.as_ref(),
        file.bytes.to_vec(),
        &folder,
        Some(accepted.asset_kind),
        &file.filename,
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "url": asset.url,
        "storageId": asset.storage_id,
        "format": asset.format,
        "byteSize": asset.byte_size,
        "fileType": file_type_label(kind, &accepted),
        "originalName": file.filename,
        "mimeType": accepted.mime_type,
    })))
}
