use super::upload::document_file_type;
use super::{AssetKind, EntityMeta, Resource, ResourceKind, ValidationError};
use crate::helper::form_helpers::{self, JsonMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

choice_enum!(DocumentCategory {
    General => "general",
    Certificate => "certificate",
    Report => "report",
    Brochure => "brochure",
    PriceList => "price-list",
    Form => "form",
});

choice_enum!(DocumentFileType {
    Pdf => "pdf",
    Word => "word",
    Excel => "excel",
    Text => "text",
    Image => "image",
});

/// An uploaded file. Url, size and original name always travel together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub url: String,
    pub size: u64,
    pub original_name: String,
    pub mime_type: Option<String>,
    pub storage_id: Option<String>,
}

impl Attachment {
    fn from_payload(value: &Value) -> Result<Attachment, ValidationError> {
        let map = value
            .as_object()
            .ok_or_else(|| ValidationError::new("'attachment' must be an object."))?;

        let url = form_helpers::optional_string(map, "url")?;
        let size = form_helpers::optional_u64(map, "size")?;
        let original_name = form_helpers::optional_string(map, "originalName")?;

        match (url, size, original_name) {
            (Some(url), Some(size), Some(original_name)) => Ok(Attachment {
                url,
                size,
                original_name,
                mime_type: form_helpers::optional_string(map, "mimeType")?,
                storage_id: form_helpers::optional_string(map, "storageId")?,
            }),
            _ => Err(ValidationError::new(
                "Attachment must include url, size and originalName together.",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub name: String,
    pub description: String,
    pub file_type: Option<DocumentFileType>,
    pub category: DocumentCategory,
    pub uploaded_at: DateTime<Utc>,
    pub attachment: Option<Attachment>,
}

impl Resource for Document {
    const KIND: ResourceKind = ResourceKind::Document;
    const DEFAULTED_FIELDS: &'static [&'static str] = &["uploadedAt"];

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }

    fn from_payload(body: &JsonMap) -> Result<Self, ValidationError> {
        let name = form_helpers::required_string(body, "name")?;
        let description = form_helpers::required_string(body, "description")?;
        let category = form_helpers::optional_choice(body, "category")?.unwrap_or(DocumentCategory::General);
        let declared_type: Option<DocumentFileType> = form_helpers::optional_choice(body, "fileType")?;

        let attachment = match body.get("attachment").filter(|v| !v.is_null()) {
            Some(value) => Some(Attachment::from_payload(value)?),
            None => None,
        };

        let file_type = match (&attachment, declared_type) {
            (None, None) => None,
            (None, Some(_)) => {
                return Err(ValidationError::new("'fileType' requires an attachment."));
            }
            // The attachment's MIME type decides; a declared type only fills in when it cannot.
            (Some(att), declared) => match (att.mime_type.as_deref().and_then(document_file_type), declared) {
                (Some(derived), Some(declared)) if derived != declared => {
                    return Err(ValidationError::new(format!(
                        "'fileType' '{}' does not match the attachment, which is '{}'.",
                        declared.as_str(),
                        derived.as_str()
                    )));
                }
                (Some(derived), _) => Some(derived),
                (None, Some(declared)) => Some(declared),
                (None, None) => {
                    return Err(ValidationError::new("'fileType' is required when an attachment is present."));
                }
            },
        };

        let uploaded_at = match form_helpers::optional_string(body, "uploadedAt")? {
            Some(raw) => DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| ValidationError::new("'uploadedAt' must be an RFC 3339 timestamp."))?,
            None => Utc::now(),
        };

        Ok(Document {
            meta: EntityMeta::default(),
            name,
            description,
            file_type,
            category,
            uploaded_at,
            attachment,
        })
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn stored_asset(&self) -> Option<(&str, AssetKind)> {
        let attachment = self.attachment.as_ref()?;
        let storage_id = attachment.storage_id.as_deref()?;
        let kind = attachment.mime_type.as_deref().map(AssetKind::infer).unwrap_or(AssetKind::Raw);
        Some((storage_id, kind))
    }
}
