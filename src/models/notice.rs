use super::{AssetKind, EntityMeta, Resource, ResourceKind, ValidationError};
use crate::helper::form_helpers::{self, JsonMap};
use serde::{Deserialize, Serialize};

choice_enum!(NoticeCategory {
    General => "general",
    Announcement => "announcement",
    Tender => "tender",
    Vacancy => "vacancy",
    Event => "event",
});

choice_enum!(Priority {
    Low => "low",
    Medium => "medium",
    High => "high",
});

choice_enum!(NoticeFileType {
    Image => "image",
    Pdf => "pdf",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub title: String,
    pub content: String,
    pub description: Option<String>,
    pub category: NoticeCategory,
    pub priority: Priority,
    /// Visible on the public site.
    pub is_active: bool,
    /// Shown as an interstitial on page load.
    pub show_as_popup: bool,
    pub file_url: Option<String>,
    pub file_type: Option<NoticeFileType>,
    pub file_name: Option<String>,
    pub storage_id: Option<String>,
}

impl Resource for Notice {
    const KIND: ResourceKind = ResourceKind::Notice;

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }

    fn from_payload(body: &JsonMap) -> Result<Self, ValidationError> {
        let title = form_helpers::required_string(body, "title")?;
        let content = form_helpers::required_string(body, "content")?;
        let file_url = form_helpers::optional_string(body, "fileUrl")?;
        let file_type: Option<NoticeFileType> = form_helpers::optional_choice(body, "fileType")?;

        match (&file_url, &file_type) {
            (Some(_), None) => return Err(ValidationError::new("'fileType' is required when 'fileUrl' is set.")),
            (None, Some(_)) => return Err(ValidationError::new("'fileUrl' is required when 'fileType' is set.")),
            _ => {}
        }

        Ok(Notice {
            meta: EntityMeta::default(),
            title,
            content,
            description: form_helpers::optional_string(body, "description")?,
            category: form_helpers::optional_choice(body, "category")?.unwrap_or(NoticeCategory::General),
            priority: form_helpers::optional_choice(body, "priority")?.unwrap_or(Priority::Medium),
            // Only an explicit `false` deactivates a notice.
            is_active: form_helpers::optional_bool(body, "isActive")?.unwrap_or(true),
            show_as_popup: form_helpers::optional_bool(body, "showAsPopup")?.unwrap_or(false),
            file_name: form_helpers::optional_string(body, "fileName")?,
            storage_id: form_helpers::optional_string(body, "storageId")?,
            file_url,
            file_type,
        })
    }

    fn label(&self) -> String {
        self.title.clone()
    }

    fn stored_asset(&self) -> Option<(&str, AssetKind)> {
        let storage_id = self.storage_id.as_deref()?;
        let kind = match self.file_type {
            Some(NoticeFileType::Image) => AssetKind::Image,
            _ => AssetKind::Raw,
        };
        Some((storage_id, kind))
    }
}
