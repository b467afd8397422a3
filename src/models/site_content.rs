use super::{AssetKind, EntityMeta, Resource, ResourceKind, ValidationError};
use crate::helper::form_helpers::{self, JsonMap};
use serde::{Deserialize, Serialize};

choice_enum!(MediaType {
    Image => "image",
    Video => "video",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub name_en: String,
    pub name_ne: String,
    pub position_en: String,
    pub position_ne: String,
    pub image_url: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub display_order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub title_en: String,
    pub title_ne: String,
    pub media_type: MediaType,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub storage_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarouselSlide {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub title_en: String,
    pub title_ne: String,
    pub subtitle_en: Option<String>,
    pub subtitle_ne: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    pub storage_id: Option<String>,
    pub display_order: i64,
}

/// A contact-form message sent from the public site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailSubmission {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub is_read: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Factory {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub name: String,
    pub location: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub established: Option<String>,
}

impl Resource for TeamMember {
    const KIND: ResourceKind = ResourceKind::TeamMember;

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }

    fn from_payload(body: &JsonMap) -> Result<Self, ValidationError> {
        Ok(TeamMember {
            meta: EntityMeta::default(),
            name_en: form_helpers::required_string(body, "nameEn")?,
            name_ne: form_helpers::required_string(body, "nameNe")?,
            position_en: form_helpers::required_string(body, "positionEn")?,
            position_ne: form_helpers::required_string(body, "positionNe")?,
            image_url: form_helpers::optional_string(body, "imageUrl")?,
            phone: form_helpers::optional_string(body, "phone")?,
            email: form_helpers::optional_string(body, "email")?,
            display_order: form_helpers::optional_i64(body, "displayOrder")?.unwrap_or(0),
        })
    }

    fn label(&self) -> String {
        self.name_en.clone()
    }
}

impl Resource for MediaItem {
    const KIND: ResourceKind = ResourceKind::MediaItem;

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }

    fn from_payload(body: &JsonMap) -> Result<Self, ValidationError> {
        Ok(MediaItem {
            meta: EntityMeta::default(),
            title_en: form_helpers::required_string(body, "titleEn")?,
            title_ne: form_helpers::required_string(body, "titleNe")?,
            media_type: form_helpers::required_choice(body, "mediaType")?,
            url: form_helpers::required_string(body, "url")?,
            thumbnail_url: form_helpers::optional_string(body, "thumbnailUrl")?,
            storage_id: form_helpers::optional_string(body, "storageId")?,
        })
    }

    fn label(&self) -> String {
        self.title_en.clone()
    }

    fn stored_asset(&self) -> Option<(&str, AssetKind)> {
        let kind = match self.media_type {
            MediaType::Image => AssetKind::Image,
            MediaType::Video => AssetKind::Video,
        };
        self.storage_id.as_deref().map(|id| (id, kind))
    }
}

impl Resource for CarouselSlide {
    const KIND: ResourceKind = ResourceKind::CarouselSlide;

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }

    fn from_payload(body: &JsonMap) -> Result<Self, ValidationError> {
        Ok(CarouselSlide {
            meta: EntityMeta::default(),
            title_en: form_helpers::required_string(body, "titleEn")?,
            title_ne: form_helpers::required_string(body, "titleNe")?,
            subtitle_en: form_helpers::optional_string(body, "subtitleEn")?,
            subtitle_ne: form_helpers::optional_string(body, "subtitleNe")?,
            image_url: form_helpers::required_string(body, "imageUrl")?,
            link_url: form_helpers::optional_string(body, "linkUrl")?,
            storage_id: form_helpers::optional_string(body, "storageId")?,
            display_order: form_helpers::optional_i64(body, "displayOrder")?.unwrap_or(0),
        })
    }

    fn label(&self) -> String {
        self.title_en.clone()
    }

    fn stored_asset(&self) -> Option<(&str, AssetKind)> {
        self.storage_id.as_deref().map(|id| (id, AssetKind::Image))
    }
}

impl Resource for MailSubmission {
    const KIND: ResourceKind = ResourceKind::MailSubmission;

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }

    fn from_payload(body: &JsonMap) -> Result<Self, ValidationError> {
        let email = form_helpers::required_string(body, "email")?;
        if !email.contains('@') {
            return Err(ValidationError::new("'email' must be a valid email address."));
        }
        Ok(MailSubmission {
            meta: EntityMeta::default(),
            name: form_helpers::required_string(body, "name")?,
            email,
            phone: form_helpers::optional_string(body, "phone")?,
            subject: form_helpers::required_string(body, "subject")?,
            message: form_helpers::required_string(body, "message")?,
            is_read: form_helpers::optional_bool(body, "isRead")?.unwrap_or(false),
        })
    }

    fn label(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }
}

impl Resource for Factory {
    const KIND: ResourceKind = ResourceKind::Factory;

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }

    fn from_payload(body: &JsonMap) -> Result<Self, ValidationError> {
        Ok(Factory {
            meta: EntityMeta::default(),
            name: form_helpers::required_string(body, "name")?,
            location: form_helpers::required_string(body, "location")?,
            description: form_helpers::optional_string(body, "description")?,
            image_url: form_helpers::optional_string(body, "imageUrl")?,
            established: form_helpers::optional_string(body, "established")?,
        })
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn team_member_requires_both_locales() {
        let body = json!({"nameEn": "Ram", "positionEn": "Manager", "positionNe": "प्रबन्धक"});
        let err = TeamMember::from_payload(body.as_object().unwrap()).unwrap_err();
        assert_eq!(err.0, "'nameNe' is required.");
    }

    #[test]
    fn mail_submission_checks_email_shape() {
        let body = json!({"name": "Sita", "email": "not-an-email", "subject": "Price", "message": "Hello"});
        assert!(MailSubmission::from_payload(body.as_object().unwrap()).is_err());

        let body = json!({"name": "Sita", "email": "sita@example.com", "subject": "Price", "message": "Hello"});
        let mail = MailSubmission::from_payload(body.as_object().unwrap()).unwrap();
        assert!(!mail.is_read);
    }

    #[test]
    fn media_item_asset_kind_follows_media_type() {
        let body = json!({"titleEn": "Plant", "titleNe": "कारखाना", "mediaType": "video", "url": "https://cdn/v.mp4", "storageId": "media/v"});
        let item = MediaItem::from_payload(body.as_object().unwrap()).unwrap();
        assert_eq!(item.stored_asset(), Some(("media/v", AssetKind::Video)));
    }
}
