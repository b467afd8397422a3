use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::helper::form_helpers::JsonMap;

/// Declares a closed set of string choices with serde names and lookup table.
macro_rules! choice_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $crate::models::Choice for $name {
            const VALUES: &'static [(&'static str, Self)] = &[$(($text, $name::$variant)),+];
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }
    };
}

pub mod activity;
pub mod db_operations;
pub mod document;
pub mod notice;
pub mod object_id;
pub mod product;
pub mod site_content;
pub mod upload;

pub use activity::{ActivityAction, ActivityEntry};
pub use document::{Attachment, Document, DocumentCategory, DocumentFileType};
pub use notice::{Notice, NoticeCategory, NoticeFileType, Priority};
pub use product::{Product, ProductCategory};
pub use site_content::{CarouselSlide, Factory, MailSubmission, MediaItem, MediaType, TeamMember};
pub use upload::AssetKind;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        ValidationError(message.into())
    }
}

/// A closed set of accepted string values.
pub trait Choice: Sized + Copy + 'static {
    const VALUES: &'static [(&'static str, Self)];

    fn parse_choice(raw: &str) -> Option<Self> {
        Self::VALUES.iter().find(|(text, _)| *text == raw).map(|(_, value)| *value)
    }

    fn allowed() -> String {
        Self::VALUES.iter().map(|(text, _)| *text).collect::<Vec<_>>().join(", ")
    }
}

/// Identity, audit timestamps and concurrency token shared by every entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMeta {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

impl EntityMeta {
    /// Keys owned by the store; never taken from a client patch.
    pub const KEYS: [&'static str; 4] = ["id", "createdAt", "updatedAt", "version"];

    pub fn has_server_id(&self) -> bool {
        object_id::is_valid_object_id(&self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Product,
    Document,
    Notice,
    TeamMember,
    MediaItem,
    CarouselSlide,
    MailSubmission,
    Factory,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 8] = [
        ResourceKind::Product,
        ResourceKind::Document,
        ResourceKind::Notice,
        ResourceKind::TeamMember,
        ResourceKind::MediaItem,
        ResourceKind::CarouselSlide,
        ResourceKind::MailSubmission,
        ResourceKind::Factory,
    ];

    /// Path segment under `/api/`.
    pub fn path(&self) -> &'static str {
        match self {
            ResourceKind::Product => "products",
            ResourceKind::Document => "documents",
            ResourceKind::Notice => "notices",
            ResourceKind::TeamMember => "team-members",
            ResourceKind::MediaItem => "media-items",
            ResourceKind::CarouselSlide => "carousel",
            ResourceKind::MailSubmission => "mail-submissions",
            ResourceKind::Factory => "factories",
        }
    }

    /// JSON key of the list response; also the local cache key.
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceKind::Product => "products",
            ResourceKind::Document => "documents",
            ResourceKind::Notice => "notices",
            ResourceKind::TeamMember => "teamMembers",
            ResourceKind::MediaItem => "mediaItems",
            ResourceKind::CarouselSlide => "carousel",
            ResourceKind::MailSubmission => "mailSubmissions",
            ResourceKind::Factory => "factories",
        }
    }

    /// JSON key of the single-entity response.
    pub fn singular(&self) -> &'static str {
        match self {
            ResourceKind::Product => "product",
            ResourceKind::Document => "document",
            ResourceKind::Notice => "notice",
            ResourceKind::TeamMember => "teamMember",
            ResourceKind::MediaItem => "mediaItem",
            ResourceKind::CarouselSlide => "slide",
            ResourceKind::MailSubmission => "mailSubmission",
            ResourceKind::Factory => "factory",
        }
    }

    /// Module name recorded in the activity log.
    pub fn module_name(&self) -> &'static str {
        match self {
            ResourceKind::Product => "Products",
            ResourceKind::Document => "Documents",
            ResourceKind::Notice => "Notices",
            ResourceKind::TeamMember => "Team",
            ResourceKind::MediaItem => "Media",
            ResourceKind::CarouselSlide => "Carousel",
            ResourceKind::MailSubmission => "Mail",
            ResourceKind::Factory => "Factories",
        }
    }

    /// Lowercase noun used in messages and activity details.
    pub fn noun(&self) -> &'static str {
        match self {
            ResourceKind::Product => "product",
            ResourceKind::Document => "document",
            ResourceKind::Notice => "notice",
            ResourceKind::TeamMember => "team member",
            ResourceKind::MediaItem => "media item",
            ResourceKind::CarouselSlide => "carousel slide",
            ResourceKind::MailSubmission => "mail submission",
            ResourceKind::Factory => "factory",
        }
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            ResourceKind::Product => "products",
            ResourceKind::Document => "documents",
            ResourceKind::Notice => "notices",
            ResourceKind::TeamMember => "team_members",
            ResourceKind::MediaItem => "media_items",
            ResourceKind::CarouselSlide => "carousel_slides",
            ResourceKind::MailSubmission => "mail_submissions",
            ResourceKind::Factory => "factories",
        }
    }

    pub fn from_path(path: &str) -> Option<ResourceKind> {
        ResourceKind::ALL.into_iter().find(|kind| kind.path() == path)
    }
}

/// A record kind managed through the resource store and API.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: ResourceKind;

    fn meta(&self) -> &EntityMeta;

    fn meta_mut(&mut self) -> &mut EntityMeta;

    /// Validates a request body and builds a normalized, not-yet-persisted entity.
    fn from_payload(body: &JsonMap) -> Result<Self, ValidationError>;

    /// Short human-readable label used in activity details.
    fn label(&self) -> String;

    /// Fields `from_payload` fills in when the body omits them. An update that
    /// omits one keeps the stored value.
    const DEFAULTED_FIELDS: &'static [&'static str] = &[];

    /// Uploaded asset owned by this record, if any.
    fn stored_asset(&self) -> Option<(&str, AssetKind)> {
        None
    }
}
