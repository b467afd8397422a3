use super::{DocumentFileType, NoticeFileType, ResourceKind, ValidationError};
use serde::Serialize;

choice_enum!(
    /// Storage class at the media host.
    AssetKind {
        Image => "image",
        Video => "video",
        Raw => "raw",
    }
);

impl AssetKind {
    /// Infers the storage class from a MIME type.
    pub fn infer(mime_type: &str) -> AssetKind {
        if mime_type.starts_with("image/") {
            AssetKind::Image
        } else if mime_type.starts_with("video/") {
            AssetKind::Video
        } else {
            AssetKind::Raw
        }
    }
}

pub const DEFAULT_MAX_UPLOAD_MB: u64 = 10;

/// Extension to canonical MIME type. Not configurable.
const KNOWN_TYPES: &[(&str, &str)] = &[
    ("pdf", "application/pdf"),
    ("doc", "application/msword"),
    ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    ("xls", "application/vnd.ms-excel"),
    ("xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
    ("txt", "text/plain"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
];

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "xls", "xlsx", "txt", "jpg", "jpeg", "png", "gif", "webp"];
const NOTICE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "pdf"];
const MEDIA_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "mp4", "webm"];

pub fn allowed_extensions(kind: ResourceKind) -> &'static [&'static str] {
    match kind {
        ResourceKind::Document => DOCUMENT_EXTENSIONS,
        ResourceKind::Notice => NOTICE_EXTENSIONS,
        ResourceKind::MediaItem => MEDIA_EXTENSIONS,
        ResourceKind::MailSubmission => &[],
        ResourceKind::Product
        | ResourceKind::TeamMember
        | ResourceKind::CarouselSlide
        | ResourceKind::Factory => IMAGE_EXTENSIONS,
    }
}

pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    KNOWN_TYPES.iter().find(|(ext, _)| *ext == extension).map(|(_, mime)| *mime)
}

/// A file that passed the upload policy for its resource kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcceptedUpload {
    pub extension: String,
    pub mime_type: String,
    pub asset_kind: AssetKind,
}

/// Checks size and type before anything is sent to the media host.
pub fn validate_upload(
    kind: ResourceKind,
    filename: &str,
    declared_mime: Option<&str>,
    size_bytes: u64,
) -> Result<AcceptedUpload, ValidationError> {
    validate_upload_with_limit(kind, filename, declared_mime, size_bytes, DEFAULT_MAX_UPLOAD_MB)
}

pub fn validate_upload_with_limit(
    kind: ResourceKind,
    filename: &str,
    declared_mime: Option<&str>,
    size_bytes: u64,
    max_mb: u64,
) -> Result<AcceptedUpload, ValidationError> {
    if size_bytes > max_mb * 1024 * 1024 {
        return Err(ValidationError::new(format!("File is too large. Maximum size is {}MB.", max_mb)));
    }
    if size_bytes == 0 {
        return Err(ValidationError::new("The uploaded file is empty."));
    }

    let allowed = allowed_extensions(kind);
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.trim().to_lowercase())
        .unwrap_or_default();

    let unsupported = || {
        ValidationError::new(format!(
            "Unsupported file type '{}'. Allowed types: {}.",
            if extension.is_empty() { filename } else { extension.as_str() },
            allowed.join(", ")
        ))
    };

    if !allowed.contains(&extension.as_str()) {
        return Err(unsupported());
    }
    let canonical = mime_for_extension(&extension).ok_or_else(unsupported)?;

    // A declared MIME type must agree with one of the kind's accepted types.
    if let Some(declared) = declared_mime.map(str::trim).filter(|m| !m.is_empty() && *m != "application/octet-stream") {
        let accepted = allowed
            .iter()
            .filter_map(|ext| mime_for_extension(ext))
            .any(|mime| mime == declared);
        if !accepted {
            return Err(ValidationError::new(format!("Unsupported file type '{}'.", declared)));
        }
    }

    Ok(AcceptedUpload {
        extension,
        mime_type: canonical.to_string(),
        asset_kind: AssetKind::infer(canonical),
    })
}

/// Document file type derived from the MIME type at upload time.
pub fn document_file_type(mime_type: &str) -> Option<DocumentFileType> {
    match mime_type {
        "application/pdf" => Some(DocumentFileType::Pdf),
        "application/msword" | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
            Some(DocumentFileType::Word)
        }
        "application/vnd.ms-excel" | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
            Some(DocumentFileType::Excel)
        }
        "text/plain" => Some(DocumentFileType::Text),
        m if m.starts_with("image/") => Some(DocumentFileType::Image),
        _ => None,
    }
}

pub fn notice_file_type(mime_type: &str) -> Option<NoticeFileType> {
    match mime_type {
        "application/pdf" => Some(NoticeFileType::Pdf),
        m if m.starts_with("image/") => Some(NoticeFileType::Image),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn oversized_document_is_rejected_with_size_message() {
        let err = validate_upload(ResourceKind::Document, "annual-report.pdf", Some("application/pdf"), 15 * MB).unwrap_err();
        assert_eq!(err.0, "File is too large. Maximum size is 10MB.");
    }

    #[test]
    fn executable_is_rejected_with_type_message() {
        let err = validate_upload(ResourceKind::Document, "setup.exe", Some("application/x-msdownload"), 200_000).unwrap_err();
        assert!(err.0.starts_with("Unsupported file type 'exe'"), "{}", err.0);
    }

    #[test]
    fn notice_accepts_only_images_and_pdf() {
        assert!(validate_upload(ResourceKind::Notice, "poster.PNG", Some("image/png"), 10_000).is_ok());
        assert!(validate_upload(ResourceKind::Notice, "notice.pdf", None, 10_000).is_ok());
        assert!(validate_upload(ResourceKind::Notice, "notice.docx", None, 10_000).is_err());
    }

    #[test]
    fn document_accepts_office_formats() {
        let accepted = validate_upload(ResourceKind::Document, "prices.xlsx", Some("application/octet-stream"), 5_000).unwrap();
        assert_eq!(accepted.extension, "xlsx");
        assert_eq!(accepted.asset_kind, AssetKind::Raw);
        assert_eq!(document_file_type(&accepted.mime_type), Some(DocumentFileType::Excel));
    }

    #[test]
    fn mismatched_declared_mime_is_rejected() {
        assert!(validate_upload(ResourceKind::Notice, "photo.jpg", Some("application/zip"), 5_000).is_err());
    }

    #[test]
    fn file_type_mapping() {
        assert_eq!(notice_file_type("image/webp"), Some(NoticeFileType::Image));
        assert_eq!(notice_file_type("application/pdf"), Some(NoticeFileType::Pdf));
        assert_eq!(notice_file_type("text/plain"), None);
        assert_eq!(document_file_type("application/msword"), Some(DocumentFileType::Word));
        assert_eq!(AssetKind::infer("video/mp4"), AssetKind::Video);
    }
}
