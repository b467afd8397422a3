pub mod activity_helpers;
pub mod api_errors;
pub mod form_helpers;
pub mod upload_helpers;
pub mod verification_helpers;
