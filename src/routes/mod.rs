use actix_web::web;

pub mod api;
pub mod public;
pub mod upload;

/// Everything under `/api`. Kept in one scope so resource, public and upload
/// routes share a prefix without shadowing each other.
pub fn config_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(public::config_public)
            .configure(upload::config_upload)
            .configure(api::config_resources),
    );
}
