use crate::helper::api_errors::{success_with, ApiError};
use crate::models::db_operations::resource_db_operations;
use crate::models::{Notice, Product};
use actix_web::{web, HttpResponse, Responder};
use redb::Database;
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilterQuery {
    in_stock: Option<bool>,
}

/// Read-only routes for the public site. The admin list endpoints return
/// everything; filtering for visitors happens here.
pub fn config_public(cfg: &mut web::ServiceConfig) {
    cfg.route("/is_server_active", web::get().to(is_server_active))
        .route("/public/notices", web::get().to(get_active_notices))
        .route("/public/notices/popup", web::get().to(get_popup_notices))
        .route("/public/products", web::get().to(get_public_products));
}

async fn is_server_active() -> impl Responder {
    HttpResponse::Ok().body("active")
}

async fn get_active_notices(db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    let notices: Vec<Notice> = resource_db_operations::list::<Notice>(&db)?
        .into_iter()
        .filter(|n| n.is_active)
        .collect();
    success_with("notices", &notices)
}

async fn get_popup_notices(db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    let notices: Vec<Notice> = resource_db_operations::list::<Notice>(&db)?
        .into_iter()
        .filter(|n| n.is_active && n.show_as_popup)
        .collect();
    success_with("notices", &notices)
}

async fn get_public_products(
    db: web::Data<Database>,
    query: web::Query<ProductFilterQuery>,
) -> Result<HttpResponse, ApiError> {
    let products: Vec<Product> = resource_db_operations::list::<Product>(&db)?
        .into_iter()
        .filter(|p| query.in_stock.map_or(true, |wanted| p.in_stock == wanted))
        .collect();
    success_with("products", &products)
}
