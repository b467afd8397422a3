use crate::helper::activity_helpers;
use crate::helper::api_errors::{success_with, ApiError};
use crate::helper::form_helpers::{self, JsonMap};
use crate::helper::upload_helpers;
use crate::middleware::Actor;
use crate::models::db_operations::activity_db_operations;
use crate::models::db_operations::resource_db_operations::{self, DbError, UpdateOutcome};
use crate::models::object_id::is_valid_object_id;
use crate::models::{
    ActivityAction, CarouselSlide, Document, Factory, MailSubmission, MediaItem, Notice, Product, Resource,
    TeamMember, ValidationError,
};
use crate::{AppState, DbPool};
use actix_web::{web, HttpResponse};
use redb::Database;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
pub struct IdQuery {
    id: Option<String>,
}

#[derive(Deserialize)]
pub struct ActivityQuery {
    limit: Option<u32>,
}

pub fn config_resources(cfg: &mut web::ServiceConfig) {
    cfg.configure(resource_routes::<Product>)
        .configure(resource_routes::<Document>)
        .configure(resource_routes::<Notice>)
        .configure(resource_routes::<TeamMember>)
        .configure(resource_routes::<MediaItem>)
        .configure(resource_routes::<CarouselSlide>)
        .configure(resource_routes::<MailSubmission>)
        .configure(resource_routes::<Factory>)
        .route("/activity-logs", web::get().to(list_activity_logs));
}

fn resource_routes<R: Resource>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource(format!("/{}", R::KIND.path()))
            .route(web::get().to(list_resources::<R>))
            .route(web::post().to(create_resource::<R>))
            .route(web::put().to(update_resource::<R>))
            .route(web::delete().to(delete_resource::<R>)),
    );
}

/// Rejects anything that is not a 24-hex id before storage is touched.
fn checked_id(raw: Option<&str>, source: &str) -> Result<String, ApiError> {
    let id = raw.filter(|id| !id.is_empty()).ok_or_else(|| {
        ApiError::Validation(format!("'id' {} is required.", source))
    })?;
    if !is_valid_object_id(id) {
        return Err(ApiError::Validation(format!("Invalid id format: '{}'.", id)));
    }
    Ok(id.to_string())
}

fn not_found<R: Resource>() -> ApiError {
    let noun = R::KIND.noun();
    let mut chars = noun.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    ApiError::NotFound(format!("{} not found.", capitalized))
}

async fn list_resources<R: Resource>(db: web::Data<Database>) -> Result<HttpResponse, ApiError> {
    let records = resource_db_operations::list::<R>(&db)?;
    success_with(R::KIND.collection(), &records)
}

async fn create_resource<R: Resource>(
    db: web::Data<Database>,
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
    actor: Actor,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let payload = form_helpers::parse_json_object(&body)?;
    let entity = R::from_payload(&payload)?;
    let created = resource_db_operations::create(&db, entity)?;

    log::info!("{} created {} {}", actor.name(), R::KIND.noun(), created.meta().id);
    activity_helpers::record(&pool, ActivityAction::Create, R::KIND, &created.label(), actor.name(), state.activity_limit);
    success_with(R::KIND.singular(), &created)
}

async fn update_resource<R: Resource>(
    db: web::Data<Database>,
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
    actor: Actor,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let payload = form_helpers::parse_json_object(&body)?;
    let raw_id = match payload.get("id") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.as_str()),
        Some(_) => return Err(ValidationError::new("'id' must be a string.").into()),
    };
    let id = checked_id(raw_id, "in the request body")?;
    let expected_version = form_helpers::optional_u64(&payload, "version")?;

    // Same required fields and defaults as create; the normalized entity becomes the patch.
    let entity = R::from_payload(&payload)?;
    let mut patch: JsonMap = match serde_json::to_value(&entity).map_err(DbError::from)? {
        Value::Object(map) => map,
        _ => return Err(ApiError::Internal(format!("{} did not serialize to an object", R::KIND.noun()))),
    };
    for field in R::DEFAULTED_FIELDS {
        let omitted = match payload.get(*field) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        };
        if omitted {
            patch.remove(*field);
        }
    }

    match resource_db_operations::update::<R>(&db, &id, &patch, expected_version)? {
        UpdateOutcome::Updated(updated) => {
            log::info!("{} updated {} {}", actor.name(), R::KIND.noun(), id);
            activity_helpers::record(&pool, ActivityAction::Update, R::KIND, &updated.label(), actor.name(), state.activity_limit);
            success_with(R::KIND.singular(), &updated)
        }
        UpdateOutcome::NotFound => Err(not_found::<R>()),
        UpdateOutcome::Conflict { current } => Err(ApiError::Conflict(format!(
            "This {} was changed by someone else (current version {}). Reload it and try again.",
            R::KIND.noun(),
            current
        ))),
    }
}

async fn delete_resource<R: Resource>(
    db: web::Data<Database>,
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
    actor: Actor,
    query: web::Query<IdQuery>,
) -> Result<HttpResponse, ApiError> {
    let id = checked_id(query.id.as_deref(), "query parameter")?;

    let removed = resource_db_operations::remove::<R>(&db, &id)?.ok_or_else(not_found::<R>)?;
    log::info!("{} deleted {} {}", actor.name(), R::KIND.noun(), id);

    // The record is gone either way; a stale asset is only logged.
    if let Some((storage_id, kind)) = removed.stored_asset() {
        upload_helpers::delete_asset(state.media_host.as_ref(), storage_id, kind).await;
    }

    activity_helpers::record(&pool, ActivityAction::Delete, R::KIND, &removed.label(), actor.name(), state.activity_limit);
    Ok(HttpResponse::Ok().json(json!({ "success": true })))
}

async fn list_activity_logs(
    pool: web::Data<DbPool>,
    state: web::Data<AppState>,
    query: web::Query<ActivityQuery>,
) -> Result<HttpResponse, ApiError> {
    let limit = query.limit.unwrap_or(state.activity_limit).clamp(1, state.activity_limit);
    let pool = pool.into_inner();

    let entries = web::block(move || -> Result<_, DbError> {
        let conn = pool.get()?;
        Ok(activity_db_operations::read_recent(&conn, limit)?)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    success_with("activityLogs", &entries)
}
