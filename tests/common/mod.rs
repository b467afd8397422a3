use std::path::PathBuf;
use std::sync::Arc;

use actix_web::body::BoxBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{web, App};
use krishi_backend::helper::api_errors::ApiError;
use krishi_backend::helper::upload_helpers::LocalMediaHost;
use krishi_backend::setup::db_setup;
use krishi_backend::{routes, AppState, DbPool};
use r2d2_sqlite::SqliteConnectionManager;
use redb::Database;
use rusqlite::Connection;
use tempfile::TempDir;

/// Freshly set up databases and media directory in a temp dir. The dir is
/// removed when the context is dropped.
pub struct TestContext {
    pub dir: TempDir,
    pub db: web::Data<Database>,
    pub pool: web::Data<DbPool>,
    pub state: web::Data<AppState>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_activity_limit(100)
    }

    pub fn with_activity_limit(activity_limit: u32) -> Self {
        let dir = TempDir::new().unwrap();

        let db = Database::create(dir.path().join("resources.db")).unwrap();
        db_setup::setup_resources_db(&db).unwrap();

        let activity_path = dir.path().join("activity.db");
        let mut conn = Connection::open(&activity_path).unwrap();
        db_setup::setup_activity_db(&mut conn).unwrap();
        let pool = r2d2::Pool::builder()
            .max_size(2)
            .build(SqliteConnectionManager::file(&activity_path))
            .unwrap();

        let state = AppState {
            media_host: Arc::new(LocalMediaHost::new(dir.path().join("media"))),
            activity_limit,
            max_upload_mb: 10,
        };

        TestContext {
            dir,
            db: web::Data::new(db),
            pool: web::Data::new(pool),
            state: web::Data::new(state),
        }
    }

    pub fn media_path(&self) -> PathBuf {
        self.dir.path().join("media")
    }

    /// The `/api` routes with the same app data the server registers.
    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<BoxBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .app_data(self.db.clone())
            .app_data(self.pool.clone())
            .app_data(self.state.clone())
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                ApiError::Validation(format!("Invalid query string: {}", err)).into()
            }))
            .configure(routes::config_api)
    }
}
