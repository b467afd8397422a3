use actix_cors::Cors;
use actix_web::{web, App, HttpServer, middleware::{Logger, DefaultHeaders}, HttpResponse, Responder};
use krishi_backend::{
    config::{Config, MediaHostMode},
    helper::api_errors::ApiError,
    helper::upload_helpers::{HttpMediaHost, LocalMediaHost, MediaHost},
    routes,
    AppState,
};
use redb::Database;
use r2d2_sqlite::SqliteConnectionManager;
use r2d2::Pool;
use std::fs;
use std::sync::Arc;
use clap::Parser;
use std::path::PathBuf;

/// A simple handler for the root URL.
async fn root_handler() -> impl Responder {
    HttpResponse::Ok().content_type("text/plain").body("OK")
}

#[derive(Parser, Debug)]
#[command(name = "krishi_server", author, version, about = "Starts the content backend web server.")]
struct Cli {
    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    // Load configuration first
    let config = Config::from_env(&cli.env_file)
        .expect("FATAL: Failed to load or parse configuration.");

    // Initialize logger using the value from config
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    fs::create_dir_all(&config.media_path)
        .expect("Failed to create media directory");

    let redb_db_data = web::Data::new(Database::open(config.resources_db_path())
        .expect("FATAL: resources.db not found. Run 'cargo run --bin setup_cli -- --env-file <path> db setup'"));

    let activity_db_path = config.activity_db_path();
    if !activity_db_path.exists() {
        panic!("FATAL: activity.db not found. Run 'cargo run --bin setup_cli -- --env-file <path> db setup'");
    }
    let manager = SqliteConnectionManager::file(activity_db_path);
    let pool = Pool::builder()
        .build(manager)
        .expect("FATAL: Failed to create Rusqlite connection pool.");

    let media_host: Arc<dyn MediaHost> = match (&config.media_host, &config.remote_media) {
        (MediaHostMode::Remote, Some(remote)) => {
            log::info!("Uploads go to the remote media host at {}", remote.base_url);
            Arc::new(HttpMediaHost::new(remote.clone()))
        }
        (MediaHostMode::Remote, None) => panic!("FATAL: MEDIA_HOST=remote but the remote media settings are missing."),
        (MediaHostMode::Local, _) => {
            log::info!("Uploads are stored under {}", config.media_path);
            Arc::new(LocalMediaHost::new(&config.media_path))
        }
    };

    let app_state = web::Data::new(AppState {
        media_host,
        activity_limit: config.activity_log_limit,
        max_upload_mb: config.max_upload_size_mb,
    });

    let server_address = format!("{}:{}", config.web.host, config.web.port);
    log::info!("Server starting at http://{}", server_address);

    HttpServer::new(move || {
        let cors = {
            let allowed_origins_str = &config.allowed_origins;
            let headers = vec![
                actix_web::http::header::ACCEPT,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::HeaderName::from_static("x-actor"),
            ];
            if allowed_origins_str.trim() == "*" {
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
                    .allowed_headers(headers)
                    .max_age(3600)
            } else {
                let mut cors = Cors::default();
                let origins: Vec<&str> = allowed_origins_str.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
                for origin in origins {
                    cors = cors.allowed_origin(origin);
                }
                cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
                    .allowed_headers(headers)
                    .max_age(3600)
            }
        };

        // Uploads are limited per file in the handler; leave room for form overhead.
        let payload_limit = (config.max_upload_size_mb as usize + 1) * 1024 * 1024;

        App::new()
            .wrap(cors)
            .wrap(Logger::default().exclude("/api/is_server_active"))
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("X-XSS-Protection", "1; mode=block"))
            )
            .app_data(redb_db_data.clone())
            .app_data(web::Data::new(pool.clone()))
            .app_data(app_state.clone())
            .app_data(web::PayloadConfig::new(payload_limit))
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                ApiError::Validation(format!("Invalid query string: {}", err)).into()
            }))
            .configure(routes::config_api)
            .service(actix_files::Files::new("/media", &config.media_path))
            .route("/", web::get().to(root_handler))
    })
    .bind(server_address)?
    .run()
    .await
}
