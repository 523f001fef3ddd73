use actix_cors::Cors;
use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    http::header,
    middleware::{from_fn, Logger},
    web, App,
};
use std::path::{Path, PathBuf};

use crate::{
    constants::Env,
    middlewares::{error_mapping, route_not_found, security_headers},
    modules::{
        file_upload::{self, FileUploadService, LocalFileRepository},
        health::{self, StartedAt},
    },
};

const LOG_FORMAT: &str = "%r %s %b - %D ms";

/// Absolute upload directory, created if missing. Relative paths are taken
/// from the current working directory.
pub fn resolve_upload_dir(dir: &Path) -> std::io::Result<PathBuf> {
    let dir = if dir.is_absolute() { dir.to_path_buf() } else { std::env::current_dir()?.join(dir) };
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn build_cors(env: &Env) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .supports_credentials()
        .block_on_origin_mismatch(true)
        .max_age(3600);

    if env.allows_any_origin() {
        return cors.allow_any_origin();
    }
    env.allowed_origins.iter().fold(cors, |cors, origin| cors.allowed_origin(origin))
}

pub fn create_app(
    env: web::Data<Env>,
    file_service: web::Data<FileUploadService<LocalFileRepository>>,
    started_at: web::Data<StartedAt>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let cors = build_cors(&env);

    App::new()
        .app_data(env)
        .app_data(file_service)
        .app_data(started_at)
        .service(
            web::scope("/api")
                .configure(health::configure)
                .configure(file_upload::route::configure::<LocalFileRepository>),
        )
        .default_service(web::to(route_not_found))
        .wrap(cors)
        .wrap(from_fn(error_mapping))
        .wrap(security_headers())
        .wrap(Logger::new(LOG_FORMAT))
}
