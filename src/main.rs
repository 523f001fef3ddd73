use actix_web::{web, HttpServer};
use std::sync::Arc;

use crate::modules::{
    file_upload::{FileUploadService, LocalFileRepository, UploadConfig},
    health::StartedAt,
};

mod api;
mod configs;
mod constants;
mod middlewares;
mod modules;
#[cfg(test)]
mod test;
mod utils;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let env = constants::Env::from_env().map_err(|e| std::io::Error::other(e.to_string()))?;
    let file_repo = LocalFileRepository::new(configs::resolve_upload_dir(&env.upload_dir)?);
    log::info!("Storing uploads in {}", file_repo.root().display());

    let file_service =
        web::Data::new(FileUploadService::new(Arc::new(file_repo), UploadConfig::from_env(&env)));
    let started_at = web::Data::new(StartedAt::now());

    let (ip, port, workers) = (env.ip.clone(), env.port, env.workers);
    log::info!("File API running at {}/ ({:?} mode)", env.base_url, env.mode);
    let env = web::Data::new(env);

    HttpServer::new(move || {
        configs::create_app(env.clone(), file_service.clone(), started_at.clone())
    })
    .bind((ip.as_str(), port))?
    .workers(workers)
    .run()
    .await
}
