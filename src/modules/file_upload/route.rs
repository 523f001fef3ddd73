use actix_web::web;

use crate::middlewares::route_not_found;
use crate::modules::file_upload::repository::FileRepository;

pub fn configure<R>(cfg: &mut web::ServiceConfig)
where
    R: FileRepository + Send + Sync + 'static,
{
    cfg.service(
        web::resource("/upload")
            .route(web::post().to(crate::modules::file_upload::handle::upload_file::<R>))
            .default_service(web::to(route_not_found)),
    )
    .service(
        web::resource("/files/{filename}")
            .route(web::get().to(crate::modules::file_upload::handle::get_file::<R>))
            .default_service(web::to(route_not_found)),
    );
}
