use actix_multipart::Multipart;
use actix_web::{
    http::header::{self, ContentDisposition, DispositionParam, DispositionType},
    web, HttpRequest, HttpResponse,
};
use futures_util::TryStreamExt;

use crate::api::{error, success};
use crate::constants::FILE_FIELD;
use crate::modules::file_upload::{
    model::IncomingFile, repository::FileRepository, schema::FileUploadResponse,
    service::FileUploadService,
};

fn declared_length(req: &HttpRequest) -> Option<u64> {
    req.headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

/// Upload file handler
pub async fn upload_file<R>(
    req: HttpRequest,
    payload: Multipart,
    service: web::Data<FileUploadService<R>>,
) -> Result<success::Success<FileUploadResponse>, error::Error>
where
    R: FileRepository + Send + Sync + 'static,
{
    service.check_declared_length(declared_length(&req))?;

    let mut uploaded = None;
    if let Err(e) = receive_file(payload, &service, &mut uploaded).await {
        // A file stored before a later field failed the request
        if let Some(file) = uploaded {
            service.discard(&file.filename).await;
        }
        return Err(e.into());
    }

    match uploaded {
        Some(file) => {
            Ok(success::Success::created(Some(file)).message("File uploaded successfully"))
        }
        None => Err(error::Error::validation("No file uploaded")),
    }
}

/// Walks the multipart fields and stores the single `file` field into
/// `uploaded`. Fields without a filename are drained and ignored.
async fn receive_file<R>(
    mut payload: Multipart,
    service: &FileUploadService<R>,
    uploaded: &mut Option<FileUploadResponse>,
) -> Result<(), error::SystemError>
where
    R: FileRepository + Send + Sync + 'static,
{
    while let Some(mut field) = payload.try_next().await? {
        let original_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .filter(|name| !name.is_empty())
            .map(str::to_owned);

        let Some(original_name) = original_name else {
            while field.try_next().await?.is_some() {}
            continue;
        };

        let field_name = field.name().unwrap_or_default().to_owned();
        if field_name != FILE_FIELD || uploaded.is_some() {
            return Err(error::SystemError::UnexpectedField(field_name));
        }

        let mime_type = field
            .content_type()
            .map(|m| m.essence_str().to_ascii_lowercase())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let incoming = IncomingFile { original_name, mime_type };
        *uploaded = Some(service.upload_file(incoming, field).await?);
    }

    Ok(())
}

/// Serve a stored file by name
pub async fn get_file<R>(
    filename: web::Path<String>,
    service: web::Data<FileUploadService<R>>,
) -> Result<HttpResponse, error::Error>
where
    R: FileRepository + Send + Sync + 'static,
{
    let (file, bytes) = service.get_file(&filename.into_inner()).await?;
    log::debug!("Serving {} ({} bytes)", file.name, file.size);

    let content_type = mime_guess::from_path(&file.name).first_or_octet_stream();
    let mut response = HttpResponse::Ok();
    response.content_type(content_type.essence_str()).insert_header(ContentDisposition {
        disposition: DispositionType::Inline,
        parameters: vec![DispositionParam::Filename(file.name.clone())],
    });
    if let Some(modified) = file.modified {
        response.insert_header(header::LastModified(modified.into()));
    }

    Ok(response.body(bytes))
}
