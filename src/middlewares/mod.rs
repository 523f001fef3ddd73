use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    middleware::{DefaultHeaders, Next},
    web, Error, HttpRequest, HttpResponse, ResponseError,
};

use crate::{api::error, constants::Env};

/// Rewrites error responses produced further down the chain: CORS rejections
/// become `403 CORS Error`, and in development mode internal errors carry
/// their detail.
pub async fn error_mapping<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<BoxBody>, Error>
where
    B: MessageBody + 'static,
{
    let development =
        req.app_data::<web::Data<Env>>().map(|env| env.is_development()).unwrap_or(false);

    let res = next.call(req).await?;

    let replacement = res.response().error().and_then(|err| remap(err, development));
    match replacement {
        Some(response) => Ok(res.into_response(response)),
        None => Ok(res.map_into_boxed_body()),
    }
}

fn remap(err: &Error, development: bool) -> Option<HttpResponse> {
    if let Some(cors) = err.as_error::<actix_cors::CorsError>() {
        log::warn!("CORS request rejected: {}", cors);
        return Some(error::Error::cors(cors.to_string()).error_response());
    }
    if development {
        return err.as_error::<error::Error>().and_then(error::Error::verbose_response);
    }
    None
}

pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
        .add(("Referrer-Policy", "no-referrer"))
        .add(("Cross-Origin-Resource-Policy", "cross-origin"))
}

/// Fallback for every unmatched route
pub async fn route_not_found(req: HttpRequest) -> Result<HttpResponse, error::Error> {
    Err(error::Error::route_not_found(req.method().as_str(), req.path()))
}
