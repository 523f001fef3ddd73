use actix_multipart::MultipartError;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::borrow::Cow;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("File validation error: {0}")]
    Validation(Cow<'static, str>),
    #[error("File too large: {0}")]
    PayloadTooLarge(Cow<'static, str>),
    #[error("Unexpected field: {0}")]
    UnexpectedField(Cow<'static, str>),
    #[error("Bad Request: {0}")]
    BadRequest(Cow<'static, str>),
    #[error("Invalid filename: {0}")]
    InvalidFilename(Cow<'static, str>),
    #[error("Invalid file: {0}")]
    InvalidFile(Cow<'static, str>),
    #[error("Not Found: {0}")]
    NotFound(Cow<'static, str>),
    #[error("Route not found: {0}")]
    RouteNotFound(Cow<'static, str>),
    #[error("Permission denied: {0}")]
    Forbidden(Cow<'static, str>),
    #[error("CORS Error: {0}")]
    Cors(Cow<'static, str>),
    #[error("Internal Server Error")]
    InternalServer { detail: String, stack: String },
}

#[derive(serde::Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: &'static str,
    pub message: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

const INTERNAL_MESSAGE: &str = "Something went wrong";

impl Error {
    pub fn validation(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn route_not_found(method: &str, path: &str) -> Self {
        Self::RouteNotFound(format!("Cannot {} {}", method, path).into())
    }

    pub fn cors(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Cors(msg.into())
    }

    pub fn internal(err: &(dyn std::error::Error + 'static)) -> Self {
        Self::InternalServer { detail: err.to_string(), stack: format!("{:?}", err) }
    }

    /// Stable label carried in the `error` field of the response body.
    pub fn label(&self) -> &'static str {
        match self {
            Error::Validation(_) => "File validation error",
            Error::PayloadTooLarge(_) => "File too large",
            Error::UnexpectedField(_) => "Unexpected field",
            Error::BadRequest(_) => "Bad request",
            Error::InvalidFilename(_) => "Invalid filename",
            Error::InvalidFile(_) => "Invalid file",
            Error::NotFound(_) => "File not found",
            Error::RouteNotFound(_) => "Route not found",
            Error::Forbidden(_) => "Permission denied",
            Error::Cors(_) => "CORS Error",
            Error::InternalServer { .. } => "Internal server error",
        }
    }

    /// Response carrying the internal detail and debug chain. Only used in
    /// development mode; `None` for errors whose body is already complete.
    pub fn verbose_response(&self) -> Option<HttpResponse> {
        match self {
            Error::InternalServer { detail, stack } => {
                Some(HttpResponse::build(self.status_code()).json(ErrorBody {
                    success: false,
                    error: self.label(),
                    message: detail.clone().into(),
                    stack: Some(stack.clone()),
                }))
            }
            _ => None,
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match *self {
            Error::Validation(_)
            | Error::UnexpectedField(_)
            | Error::BadRequest(_)
            | Error::InvalidFilename(_)
            | Error::InvalidFile(_) => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::NotFound(_) | Error::RouteNotFound(_) => StatusCode::NOT_FOUND,
            Error::Forbidden(_) | Error::Cors(_) => StatusCode::FORBIDDEN,
            Error::InternalServer { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            Error::Validation(msg)
            | Error::PayloadTooLarge(msg)
            | Error::UnexpectedField(msg)
            | Error::BadRequest(msg)
            | Error::InvalidFilename(msg)
            | Error::InvalidFile(msg)
            | Error::NotFound(msg)
            | Error::RouteNotFound(msg)
            | Error::Forbidden(msg)
            | Error::Cors(msg) => msg.clone(),
            Error::InternalServer { .. } => INTERNAL_MESSAGE.into(),
        };

        HttpResponse::build(self.status_code()).json(ErrorBody {
            success: false,
            error: self.label(),
            message,
            stack: None,
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SystemError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Multipart Error: {0}")]
    Multipart(#[from] MultipartError),
    #[error("Configuration Error: {0}")]
    Config(String),
    // Custom Errors
    #[error("Validation Error: {0}")]
    Validation(Cow<'static, str>),
    #[error("File exceeds the maximum allowed size of {limit} bytes")]
    PayloadTooLarge { limit: u64 },
    #[error("Unexpected field: {0}")]
    UnexpectedField(String),
    #[error("Invalid filename: {0}")]
    InvalidFilename(Cow<'static, str>),
    #[error("Invalid file: {0}")]
    InvalidFile(Cow<'static, str>),
    #[error("Not Found: {0}")]
    NotFound(Cow<'static, str>),
}

impl SystemError {
    pub fn validation(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_filename(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidFilename(msg.into())
    }

    pub fn invalid_file(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidFile(msg.into())
    }
}

/// Multipart failures caused by a request that is not a multipart form at
/// all; treated as "no file uploaded".
fn is_not_multipart(err: &MultipartError) -> bool {
    matches!(
        err,
        MultipartError::ContentTypeMissing
            | MultipartError::ContentTypeParse
            | MultipartError::ContentTypeIncompatible
            | MultipartError::BoundaryMissing
    )
}

impl From<SystemError> for Error {
    fn from(value: SystemError) -> Self {
        match value {
            SystemError::Validation(msg) => Error::Validation(msg),
            SystemError::PayloadTooLarge { .. } => Error::PayloadTooLarge(value.to_string().into()),
            SystemError::UnexpectedField(name) => {
                Error::UnexpectedField(format!("Unexpected field '{}'", name).into())
            }
            SystemError::InvalidFilename(msg) => Error::InvalidFilename(msg),
            SystemError::InvalidFile(msg) => Error::InvalidFile(msg),
            SystemError::NotFound(msg) => Error::NotFound(msg),
            SystemError::Multipart(ref err) if is_not_multipart(err) => {
                Error::Validation("No file uploaded".into())
            }
            SystemError::Multipart(err) => {
                log::warn!("Malformed multipart body: {}", err);
                Error::BadRequest("Malformed multipart body".into())
            }
            SystemError::Io(ref err) if err.kind() == std::io::ErrorKind::NotFound => {
                Error::NotFound("File not found".into())
            }
            SystemError::Io(ref err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
                log::warn!("Permission denied: {}", err);
                Error::Forbidden("Permission denied".into())
            }
            _ => {
                log::error!("Internal Server Error: {:?}", value);
                Error::internal(&value)
            }
        }
    }
}

impl From<MultipartError> for Error {
    fn from(value: MultipartError) -> Self {
        SystemError::from(value).into()
    }
}
