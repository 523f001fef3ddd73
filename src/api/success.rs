use actix_web::{http::StatusCode, HttpResponse};
use std::borrow::Cow;

#[derive(serde::Serialize)]
pub struct SuccessData<T: serde::Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Cow<'static, str>>,
    #[serde(flatten)]
    pub data: Option<T>,
}

pub struct Success<T: serde::Serialize> {
    pub status: StatusCode,
    pub body: SuccessData<T>,
}

impl<T: serde::Serialize> Success<T> {
    fn with_status(status: StatusCode, data: Option<T>) -> Self {
        Self { status, body: SuccessData { success: true, message: None, data } }
    }

    pub fn ok(data: Option<T>) -> Self {
        Self::with_status(StatusCode::OK, data)
    }

    pub fn created(data: Option<T>) -> Self {
        Self::with_status(StatusCode::CREATED, data)
    }

    pub fn message<M>(mut self, msg: M) -> Self
    where
        M: Into<Cow<'static, str>>,
    {
        self.body.message = Some(msg.into());
        self
    }
}

impl<T: serde::Serialize> actix_web::Responder for Success<T> {
    type Body = actix_web::body::BoxBody;

    fn respond_to(self, _req: &actix_web::HttpRequest) -> HttpResponse<Self::Body> {
        HttpResponse::build(self.status).json(self.body)
    }
}
