use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::{Request, Response};
use rocket_okapi::OpenApiError;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::Responses;
use rocket_okapi::response::OpenApiResponderInner;
use schemars::JsonSchema;
use serde::Serialize;

/// Envelope shared by every JSON response: `{ status, message, data }`.
#[derive(Serialize, Debug, JsonSchema)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::with_status(Status::Ok, message, data)
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::with_status(Status::Created, message, data)
    }

    pub fn with_status(status: Status, message: impl Into<String>, data: T) -> Self {
        Self {
            status: status.code,
            message: message.into(),
            data,
        }
    }
}

impl<'r, T: Serialize> Responder<'r, 'static> for ApiResponse<T> {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = Status::from_code(self.status).unwrap_or(Status::Ok);
        Response::build_from(Json(self).respond_to(req)?).status(status).ok()
    }
}

impl<T: Serialize + JsonSchema + Send> OpenApiResponderInner for ApiResponse<T> {
    fn responses(generator: &mut OpenApiGenerator) -> Result<Responses, OpenApiError> {
        Json::<ApiResponse<T>>::responses(generator)
    }
}
