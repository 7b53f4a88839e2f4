use crate::models::response::ApiResponse;
use rocket::http::Status;
use rocket::{Request, catch};

fn envelope(status: Status, message: &str) -> ApiResponse<()> {
    ApiResponse::with_status(status, message, ())
}

#[catch(400)]
pub fn bad_request(_: &Request) -> ApiResponse<()> {
    envelope(Status::BadRequest, "Bad request")
}

#[catch(401)]
pub fn unauthorized(_: &Request) -> ApiResponse<()> {
    envelope(Status::Unauthorized, "Unauthorized")
}

#[catch(404)]
pub fn not_found(_: &Request) -> ApiResponse<()> {
    envelope(Status::NotFound, "Not found")
}

#[catch(409)]
pub fn conflict(_: &Request) -> ApiResponse<()> {
    envelope(Status::Conflict, "Conflict")
}

#[catch(422)]
pub fn unprocessable_entity(_: &Request) -> ApiResponse<()> {
    envelope(Status::UnprocessableEntity, "Request body is not valid JSON for this endpoint")
}

#[catch(500)]
pub fn internal_error(_: &Request) -> ApiResponse<()> {
    envelope(Status::InternalServerError, "Internal server error")
}

#[catch(default)]
pub fn default_catcher(status: Status, _: &Request) -> ApiResponse<()> {
    envelope(status, status.reason().unwrap_or("Unknown error"))
}

pub fn catchers() -> Vec<rocket::Catcher> {
    rocket::catchers![bad_request, unauthorized, not_found, conflict, unprocessable_entity, internal_error, default_catcher]
}
