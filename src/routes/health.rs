use crate::models::response::ApiResponse;
use rocket::get;
use rocket_okapi::openapi;

/// Liveness probe
#[openapi(tag = "Health")]
#[get("/")]
pub async fn healthcheck() -> ApiResponse<()> {
    ApiResponse::ok("OK", ())
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![healthcheck]
}
