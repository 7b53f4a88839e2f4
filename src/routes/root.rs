use crate::models::response::ApiResponse;
use rocket::get;
use rocket_okapi::openapi;

const AVAILABLE_ROUTES: [&str; 11] = [
    "GET /health",
    "POST /auth/register",
    "POST /auth/login",
    "POST /auth/refresh",
    "POST /auth/logout",
    "GET /contacts",
    "POST /contacts",
    "GET /contacts/{id}",
    "PUT /contacts/{id}",
    "PATCH /contacts/{id}",
    "DELETE /contacts/{id}",
];

/// Welcome message listing the available endpoints
#[openapi(tag = "Root")]
#[get("/")]
pub async fn welcome() -> ApiResponse<Vec<String>> {
    ApiResponse::ok("Welcome to the Contacts API", AVAILABLE_ROUTES.iter().map(|route| route.to_string()).collect())
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![welcome]
}
