use crate::config::Config;
use crate::database::SharedRepository;
use crate::error::app_error::AppError;
use crate::error::json::JsonBody;
use crate::models::response::ApiResponse;
use crate::models::session::{IssuedSession, LoginResponse, RefreshResponse};
use crate::models::user::{LoginRequest, RegisterRequest, UserResponse};
use crate::service::auth::AuthService;
use crate::service::password::PasswordHasher;
use rocket::http::{Cookie, CookieJar, SameSite};
use rocket::response::status::NoContent;
use rocket::time::OffsetDateTime;
use rocket::{State, post};
use rocket_okapi::openapi;
use uuid::Uuid;
use validator::Validate;

pub const SESSION_ID_COOKIE: &str = "sessionId";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

fn session_cookie(name: &'static str, value: String, issued: &IssuedSession, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, value))
        .http_only(true)
        .same_site(SameSite::None)
        .secure(secure)
        .path("/")
        .build();

    if let Ok(expires) = OffsetDateTime::from_unix_timestamp(issued.session.refresh_token_expires_at.timestamp()) {
        cookie.set_expires(expires);
    }
    cookie
}

fn set_session_cookies(cookies: &CookieJar<'_>, issued: &IssuedSession, secure: bool) {
    cookies.add_private(session_cookie(SESSION_ID_COOKIE, issued.session.id.to_string(), issued, secure));
    cookies.add_private(session_cookie(REFRESH_TOKEN_COOKIE, issued.refresh_token.clone(), issued, secure));
}

/// Removal cookies carry the same attributes as the ones login set, otherwise
/// browsers ignore them on cross-site responses.
fn removal_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    Cookie::build(name).http_only(true).same_site(SameSite::None).secure(secure).path("/").build()
}

fn clear_session_cookies(cookies: &CookieJar<'_>, secure: bool) {
    cookies.remove_private(removal_cookie(SESSION_ID_COOKIE, secure));
    cookies.remove_private(removal_cookie(REFRESH_TOKEN_COOKIE, secure));
}

fn session_id_from_cookies(cookies: &CookieJar<'_>) -> Option<Uuid> {
    cookies
        .get_private(SESSION_ID_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

/// Register a new account. Does not log the user in.
#[openapi(tag = "Auth")]
#[post("/register", data = "<payload>")]
pub async fn register(
    repository: &State<SharedRepository>,
    config: &State<Config>,
    hasher: &State<PasswordHasher>,
    payload: JsonBody<RegisterRequest>,
) -> Result<ApiResponse<UserResponse>, AppError> {
    payload.validate()?;

    let service = AuthService::new(repository.inner().as_ref(), &config.session, hasher.inner());
    let user = service.register(&payload.name, &payload.email, &payload.password).await?;

    Ok(ApiResponse::created("Successfully registered a user!", user))
}

/// Log in, replacing any existing session of the user
#[openapi(tag = "Auth")]
#[post("/login", data = "<payload>")]
pub async fn login(
    repository: &State<SharedRepository>,
    config: &State<Config>,
    hasher: &State<PasswordHasher>,
    cookies: &CookieJar<'_>,
    payload: JsonBody<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, AppError> {
    payload.validate()?;

    let service = AuthService::new(repository.inner().as_ref(), &config.session, hasher.inner());
    let (issued, user) = service.login(&payload.email, &payload.password).await?;

    set_session_cookies(cookies, &issued, config.session.cookie_secure);

    Ok(ApiResponse::ok(
        "Successfully logged in an user!",
        LoginResponse {
            access_token: issued.access_token,
            user,
        },
    ))
}

/// Exchange the refresh cookie for a new session
#[openapi(tag = "Auth")]
#[post("/refresh")]
pub async fn refresh(
    repository: &State<SharedRepository>,
    config: &State<Config>,
    hasher: &State<PasswordHasher>,
    cookies: &CookieJar<'_>,
) -> Result<ApiResponse<RefreshResponse>, AppError> {
    let session_id = session_id_from_cookies(cookies).ok_or(AppError::Unauthorized)?;
    let refresh_token = cookies
        .get_private(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or(AppError::Unauthorized)?;

    let service = AuthService::new(repository.inner().as_ref(), &config.session, hasher.inner());
    let issued = service.refresh(&session_id, &refresh_token).await?;

    set_session_cookies(cookies, &issued, config.session.cookie_secure);

    Ok(ApiResponse::ok(
        "Successfully refreshed a session!",
        RefreshResponse {
            access_token: issued.access_token,
        },
    ))
}

/// End the session named by the `sessionId` cookie and clear both cookies
#[openapi(tag = "Auth")]
#[post("/logout")]
pub async fn logout(
    repository: &State<SharedRepository>,
    config: &State<Config>,
    hasher: &State<PasswordHasher>,
    cookies: &CookieJar<'_>,
) -> Result<NoContent, AppError> {
    let session_id = session_id_from_cookies(cookies);
    clear_session_cookies(cookies, config.session.cookie_secure);

    if let Some(session_id) = session_id {
        let service = AuthService::new(repository.inner().as_ref(), &config.session, hasher.inner());
        service.logout(&session_id).await?;
    }

    Ok(NoContent)
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![register, login, refresh, logout]
}
