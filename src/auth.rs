use crate::config::Config;
use crate::database::SharedRepository;
use crate::error::app_error::{AppError, UNAUTHORIZED_DESCRIPTION};
use crate::models::user::{Role, UserResponse};
use crate::service::auth::AuthService;
use crate::service::password::PasswordHasher;
use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{FromRequest, Outcome as RequestOutcome, Request};
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::{Object, Responses, SecurityRequirement, SecurityScheme, SecuritySchemeData};
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};
use serde::Serialize;
use uuid::Uuid;

/// Identity resolved from a valid access token.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<UserResponse> for CurrentUser {
    fn from(user: UserResponse) -> Self {
        CurrentUser {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub(crate) fn parse_bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for CurrentUser {
    type Error = AppError;

    async fn from_request(req: &'r Request<'_>) -> RequestOutcome<Self, Self::Error> {
        let Some(access_token) = req.headers().get_one("Authorization").and_then(parse_bearer_token) else {
            return Outcome::Error((Status::Unauthorized, AppError::Unauthorized));
        };

        let rocket = req.rocket();
        let (Some(repository), Some(config), Some(hasher)) = (
            rocket.state::<SharedRepository>(),
            rocket.state::<Config>(),
            rocket.state::<PasswordHasher>(),
        ) else {
            return Outcome::Error((
                Status::InternalServerError,
                AppError::Configuration("authentication state is not managed".to_string()),
            ));
        };

        let service = AuthService::new(repository.as_ref(), &config.session, hasher);
        match service.validate_access(access_token).await {
            Ok(user) => {
                let current_user = CurrentUser::from(user);
                req.local_cache(|| Some(current_user.clone()));
                Outcome::Success(current_user)
            }
            Err(err) => Outcome::Error((Status::from(&err), err)),
        }
    }
}

impl<'a> OpenApiFromRequest<'a> for CurrentUser {
    fn from_request_input(_gen: &mut OpenApiGenerator, _name: String, _required: bool) -> rocket_okapi::Result<RequestHeaderInput> {
        let security_scheme = SecurityScheme {
            description: Some("Access token returned by POST /auth/login or POST /auth/refresh.".to_string()),
            data: SecuritySchemeData::Http {
                scheme: "bearer".to_string(),
                bearer_format: Some("opaque".to_string()),
            },
            extensions: Object::default(),
        };

        let mut security_req = SecurityRequirement::new();
        security_req.insert("bearerAuth".to_string(), Vec::new());

        Ok(RequestHeaderInput::Security("bearerAuth".to_string(), security_scheme, security_req))
    }

    fn get_responses(_gen: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        use rocket_okapi::okapi::openapi3::{RefOr, Response};
        let mut responses = Responses::default();
        responses.responses.insert(
            "401".to_string(),
            RefOr::Object(Response {
                description: UNAUTHORIZED_DESCRIPTION.to_string(),
                ..Default::default()
            }),
        );
        Ok(responses)
    }
}
