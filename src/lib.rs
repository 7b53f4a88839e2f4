mod auth;
mod config;
mod database;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod service;

#[cfg(test)]
pub mod test_utils;

pub use config::{Config, ConfigError};

use crate::database::SharedRepository;
use crate::db::stage_db;
use crate::middleware::RequestLogger;
use crate::routes as app_routes;
use crate::service::password::PasswordHasher;
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket, http::Method};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_okapi::swagger_ui::{SwaggerUIConfig, make_swagger_ui};
use rocket_okapi::{get_openapi_route, okapi::merge::marge_spec_list};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub fn init_tracing(log_level: &str, json_format: bool) {
    // RUST_LOG takes precedence over the configured level, e.g.
    //   RUST_LOG=contacts_api::service=debug
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_line_number(true);

    if json_format {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Private session cookies are encrypted with the Rocket secret key, so any
/// profile other than debug must supply one.
pub fn ensure_rocket_secret_key() -> Result<(), String> {
    let profile = std::env::var("ROCKET_PROFILE").unwrap_or_else(|_| "debug".to_string());

    if profile != "debug" && std::env::var("ROCKET_SECRET_KEY").is_err() {
        return Err(format!(
            "ROCKET_SECRET_KEY is required for profile '{}'. Generate one with: openssl rand -base64 32",
            profile
        ));
    }
    Ok(())
}

fn build_cors(cors_config: &config::CorsConfig) -> CorsOptions {
    let is_wildcard = cors_config.allowed_origins.iter().any(|origin| origin == "*");

    let allowed_origins = if is_wildcard {
        AllowedOrigins::all()
    } else {
        AllowedOrigins::some_exact(&cors_config.allowed_origins.iter().map(String::as_str).collect::<Vec<_>>())
    };

    CorsOptions {
        allowed_origins,
        allowed_methods: vec![
            Method::Get,
            Method::Post,
            Method::Put,
            Method::Delete,
            Method::Patch,
            Method::Options,
            Method::Head,
        ]
        .into_iter()
        .map(From::from)
        .collect(),
        allowed_headers: rocket_cors::AllowedHeaders::some(&["Content-Type", "Authorization", "Accept", "X-Request-Id"]),
        expose_headers: ["X-Request-Id".to_string()].into_iter().collect(),
        allow_credentials: cors_config.allow_credentials,
        ..Default::default()
    }
}

fn stage_cors(cors_config: config::CorsConfig) -> AdHoc {
    AdHoc::try_on_ignite("CORS", |rocket| async move {
        match build_cors(&cors_config).to_cors() {
            Ok(cors) => Ok(rocket.attach(cors)),
            Err(e) => {
                error!("Failed to create CORS fairing: {}", e);
                Err(rocket)
            }
        }
    })
}

fn stage_password_hasher(password_config: config::PasswordConfig) -> AdHoc {
    AdHoc::try_on_ignite("Password hasher", |rocket| async move {
        match PasswordHasher::new(&password_config) {
            Ok(hasher) => Ok(rocket.manage(hasher)),
            Err(e) => {
                error!(error = ?e, "Failed to initialize password hasher");
                Err(rocket)
            }
        }
    })
}

struct RouteSpec {
    path: &'static str,
    routes: Vec<rocket::Route>,
    openapi: rocket_okapi::okapi::openapi3::OpenApi,
}

fn collect_route_specs() -> Vec<RouteSpec> {
    let (root_routes, root_openapi) = app_routes::root::routes();
    let (health_routes, health_openapi) = app_routes::health::routes();
    let (auth_routes, auth_openapi) = app_routes::auth::routes();
    let (contact_routes, contact_openapi) = app_routes::contact::routes();

    vec![
        RouteSpec {
            path: "/",
            routes: root_routes,
            openapi: root_openapi,
        },
        RouteSpec {
            path: "/health",
            routes: health_routes,
            openapi: health_openapi,
        },
        RouteSpec {
            path: "/auth",
            routes: auth_routes,
            openapi: auth_openapi,
        },
        RouteSpec {
            path: "/contacts",
            routes: contact_routes,
            openapi: contact_openapi,
        },
    ]
}

fn mount_api_routes(mut rocket: Rocket<Build>, enable_swagger: bool) -> Rocket<Build> {
    let route_specs = collect_route_specs();

    let mut openapi_list = Vec::new();
    for spec in route_specs {
        rocket = rocket.mount(spec.path, spec.routes);
        // Paths inside each OpenAPI document already start with '/'
        openapi_list.push((spec.path.trim_end_matches('/'), spec.openapi));
    }

    if !enable_swagger {
        return rocket;
    }

    match marge_spec_list(&openapi_list) {
        Ok(openapi_docs) => {
            let settings = rocket_okapi::settings::OpenApiSettings::default();
            rocket = rocket.mount("/", vec![get_openapi_route(openapi_docs, &settings)]);
            rocket.mount(
                "/docs",
                make_swagger_ui(&SwaggerUIConfig {
                    url: "/openapi.json".to_string(),
                    ..Default::default()
                }),
            )
        }
        Err(err) => {
            error!("Could not merge OpenAPI spec, API docs disabled: {}", err);
            rocket
        }
    }
}

/// Everything except the repository: routes, catchers, fairings and shared config.
fn build_base(config: Config) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("port", config.server.port))
        .merge(("address", config.server.address.clone()));

    let rocket = rocket::custom(figment)
        .attach(stage_cors(config.cors.clone()))
        .attach(RequestLogger)
        .attach(stage_password_hasher(config.password.clone()));

    let rocket = mount_api_routes(rocket, config.api.enable_swagger).register("/", app_routes::error::catchers());

    info!(port = config.server.port, swagger = config.api.enable_swagger, "rocket configured");
    rocket.manage(config)
}

/// Builds the service backed by PostgreSQL.
pub fn build_rocket(config: Config) -> Rocket<Build> {
    let database = config.database.clone();
    build_base(config).attach(stage_db(database))
}

/// Builds the service on top of an already constructed repository.
pub fn build_rocket_with_repository(config: Config, repository: SharedRepository) -> Rocket<Build> {
    build_base(config).manage(repository)
}
