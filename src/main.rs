use contacts_api::{Config, build_rocket, ensure_rocket_secret_key, init_tracing};

#[rocket::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.level, config.logging.json_format);

    if let Err(err) = ensure_rocket_secret_key() {
        tracing::error!("{}", err);
        std::process::exit(1);
    }

    if let Err(err) = build_rocket(config).launch().await {
        tracing::error!(error = %err, "server failed");
        std::process::exit(1);
    }
}
