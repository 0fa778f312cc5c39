mod config;
mod gemini;
mod routes;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use config::RelayConfig;
use gemini::gemini_service::GeminiService;
use routes::configure_routes;
use std::env;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    dotenv::dotenv().ok();
    let config = RelayConfig::from_env();

    let gemini_service = GeminiService::new(&config).map_err(|e| {
        log::error!("Failed to build the upstream HTTP client: {}", e);
        std::io::Error::other(format!("HTTP client setup failed: {}", e))
    })?;

    if config.credential_configured() {
        log::info!("Gemini credential detected, relaying to {}", gemini_service.endpoint());
    } else {
        log::warn!(
            "GEMINI_API_KEY is not set. Every generate request will fail until it is added to .env."
        );
    }

    let frontend_dir = config.frontend_dir.clone();
    let bind_address = config.bind_address();
    log::info!("Serving frontend from {}", frontend_dir);
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(web::Data::new(gemini_service.clone()))
            .configure(|cfg| configure_routes(cfg, frontend_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
