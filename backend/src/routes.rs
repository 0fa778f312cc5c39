use actix_files::Files;
use actix_web::{HttpResponse, web};
use log::{error, info, warn};
use shared::{GENERATE_PATH, GenerateRequest};
use uuid::Uuid;

use crate::gemini::gemini_service::GeminiService;
use crate::gemini::models::{HealthResponse, RelayError};

/// Base64 photos run well past actix's default JSON limit.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

pub fn configure_routes(cfg: &mut web::ServiceConfig, frontend_dir: String) {
    cfg.app_data(web::JsonConfig::default().limit(MAX_BODY_BYTES))
        .service(web::resource(GENERATE_PATH).route(web::post().to(generate)))
        .service(web::resource("/api/health").route(web::get().to(health)))
        .service(Files::new("/", frontend_dir).index_file("index.html"));
}

async fn generate(
    service: web::Data<GeminiService>,
    body: web::Json<GenerateRequest>,
) -> Result<HttpResponse, RelayError> {
    let request_id = Uuid::new_v4();
    let request = body.into_inner();

    if request.image().is_none() {
        warn!("[{}] Generate request carries no image", request_id);
    }
    info!("[{}] Relaying generate request", request_id);

    match service.generate(&request).await {
        Ok(response) => {
            if response.first_image().is_none() {
                warn!("[{}] Upstream answered without an image", request_id);
            } else {
                info!("[{}] Upstream returned an image", request_id);
            }
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            error!("[{}] Generate failed ({}): {}", request_id, e.kind(), e);
            Err(e)
        }
    }
}

async fn health(service: web::Data<GeminiService>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        credential_configured: service.is_configured(),
    })
}
