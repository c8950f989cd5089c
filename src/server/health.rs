use actix_web::{HttpResponse, Responder, web};
use controlroom::context::AppContext;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    configured: bool,
    provider: &'static str,
    endpoint: String,
    fallback: FallbackReadiness,
}

#[derive(Serialize)]
struct FallbackReadiness {
    raildata_departures_ready: bool,
    raildata_arrivals_ready: bool,
}

#[actix_web::get("/health")]
pub async fn health(ctx: web::Data<Arc<AppContext>>) -> impl Responder {
    let config = &ctx.config;
    let provider = if config.signalbox_enabled() {
        "signalbox"
    } else if config.darwin_enabled() {
        "darwin"
    } else if config.raildata_departures_ready() || config.raildata_arrivals_ready() {
        "raildata"
    } else {
        "none"
    };

    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        configured: config.any_provider_configured(),
        provider,
        endpoint: config.darwin_base.clone(),
        fallback: FallbackReadiness {
            raildata_departures_ready: config.raildata_departures_ready(),
            raildata_arrivals_ready: config.raildata_arrivals_ready(),
        },
    })
}
