use actix_web::{HttpResponse, Responder, web};
use controlroom::context::AppContext;
use controlroom::errors::FetchError;
use controlroom::providers;
use std::sync::Arc;

/// Per-service detail: the configured Rail Data endpoint when one exists,
/// otherwise whatever the board fetch cached for this serviceID.
#[actix_web::get("/services/{id}")]
pub async fn service_details(
    ctx: web::Data<Arc<AppContext>>,
    path: web::Path<String>,
) -> impl Responder {
    let service_id = path.trim().to_string();
    if service_id.is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({"error": "service id required"}));
    }

    match providers::service_details(ctx.as_ref(), &service_id).await {
        Ok(detail) => HttpResponse::Ok().json(serde_json::json!({"ok": true, "service": detail})),
        Err(FetchError::UnknownService(_)) => HttpResponse::NotFound()
            .json(serde_json::json!({"error": format!("no details for service {}", service_id)})),
        Err(err) => HttpResponse::BadGateway().json(serde_json::json!({"error": err.to_string()})),
    }
}
