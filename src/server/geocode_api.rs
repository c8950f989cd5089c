use actix_web::{HttpResponse, Responder, web};
use controlroom::context::AppContext;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize, Clone, Debug)]
pub struct GeoSearchQuery {
    pub q: String,
    pub limit: Option<u32>,
}

/// Geocoder passthrough (Nominatim jsonv2). The upstream body goes back
/// verbatim; the route plotter parses it on its side of the wire too.
#[actix_web::get("/geo/search")]
pub async fn geo_search(
    ctx: web::Data<Arc<AppContext>>,
    query: web::Query<GeoSearchQuery>,
) -> impl Responder {
    let q = query.q.trim();
    if q.is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({"error": "q query parameter required"}));
    }

    let url = format!(
        "{}?q={}&format=jsonv2&limit={}",
        ctx.config.geocoder_base,
        urlencoding::encode(q),
        query.limit.unwrap_or(1).clamp(1, 10)
    );

    let response = ctx
        .client
        .get(&url)
        .header("Accept", "application/json")
        .send()
        .await;

    match response {
        Ok(upstream) => {
            let status = actix_web::http::StatusCode::from_u16(upstream.status().as_u16())
                .unwrap_or(actix_web::http::StatusCode::BAD_GATEWAY);
            let content_type = upstream
                .headers()
                .get("Content-Type")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("application/json")
                .to_string();
            match upstream.bytes().await {
                Ok(body) => HttpResponse::build(status)
                    .insert_header(("Content-Type", content_type))
                    .body(body),
                Err(err) => HttpResponse::BadGateway()
                    .json(serde_json::json!({"error": "geocoder failed", "detail": err.to_string()})),
            }
        }
        Err(err) => HttpResponse::BadGateway()
            .json(serde_json::json!({"error": "geocoder failed", "detail": err.to_string()})),
    }
}
