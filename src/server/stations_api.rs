use actix_web::{HttpResponse, Responder, web};
use controlroom::context::AppContext;
use controlroom::errors::FetchError;
use controlroom::stations::{self, Nearby, StationRecord, clamp_limit};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize, Clone, Debug)]
pub struct StationSearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct StationsNearQuery {
    pub code: String,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
struct StationSearchResponse {
    ok: bool,
    stations: Vec<StationRecord>,
}

#[derive(Serialize)]
struct StationsNearResponse {
    ok: bool,
    #[serde(flatten)]
    nearby: Nearby,
}

#[actix_web::get("/stations/search")]
pub async fn station_search(
    ctx: web::Data<Arc<AppContext>>,
    query: web::Query<StationSearchQuery>,
) -> impl Responder {
    let limit = clamp_limit(query.limit, 20);
    match stations::suggest_stations(ctx.as_ref(), &query.q, limit).await {
        Ok(matches) => HttpResponse::Ok().json(StationSearchResponse {
            ok: true,
            stations: matches,
        }),
        Err(err) => {
            log::warn!("station search failed: {}", err);
            HttpResponse::BadGateway()
                .json(serde_json::json!({"ok": false, "error": err.to_string(), "stations": []}))
        }
    }
}

#[actix_web::get("/stations/near")]
pub async fn stations_near(
    ctx: web::Data<Arc<AppContext>>,
    query: web::Query<StationsNearQuery>,
) -> impl Responder {
    let limit = clamp_limit(query.limit, 20);
    let code = query.code.trim().to_uppercase();
    if code.len() != 3 {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({"error": "code must be a 3-letter station code"}));
    }

    match stations::nearby_stations(ctx.as_ref(), &code, limit).await {
        Ok(nearby) => HttpResponse::Ok().json(StationsNearResponse { ok: true, nearby }),
        Err(FetchError::NoMatch(_)) => HttpResponse::NotFound()
            .json(serde_json::json!({"error": format!("unknown station code {}", code)})),
        Err(err) => HttpResponse::BadGateway().json(serde_json::json!({"error": err.to_string()})),
    }
}
