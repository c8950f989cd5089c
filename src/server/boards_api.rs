use actix_web::{HttpResponse, Responder, web};
use controlroom::board::Board;
use controlroom::context::AppContext;
use controlroom::errors::FetchError;
use controlroom::providers::{self, BoardType};
use controlroom::stations;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_ROWS: u32 = 10;

#[derive(Deserialize, Clone, Debug)]
pub struct BoardQuery {
    pub code: String,
    #[serde(rename = "type")]
    pub board_type: Option<String>,
    pub rows: Option<u32>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct LiveQuery {
    pub code: String,
    pub rows: Option<u32>,
}

#[derive(Serialize)]
struct BoardResponse {
    ok: bool,
    #[serde(rename = "type")]
    board_type: &'static str,
    provider: String,
    board: Board,
}

fn error_response(err: &FetchError) -> HttpResponse {
    let status = actix_web::http::StatusCode::from_u16(err.http_status())
        .unwrap_or(actix_web::http::StatusCode::BAD_GATEWAY);
    HttpResponse::build(status).json(serde_json::json!({"error": err.to_string()}))
}

fn clamp_rows(rows: Option<u32>) -> u32 {
    rows.unwrap_or(DEFAULT_ROWS).clamp(1, 100)
}

/// Accepts a bare CRS code or free text containing one. Invalid input is
/// rejected before any provider is queried.
async fn resolve_code(ctx: &AppContext, input: &str) -> Result<String, FetchError> {
    match stations::station_catalog(ctx).await {
        Ok(catalog) => stations::resolve_crs(&catalog, input),
        Err(err) => {
            // Catalog outage should not take live boards down with it.
            log::warn!("station catalog unavailable, falling back to shape check: {}", err);
            let code = input.trim().to_uppercase();
            if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
                Ok(code)
            } else {
                Err(FetchError::NoMatch(input.to_string()))
            }
        }
    }
}

#[actix_web::get("/boards")]
pub async fn boards(ctx: web::Data<Arc<AppContext>>, query: web::Query<BoardQuery>) -> impl Responder {
    let ctx = ctx.as_ref();
    let board_type = match query.board_type.as_deref() {
        None => BoardType::Departures,
        Some(raw) => match BoardType::parse(raw) {
            Some(bt) => bt,
            None => {
                return HttpResponse::BadRequest()
                    .json(serde_json::json!({"error": "type must be departures or arrivals"}));
            }
        },
    };

    let crs = match resolve_code(ctx, &query.code).await {
        Ok(crs) => crs,
        Err(err) => return error_response(&err),
    };

    match providers::fetch_board(ctx, &crs, board_type, clamp_rows(query.rows)).await {
        Ok(board) => HttpResponse::Ok().json(BoardResponse {
            ok: true,
            board_type: board_type.as_str(),
            provider: board.provider.to_string(),
            board,
        }),
        Err(err) => error_response(&err),
    }
}

/// Canonical provider only, no fallback chain: the raw Darwin view for
/// operators comparing sources.
#[actix_web::get("/live/{board_type}")]
pub async fn live_board(
    ctx: web::Data<Arc<AppContext>>,
    path: web::Path<String>,
    query: web::Query<LiveQuery>,
) -> impl Responder {
    let ctx = ctx.as_ref();
    let Some(board_type) = BoardType::parse(&path) else {
        return HttpResponse::NotFound()
            .json(serde_json::json!({"error": "unknown board type, use departures or arrivals"}));
    };

    let crs = match resolve_code(ctx, &query.code).await {
        Ok(crs) => crs,
        Err(err) => return error_response(&err),
    };

    match providers::fetch_canonical_board(ctx, &crs, board_type, clamp_rows(query.rows)).await {
        Ok(board) => HttpResponse::Ok().json(BoardResponse {
            ok: true,
            board_type: board_type.as_str(),
            provider: board.provider.to_string(),
            board,
        }),
        Err(err) => error_response(&err),
    }
}
