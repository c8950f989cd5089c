use actix_web::{HttpResponse, Responder, web};
use controlroom::context::AppContext;
use controlroom::errors::FetchError;
use controlroom::providers::raildata::{
    ALLOWED_PROXY_HOSTS, ProxyAuth, is_allowed_upstream, proxy_auth_token,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize, Clone, Debug)]
pub struct ProxyQuery {
    pub url: String,
    pub auth: Option<String>,
}

/// Generic Rail Data passthrough for feeds without a dedicated route. The
/// host allow-list is checked before any credential is attached.
#[actix_web::get("/proxy")]
pub async fn raildata_proxy(
    ctx: web::Data<Arc<AppContext>>,
    query: web::Query<ProxyQuery>,
) -> impl Responder {
    let ctx = ctx.as_ref();
    let upstream_url = query.url.trim();
    if upstream_url.is_empty() {
        return HttpResponse::BadRequest().json(serde_json::json!({"error": "url query parameter required"}));
    }
    if !is_allowed_upstream(upstream_url) {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "blocked upstream host",
            "url": upstream_url,
            "allowed_hosts": ALLOWED_PROXY_HOSTS,
        }));
    }
    let Some(auth) = ProxyAuth::parse(query.auth.as_deref().unwrap_or("")) else {
        return HttpResponse::BadRequest()
            .json(serde_json::json!({"error": "auth must be token|apikey|basic|none"}));
    };

    let config = &ctx.config;
    let mut request = ctx
        .client
        .get(upstream_url)
        .header("Accept", "application/json, application/xml, text/xml, text/plain");

    match auth {
        ProxyAuth::Token => match proxy_auth_token(ctx).await {
            Ok(token) => request = request.header("X-Auth-Token", token),
            Err(FetchError::NotConfigured) => {
                return HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "RAILDATA credentials not set (use RAILDATA_AUTH_TOKEN or RAILDATA_USERNAME/RAILDATA_PASSWORD)"
                }));
            }
            Err(err) => {
                return HttpResponse::BadGateway()
                    .json(serde_json::json!({"error": err.to_string()}));
            }
        },
        ProxyAuth::ApiKey => {
            let Some(key) = config.raildata_api_key.as_deref() else {
                return HttpResponse::InternalServerError()
                    .json(serde_json::json!({"error": "RAILDATA_API_KEY env var not set"}));
            };
            request = request.header("x-apikey", key);
        }
        ProxyAuth::Basic => {
            let (Some(username), Some(password)) = (
                config.raildata_username.as_deref(),
                config.raildata_password.as_deref(),
            ) else {
                return HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "RAILDATA_USERNAME and RAILDATA_PASSWORD required for basic auth"
                }));
            };
            request = request.basic_auth(username, Some(password));
        }
        ProxyAuth::None => {}
    }

    match request.send().await {
        Ok(upstream) => {
            // A rejected minted token is stale; drop it so the next request
            // re-authenticates.
            if upstream.status().as_u16() == 401
                && auth == ProxyAuth::Token
                && config.raildata_auth_token.is_none()
            {
                ctx.clear_auth_token();
            }
            let status = actix_web::http::StatusCode::from_u16(upstream.status().as_u16())
                .unwrap_or(actix_web::http::StatusCode::BAD_GATEWAY);
            let content_type = upstream
                .headers()
                .get("Content-Type")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("application/octet-stream")
                .to_string();
            match upstream.bytes().await {
                Ok(body) => HttpResponse::build(status)
                    .insert_header(("Content-Type", content_type))
                    .body(body),
                Err(err) => HttpResponse::BadGateway()
                    .json(serde_json::json!({"error": "upstream failed", "detail": err.to_string()})),
            }
        }
        Err(err) => HttpResponse::BadGateway()
            .json(serde_json::json!({"error": "upstream failed", "detail": err.to_string()})),
    }
}
