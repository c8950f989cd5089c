// Rail Data Marketplace static-subscription fallback. Endpoint URLs are
// pasted from "My Feeds" as templates; each feed has its own key with the
// shared marketplace key as fallback.

use crate::board::{Board, ServiceDetail, normalize_native_board};
use crate::context::AppContext;
use crate::errors::FetchError;
use crate::providers::{BoardType, ProviderKind, get_json, render_template};
use serde_json::Value;

/// Hosts the generic passthrough proxy may reach. Anything else is refused
/// before a request is built.
pub const ALLOWED_PROXY_HOSTS: &[&str] = &[
    "opendata.nationalrail.co.uk",
    "hsp-prod.rockshore.net",
    "api.nationalrail.co.uk",
    "api1.raildata.org.uk",
    "api.raildata.org.uk",
];

pub fn is_allowed_upstream(raw: &str) -> bool {
    let Ok(parsed) = url::Url::parse(raw.trim()) else {
        return false;
    };
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return false;
    }
    parsed
        .host_str()
        .map(|host| {
            let host = host.to_lowercase();
            ALLOWED_PROXY_HOSTS.iter().any(|allowed| *allowed == host)
        })
        .unwrap_or(false)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProxyAuth {
    Token,
    ApiKey,
    Basic,
    None,
}

impl ProxyAuth {
    pub fn parse(input: &str) -> Option<ProxyAuth> {
        match input.trim().to_ascii_lowercase().as_str() {
            "" | "token" => Some(ProxyAuth::Token),
            "apikey" => Some(ProxyAuth::ApiKey),
            "basic" => Some(ProxyAuth::Basic),
            "none" => Some(ProxyAuth::None),
            _ => None,
        }
    }
}

fn feed_key<'a>(specific: Option<&'a str>, shared: Option<&'a str>) -> Result<&'a str, FetchError> {
    specific.or(shared).ok_or(FetchError::NotConfigured)
}

/// Response keys the marketplace auth endpoints have been seen to use.
const TOKEN_FIELDS: &[&str] = &["token", "authToken", "authenticationToken", "accessToken"];

/// X-Auth-Token for the passthrough proxy: the direct env token wins, then
/// the cached minted token, then a credential exchange against the
/// marketplace auth endpoints. `NotConfigured` means neither a token nor
/// credentials are set.
pub async fn proxy_auth_token(ctx: &AppContext) -> Result<String, FetchError> {
    if let Some(direct) = ctx.config.raildata_auth_token.as_deref() {
        return Ok(direct.to_string());
    }
    if let Some(cached) = ctx.auth_token_cache.read().unwrap().clone() {
        return Ok(cached);
    }
    let (Some(username), Some(password)) = (
        ctx.config.raildata_username.as_deref(),
        ctx.config.raildata_password.as_deref(),
    ) else {
        return Err(FetchError::NotConfigured);
    };

    let token = mint_auth_token(ctx, username, password).await?;
    *ctx.auth_token_cache.write().unwrap() = Some(token.clone());
    Ok(token)
}

/// The marketplace has shipped the login route under two paths and two
/// payload field names; try each combination until one yields a token.
async fn mint_auth_token(
    ctx: &AppContext,
    username: &str,
    password: &str,
) -> Result<String, FetchError> {
    let attempts = [
        ("/api/v1/token", "username"),
        ("/api/v1/authenticate", "username"),
        ("/api/v1/token", "email"),
        ("/api/v1/authenticate", "email"),
    ];
    for (path, field) in attempts {
        let url = format!("{}{}", ctx.config.raildata_auth_base, path);
        let payload = serde_json::json!({ field: username, "password": password });
        let response = match ctx
            .client
            .post(&url)
            .header("Accept", "application/json")
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                log::debug!("auth attempt {} failed: {}", path, err);
                continue;
            }
        };
        if !response.status().is_success() {
            continue;
        }
        let Ok(raw) = response.json::<Value>().await else {
            continue;
        };
        for key in TOKEN_FIELDS {
            if let Some(token) = raw.get(*key).and_then(Value::as_str) {
                let token = token.trim();
                if !token.is_empty() {
                    return Ok(token.to_string());
                }
            }
        }
    }
    Err(FetchError::Transport {
        provider: ProviderKind::Raildata,
        message: String::from("unable to authenticate with the marketplace auth endpoints"),
    })
}

pub async fn fetch_board(
    ctx: &AppContext,
    crs: &str,
    board_type: BoardType,
) -> Result<Board, FetchError> {
    let config = &ctx.config;
    let (template, key) = match board_type {
        BoardType::Departures => (
            config.raildata_departure_url.as_deref(),
            feed_key(
                config.raildata_departure_key.as_deref(),
                config.raildata_api_key.as_deref(),
            )?,
        ),
        BoardType::Arrivals => (
            config.raildata_board_url.as_deref(),
            feed_key(
                config.raildata_board_key.as_deref(),
                config.raildata_api_key.as_deref(),
            )?,
        ),
    };
    let template = template.ok_or(FetchError::NotConfigured)?;
    let url = render_template(template, &[("crs", crs)])?;
    let raw = get_json(
        &ctx.client,
        ProviderKind::Raildata,
        &url,
        &[("x-apikey", key.to_string())],
    )
    .await?;

    Ok(normalize_native_board(&raw, crs, ProviderKind::Raildata))
}

fn field(raw: &Value, keys: &[&str]) -> String {
    for key in keys {
        if let Some(text) = raw.get(key).and_then(Value::as_str) {
            let text = text.trim();
            if !text.is_empty() {
                return text.to_string();
            }
        }
    }
    String::new()
}

pub async fn fetch_service_details(
    ctx: &AppContext,
    service_id: &str,
) -> Result<ServiceDetail, FetchError> {
    let config = &ctx.config;
    let template = config
        .service_details_url
        .as_deref()
        .ok_or(FetchError::NotConfigured)?;
    let key = feed_key(
        config.service_details_key.as_deref(),
        config.raildata_api_key.as_deref(),
    )?;
    let url = render_template(template, &[("serviceid", service_id)])?;
    let raw = get_json(
        &ctx.client,
        ProviderKind::Raildata,
        &url,
        &[("x-apikey", key.to_string())],
    )
    .await?;

    let resolved_id = field(&raw, &["serviceID", "serviceId"]);
    Ok(ServiceDetail {
        service_id: if resolved_id.is_empty() {
            service_id.to_string()
        } else {
            resolved_id
        },
        operator: field(&raw, &["operator"]),
        std: field(&raw, &["std"]),
        etd: field(&raw, &["etd"]),
        sta: field(&raw, &["sta"]),
        eta: field(&raw, &["eta"]),
        platform: field(&raw, &["platform"]),
        location_name: field(&raw, &["locationName"]),
        delay_reason: field(&raw, &["delayReason"]),
        cancel_reason: field(&raw, &["cancelReason"]),
    })
}
