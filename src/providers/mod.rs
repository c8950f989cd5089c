// Live board provider resolution.
//
// Providers are an ordered list of tagged variants; the orchestrator walks
// the enabled ones in priority order and short-circuits on the first board.

pub mod darwin;
pub mod raildata;
pub mod signalbox;

use crate::board::{Board, ServiceDetail};
use crate::context::AppContext;
use crate::errors::{FetchError, truncate_snippet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Signalbox,
    Darwin,
    Raildata,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::Signalbox => "signalbox",
            ProviderKind::Darwin => "darwin",
            ProviderKind::Raildata => "raildata",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardType {
    Departures,
    Arrivals,
}

impl BoardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoardType::Departures => "departures",
            BoardType::Arrivals => "arrivals",
        }
    }

    pub fn parse(input: &str) -> Option<BoardType> {
        match input.trim().to_ascii_lowercase().as_str() {
            "departures" | "departure" | "dep" => Some(BoardType::Departures),
            "arrivals" | "arrival" | "arr" => Some(BoardType::Arrivals),
            _ => None,
        }
    }
}

/// Providers with usable credentials, highest priority first.
pub fn enabled_chain(ctx: &AppContext) -> Vec<ProviderKind> {
    let config = &ctx.config;
    let mut chain = Vec::new();
    if config.signalbox_enabled() {
        chain.push(ProviderKind::Signalbox);
    }
    if config.darwin_enabled() {
        chain.push(ProviderKind::Darwin);
    }
    if config.raildata_departures_ready() || config.raildata_arrivals_ready() {
        chain.push(ProviderKind::Raildata);
    }
    chain
}

/// Walk the chain, short-circuiting on the first provider that yields a
/// board. A lone attempt surfaces its own error; two or more surface a
/// combined error carrying every failure message.
pub async fn resolve_board_with<F, Fut>(chain: &[ProviderKind], fetch_one: F) -> Result<Board, FetchError>
where
    F: Fn(ProviderKind) -> Fut,
    Fut: Future<Output = Result<Board, FetchError>>,
{
    if chain.is_empty() {
        return Err(FetchError::NotConfigured);
    }

    let mut failures: Vec<(ProviderKind, FetchError)> = Vec::new();
    for kind in chain {
        match fetch_one(*kind).await {
            Ok(board) => return Ok(board),
            Err(err) => {
                log::warn!("{} board fetch failed: {}", kind, err);
                failures.push((*kind, err));
            }
        }
    }

    if failures.len() == 1 {
        let (_, err) = failures.remove(0);
        return Err(err);
    }
    Err(FetchError::Exhausted {
        attempts: failures
            .into_iter()
            .map(|(kind, err)| (kind, err.to_string()))
            .collect(),
    })
}

async fn fetch_from(
    ctx: &AppContext,
    kind: ProviderKind,
    crs: &str,
    board_type: BoardType,
    rows: u32,
) -> Result<Board, FetchError> {
    match kind {
        ProviderKind::Signalbox => signalbox::fetch_board(ctx, crs, board_type, rows).await,
        ProviderKind::Darwin => darwin::fetch_board(ctx, crs, board_type, rows).await,
        ProviderKind::Raildata => raildata::fetch_board(ctx, crs, board_type).await,
    }
}

/// Resolve a live board for a station code through the provider chain and
/// stash each parsed row in the service-detail cache.
pub async fn fetch_board(
    ctx: &AppContext,
    crs: &str,
    board_type: BoardType,
    rows: u32,
) -> Result<Board, FetchError> {
    let chain = enabled_chain(ctx);
    let board =
        resolve_board_with(&chain, |kind| fetch_from(ctx, kind, crs, board_type, rows)).await?;
    Ok(finalize_board(ctx, board))
}

/// Canonical-provider fetch, no fallback chain. Same post-processing as the
/// chain path so rows seen only here are still detail-cacheable.
pub async fn fetch_canonical_board(
    ctx: &AppContext,
    crs: &str,
    board_type: BoardType,
    rows: u32,
) -> Result<Board, FetchError> {
    let board = darwin::fetch_board(ctx, crs, board_type, rows).await?;
    Ok(finalize_board(ctx, board))
}

fn finalize_board(ctx: &AppContext, mut board: Board) -> Board {
    if board.generated_at.is_empty() {
        board.generated_at = chrono::Utc::now().to_rfc3339();
    }
    cache_services(ctx, &board);
    board
}

fn cache_services(ctx: &AppContext, board: &Board) {
    for svc in &board.services {
        if svc.service_id.is_empty() {
            continue;
        }
        ctx.service_cache.insert(
            svc.service_id.clone(),
            ServiceDetail::from_service(svc, &board.location_name),
        );
    }
}

/// Detail lookup: the configured per-service endpoint when one exists, the
/// board-fill cache otherwise (or when the endpoint fails).
pub async fn service_details(ctx: &AppContext, service_id: &str) -> Result<ServiceDetail, FetchError> {
    if ctx.config.service_details_url.is_some() {
        match raildata::fetch_service_details(ctx, service_id).await {
            Ok(detail) => return Ok(detail),
            Err(err) => {
                log::warn!("service detail endpoint failed for {}: {}", service_id, err);
            }
        }
    }
    ctx.service_cache
        .get(service_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| FetchError::UnknownService(service_id.to_string()))
}

/// Substitute `{name}` placeholders, URL-encoding each value. Placeholders
/// with no value are collected and reported as an error.
pub fn render_template(template: &str, values: &[(&str, &str)]) -> Result<String, FetchError> {
    let mut out = template.to_string();
    let mut missing = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        let key = &rest[start + 1..start + end];
        if !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            match values.iter().find(|(name, _)| *name == key) {
                Some((_, value)) if !value.trim().is_empty() => {
                    out = out.replace(
                        &format!("{{{}}}", key),
                        urlencoding::encode(value.trim()).as_ref(),
                    );
                }
                _ => missing.push(key.to_string()),
            }
        }
        rest = &rest[start + end + 1..];
    }
    if missing.is_empty() {
        Ok(out)
    } else {
        missing.sort();
        missing.dedup();
        Err(FetchError::MissingTemplateValues(missing))
    }
}

pub(crate) async fn get_json(
    client: &reqwest::Client,
    provider: ProviderKind,
    url: &str,
    headers: &[(&str, String)],
) -> Result<Value, FetchError> {
    let mut request = client.get(url).header("Accept", "application/json");
    for (name, value) in headers {
        request = request.header(*name, value);
    }
    let response = request.send().await.map_err(|e| FetchError::Transport {
        provider,
        message: e.to_string(),
    })?;
    let status = response.status();
    let body = response.text().await.map_err(|e| FetchError::Transport {
        provider,
        message: e.to_string(),
    })?;
    if !status.is_success() {
        return Err(FetchError::Network {
            provider,
            status: status.as_u16(),
            snippet: truncate_snippet(&body),
        });
    }
    serde_json::from_str(&body).map_err(|e| FetchError::Transport {
        provider,
        message: format!("invalid JSON: {}", e),
    })
}
