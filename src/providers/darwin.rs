use crate::board::{Board, normalize_native_board};
use crate::context::AppContext;
use crate::errors::FetchError;
use crate::providers::{BoardType, ProviderKind, get_json};

/// Canonical live board source: the Darwin LDBWS JSON API on the Rail Data
/// Marketplace, `x-apikey` auth.
pub async fn fetch_board(
    ctx: &AppContext,
    crs: &str,
    board_type: BoardType,
    rows: u32,
) -> Result<Board, FetchError> {
    let key = ctx
        .config
        .darwin_key
        .as_deref()
        .ok_or(FetchError::NotConfigured)?;

    let method = match board_type {
        BoardType::Departures => "GetDepartureBoard",
        BoardType::Arrivals => "GetArrivalBoard",
    };
    let url = format!(
        "{}/{}/{}?numRows={}",
        ctx.config.darwin_base,
        method,
        urlencoding::encode(crs),
        rows
    );
    let raw = get_json(
        &ctx.client,
        ProviderKind::Darwin,
        &url,
        &[("x-apikey", key.to_string())],
    )
    .await?;

    Ok(normalize_native_board(&raw, crs, ProviderKind::Darwin))
}
