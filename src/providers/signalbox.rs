use crate::board::{Board, normalize_alias_board};
use crate::context::AppContext;
use crate::errors::FetchError;
use crate::providers::{BoardType, ProviderKind, get_json};

/// Signalbox rows come back in whatever shape the API version feels like, so
/// the board goes through the alias-table normalizer rather than the native
/// LDBWS one.
pub async fn fetch_board(
    ctx: &AppContext,
    crs: &str,
    board_type: BoardType,
    rows: u32,
) -> Result<Board, FetchError> {
    let key = ctx
        .config
        .signalbox_key
        .as_deref()
        .ok_or(FetchError::NotConfigured)?;

    let url = format!(
        "{}/boards?station={}&type={}&limit={}",
        ctx.config.signalbox_base,
        urlencoding::encode(crs),
        board_type.as_str(),
        rows
    );
    let raw = get_json(
        &ctx.client,
        ProviderKind::Signalbox,
        &url,
        &[("Authorization", format!("Bearer {}", key))],
    )
    .await?;

    Ok(normalize_alias_board(&raw, crs, ProviderKind::Signalbox))
}
