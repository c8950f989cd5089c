// Board session state and the repeating poll driving it. The session object
// replaces the module-level globals the dashboard used to keep: it owns the
// active station, the current board and the in-flight flag, and it dies with
// the layer that created it.

use crate::board::Board;
use crate::context::AppContext;
use crate::providers::{self, BoardType};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::time::MissedTickBehavior;

#[derive(Clone, Debug, PartialEq, Eq)]
struct ActiveStation {
    crs: String,
    board_type: BoardType,
}

#[derive(Debug, Default)]
pub struct BoardSession {
    active: RwLock<Option<ActiveStation>>,
    board: RwLock<Option<Board>>,
    in_flight: AtomicBool,
}

impl BoardSession {
    pub fn new() -> BoardSession {
        BoardSession::default()
    }

    /// Switch the active station. The previous board is dropped immediately
    /// rather than shown against the wrong code while the fetch is out.
    pub fn set_active(&self, crs: &str, board_type: BoardType) {
        let mut active = self.active.write().unwrap();
        let next = ActiveStation {
            crs: crs.to_uppercase(),
            board_type,
        };
        if active.as_ref() != Some(&next) {
            *self.board.write().unwrap() = None;
        }
        *active = Some(next);
    }

    pub fn clear_active(&self) {
        *self.active.write().unwrap() = None;
        *self.board.write().unwrap() = None;
    }

    pub fn active(&self) -> Option<(String, BoardType)> {
        self.active
            .read()
            .unwrap()
            .as_ref()
            .map(|a| (a.crs.clone(), a.board_type))
    }

    /// Store a fetched board, unless the station changed while the fetch was
    /// outstanding. A board for a stale code is discarded, never applied.
    pub fn apply_board(&self, fetched_for: &str, board: Board) -> bool {
        let active = self.active.read().unwrap();
        match active.as_ref() {
            Some(a) if a.crs == fetched_for.to_uppercase() => {
                // Replaces outright; boards are never merged.
                *self.board.write().unwrap() = Some(board);
                true
            }
            _ => false,
        }
    }

    pub fn current_board(&self) -> Option<Board> {
        self.board.read().unwrap().clone()
    }

    /// Claim the in-flight slot; false means a fetch is already running and
    /// this tick should be skipped.
    pub fn begin_fetch(&self) -> bool {
        !self.in_flight.swap(true, Ordering::SeqCst)
    }

    pub fn end_fetch(&self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }
}

/// One poll tick: resolve the active station's board through the provider
/// chain and apply it, guarding against overlap and stale responses.
pub async fn poll_once(ctx: &AppContext, session: &BoardSession, rows: u32) {
    let Some((crs, board_type)) = session.active() else {
        return;
    };
    if !session.begin_fetch() {
        log::debug!("poll tick skipped, previous fetch still in flight");
        return;
    }

    match providers::fetch_board(ctx, &crs, board_type, rows).await {
        Ok(board) => {
            if session.apply_board(&crs, board) {
                log::info!("board refreshed for {}", crs);
            } else {
                log::info!("discarded stale board for {}", crs);
            }
        }
        Err(err) => {
            log::warn!("poll fetch failed for {}: {}", crs, err);
        }
    }
    session.end_fetch();
}

/// Repeating timer that re-fetches the active board. Create on layer mount,
/// stop (or drop) on unmount.
#[derive(Debug)]
pub struct PollingController {
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl PollingController {
    pub fn start(ctx: Arc<AppContext>, session: Arc<BoardSession>, rows: u32) -> PollingController {
        let interval = ctx.config.poll_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // First tick fires immediately; skip it so mount-time callers
            // control the initial fetch themselves.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                poll_once(&ctx, &session, rows).await;
            }
        });
        PollingController {
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for PollingController {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderKind;

    fn board_for(crs: &str) -> Board {
        Board {
            generated_at: String::from("2026-08-26T10:00:00Z"),
            location_name: String::from("somewhere"),
            crs: crs.to_string(),
            nrcc_messages: Vec::new(),
            services: Vec::new(),
            provider: ProviderKind::Darwin,
        }
    }

    #[test]
    fn stale_response_is_discarded_after_station_change() {
        let session = BoardSession::new();
        session.set_active("KGX", BoardType::Departures);
        session.set_active("EUS", BoardType::Departures);

        // The KGX fetch resolves late; it must not overwrite EUS state.
        assert!(!session.apply_board("KGX", board_for("KGX")));
        assert!(session.current_board().is_none());

        assert!(session.apply_board("EUS", board_for("EUS")));
        assert_eq!(session.current_board().unwrap().crs, "EUS");
    }

    #[test]
    fn new_board_replaces_rather_than_merges() {
        let session = BoardSession::new();
        session.set_active("KGX", BoardType::Departures);

        let mut first = board_for("KGX");
        first.nrcc_messages.push(String::from("old message"));
        assert!(session.apply_board("KGX", first));

        assert!(session.apply_board("KGX", board_for("KGX")));
        assert!(session.current_board().unwrap().nrcc_messages.is_empty());
    }

    #[test]
    fn in_flight_flag_blocks_overlapping_fetches() {
        let session = BoardSession::new();
        assert!(session.begin_fetch());
        assert!(!session.begin_fetch());
        session.end_fetch();
        assert!(session.begin_fetch());
    }

    #[test]
    fn changing_station_clears_the_current_board() {
        let session = BoardSession::new();
        session.set_active("KGX", BoardType::Departures);
        assert!(session.apply_board("KGX", board_for("KGX")));
        session.set_active("YRK", BoardType::Departures);
        assert!(session.current_board().is_none());
    }

    #[test]
    fn board_type_change_counts_as_a_station_change() {
        let session = BoardSession::new();
        session.set_active("KGX", BoardType::Departures);
        assert!(session.apply_board("KGX", board_for("KGX")));
        session.set_active("KGX", BoardType::Arrivals);
        assert!(session.current_board().is_none());
        // Same code, so a late response still applies to the new view.
        assert!(session.apply_board("KGX", board_for("KGX")));
    }
}
