use crate::board::ServiceDetail;
use crate::config::Config;
use crate::stations::StationRecord;
use dashmap::DashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::OnceCell;

/// Shared state for one running instance: config, the HTTP client, and the
/// process-lifetime memoization caches. Handlers receive this instead of
/// touching globals.
pub struct AppContext {
    pub config: Config,
    pub client: reqwest::Client,
    /// serviceID -> detail record, filled as board rows are parsed.
    pub service_cache: DashMap<String, ServiceDetail>,
    /// place name -> (lat, lon). Unbounded; station-name cardinality is small.
    pub geocode_cache: DashMap<String, (f64, f64)>,
    /// Auth token minted from marketplace credentials. Cleared when an
    /// upstream 401 suggests it expired.
    pub auth_token_cache: RwLock<Option<String>>,
    pub(crate) station_catalog: OnceCell<Arc<Vec<StationRecord>>>,
}

impl AppContext {
    pub fn new(config: Config) -> AppContext {
        let client = reqwest::Client::builder()
            .user_agent("ControlRoom/1.0 (+https://localhost)")
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap();

        AppContext {
            config,
            client,
            service_cache: DashMap::new(),
            geocode_cache: DashMap::new(),
            auth_token_cache: RwLock::new(None),
            station_catalog: OnceCell::new(),
        }
    }

    pub fn clear_auth_token(&self) {
        *self.auth_token_cache.write().unwrap() = None;
    }
}
