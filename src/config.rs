use std::time::Duration;

pub const SIGNALBOX_API_BASE: &str = "https://api.signalbox.io/v2.5";
pub const DARWIN_API_BASE: &str =
    "https://api1.raildata.org.uk/1010-live-departure-board-dep1_2/LDBWS/api/20220120";
pub const NOMINATIM_BASE: &str = "https://nominatim.openstreetmap.org/search";
pub const RAILDATA_AUTH_BASE: &str = "https://opendata.nationalrail.co.uk";
pub const UK_RAIL_STATIONS_URL: &str =
    "https://raw.githubusercontent.com/davwheat/uk-railway-stations/main/stations.json";

/// All provider credentials and endpoints, read from the environment once at
/// startup. Nothing reads env vars after this is built.
#[derive(Clone, Debug)]
pub struct Config {
    pub signalbox_base: String,
    pub signalbox_key: Option<String>,
    pub darwin_base: String,
    pub darwin_key: Option<String>,
    /// Rail Data Marketplace live board template URLs, `{crs}` substituted.
    pub raildata_departure_url: Option<String>,
    pub raildata_departure_key: Option<String>,
    pub raildata_board_url: Option<String>,
    pub raildata_board_key: Option<String>,
    /// Shared marketplace key, fallback for every per-feed key.
    pub raildata_api_key: Option<String>,
    pub raildata_auth_token: Option<String>,
    pub raildata_username: Option<String>,
    pub raildata_password: Option<String>,
    /// Marketplace host the credential-to-token exchange POSTs against.
    pub raildata_auth_base: String,
    /// Service detail template URL, `{serviceid}` substituted.
    pub service_details_url: Option<String>,
    pub service_details_key: Option<String>,
    pub station_catalog_url: String,
    /// Optional primary station-suggestion endpoint; the catalog is the fallback.
    pub station_search_url: Option<String>,
    pub geocoder_base: String,
    pub poll_interval: Duration,
    pub bind_addr: String,
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}

impl Config {
    pub fn from_env() -> Config {
        let poll_secs = env_opt("CONTROLROOM_POLL_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(60);

        Config {
            signalbox_base: env_or("SIGNALBOX_BASE_URL", SIGNALBOX_API_BASE),
            signalbox_key: env_opt("SIGNALBOX_API_KEY"),
            darwin_base: env_or("DARWIN_BASE_URL", DARWIN_API_BASE),
            darwin_key: env_opt("DARWIN_API_KEY"),
            raildata_departure_url: env_opt("RAILDATA_LIVE_DEPARTURE_URL"),
            raildata_departure_key: env_opt("RAILDATA_LIVE_DEPARTURE_API_KEY"),
            raildata_board_url: env_opt("RAILDATA_LIVE_BOARD_URL"),
            raildata_board_key: env_opt("RAILDATA_LIVE_BOARD_API_KEY"),
            raildata_api_key: env_opt("RAILDATA_API_KEY"),
            raildata_auth_token: env_opt("RAILDATA_AUTH_TOKEN"),
            raildata_username: env_opt("RAILDATA_USERNAME"),
            raildata_password: env_opt("RAILDATA_PASSWORD"),
            raildata_auth_base: env_or("RAILDATA_AUTH_BASE_URL", RAILDATA_AUTH_BASE),
            service_details_url: env_opt("RAILDATA_SERVICE_DETAILS_URL"),
            service_details_key: env_opt("RAILDATA_SERVICE_DETAILS_API_KEY"),
            station_catalog_url: env_or("STATION_CATALOG_URL", UK_RAIL_STATIONS_URL),
            station_search_url: env_opt("STATION_SEARCH_URL"),
            geocoder_base: env_or("GEOCODER_BASE_URL", NOMINATIM_BASE),
            poll_interval: Duration::from_secs(poll_secs),
            bind_addr: env_or("CONTROLROOM_BIND", "127.0.0.1:8000"),
        }
    }

    pub fn signalbox_enabled(&self) -> bool {
        self.signalbox_key.is_some()
    }

    pub fn darwin_enabled(&self) -> bool {
        self.darwin_key.is_some()
    }

    pub fn raildata_departures_ready(&self) -> bool {
        self.raildata_departure_url.is_some()
            && (self.raildata_departure_key.is_some() || self.raildata_api_key.is_some())
    }

    pub fn raildata_arrivals_ready(&self) -> bool {
        self.raildata_board_url.is_some()
            && (self.raildata_board_key.is_some() || self.raildata_api_key.is_some())
    }

    pub fn any_provider_configured(&self) -> bool {
        self.signalbox_enabled()
            || self.darwin_enabled()
            || self.raildata_departures_ready()
            || self.raildata_arrivals_ready()
    }
}

#[cfg(test)]
impl Config {
    /// Fully unconfigured instance, independent of the test environment.
    pub(crate) fn for_tests() -> Config {
        Config {
            signalbox_base: SIGNALBOX_API_BASE.to_string(),
            signalbox_key: None,
            darwin_base: DARWIN_API_BASE.to_string(),
            darwin_key: None,
            raildata_departure_url: None,
            raildata_departure_key: None,
            raildata_board_url: None,
            raildata_board_key: None,
            raildata_api_key: None,
            raildata_auth_token: None,
            raildata_username: None,
            raildata_password: None,
            raildata_auth_base: RAILDATA_AUTH_BASE.to_string(),
            service_details_url: None,
            service_details_key: None,
            station_catalog_url: UK_RAIL_STATIONS_URL.to_string(),
            station_search_url: None,
            geocoder_base: NOMINATIM_BASE.to_string(),
            poll_interval: Duration::from_secs(60),
            bind_addr: String::from("127.0.0.1:0"),
        }
    }
}
