// Station catalog, suggestion search, CRS resolution and nearby lookup.
// The catalog is fetched once per process and kept for its lifetime.

use crate::context::AppContext;
use crate::errors::FetchError;
use geo::HaversineDistance;
use geo::point;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const NEARBY_RADIUS_KM: f64 = 45.0;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StationRecord {
    pub crs: String,
    pub name: String,
    #[serde(default)]
    pub country: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NearbyStation {
    pub crs: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "distanceKm")]
    pub distance_km: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct Nearby {
    pub base: StationRecord,
    pub stations: Vec<NearbyStation>,
}

/// Raw row shape of the public UK railway stations JSON.
#[derive(Deserialize)]
struct CatalogRow {
    #[serde(rename = "crsCode", default)]
    crs_code: String,
    #[serde(rename = "stationName", default)]
    station_name: String,
    #[serde(rename = "constituentCountry", default)]
    constituent_country: String,
    lat: Option<f64>,
    long: Option<f64>,
}

pub async fn station_catalog(ctx: &AppContext) -> Result<Arc<Vec<StationRecord>>, FetchError> {
    ctx.station_catalog
        .get_or_try_init(|| async {
            let response = ctx
                .client
                .get(&ctx.config.station_catalog_url)
                .header("Accept", "application/json")
                .send()
                .await
                .map_err(|e| FetchError::CatalogUnavailable(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::CatalogUnavailable(format!("HTTP {}", status.as_u16())));
            }
            let rows: Vec<CatalogRow> = response
                .json()
                .await
                .map_err(|e| FetchError::CatalogUnavailable(e.to_string()))?;

            let items: Vec<StationRecord> = rows
                .into_iter()
                .filter_map(|row| {
                    let crs = row.crs_code.trim().to_uppercase();
                    let name = row.station_name.trim().to_string();
                    if crs.len() != 3 || name.is_empty() {
                        return None;
                    }
                    Some(StationRecord {
                        crs,
                        name,
                        country: row.constituent_country.trim().to_lowercase(),
                        lat: row.lat,
                        lon: row.long,
                    })
                })
                .collect();
            log::info!("station catalog loaded: {} stations", items.len());
            Ok(Arc::new(items))
        })
        .await
        .cloned()
}

pub fn clamp_limit(requested: Option<usize>, default: usize) -> usize {
    requested.unwrap_or(default).clamp(1, 100)
}

/// Weighted substring filter over the catalog: exact CRS beats CRS prefix
/// beats name prefix beats name substring. Ties break alphabetically.
pub fn search_catalog(items: &[StationRecord], query: &str, limit: usize) -> Vec<StationRecord> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return items.iter().take(limit).cloned().collect();
    }
    let q_upper = q.to_uppercase();

    let mut scored: Vec<(i32, &StationRecord)> = Vec::new();
    for st in items {
        let name_l = st.name.to_lowercase();
        let mut score = 0;
        if st.crs == q_upper {
            score += 200;
        } else if st.crs.starts_with(&q_upper) {
            score += 120;
        }
        if name_l.starts_with(&q) {
            score += 80;
        }
        if name_l.contains(&q) {
            score += 40;
        }
        if score > 0 {
            scored.push((score, st));
        }
    }
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.name.cmp(&b.1.name)));
    scored.into_iter().take(limit).map(|(_, st)| st.clone()).collect()
}

/// Station suggestion: configured search endpoint first; on failure the
/// cached catalog takes over, but only for queries of two or more chars.
pub async fn suggest_stations(
    ctx: &AppContext,
    query: &str,
    limit: usize,
) -> Result<Vec<StationRecord>, FetchError> {
    if let Some(base) = ctx.config.station_search_url.as_deref() {
        return suggest_with(ctx, query, limit, || {
            fetch_remote_suggestions(ctx, base, query, limit)
        })
        .await;
    }
    let catalog = station_catalog(ctx).await?;
    Ok(search_catalog(&catalog, query, limit))
}

/// Remote-first policy with the fetch injected so the fallback rules are
/// testable without sockets.
async fn suggest_with<F, Fut>(
    ctx: &AppContext,
    query: &str,
    limit: usize,
    fetch_remote: F,
) -> Result<Vec<StationRecord>, FetchError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<Vec<StationRecord>, FetchError>>,
{
    match fetch_remote().await {
        Ok(stations) => Ok(stations),
        Err(err) => {
            log::warn!("station search endpoint failed, using catalog: {}", err);
            if query.trim().len() < 2 {
                return Err(err);
            }
            let catalog = station_catalog(ctx).await?;
            Ok(search_catalog(&catalog, query, limit))
        }
    }
}

async fn fetch_remote_suggestions(
    ctx: &AppContext,
    base: &str,
    query: &str,
    limit: usize,
) -> Result<Vec<StationRecord>, FetchError> {
    #[derive(Deserialize)]
    struct SearchResponse {
        #[serde(default)]
        stations: Vec<StationRecord>,
    }

    let url = format!(
        "{}?q={}&limit={}",
        base,
        urlencoding::encode(query.trim()),
        limit
    );
    let response = ctx
        .client
        .get(&url)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| FetchError::CatalogUnavailable(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::CatalogUnavailable(format!("HTTP {}", status.as_u16())));
    }
    let parsed: SearchResponse = response
        .json()
        .await
        .map_err(|e| FetchError::CatalogUnavailable(e.to_string()))?;
    Ok(parsed.stations.into_iter().take(limit).collect())
}

fn catalog_has(items: &[StationRecord], crs: &str) -> bool {
    items.iter().any(|st| st.crs == crs)
}

/// Resolve free text to a CRS code: the whole value if it is one verbatim,
/// else the first whole-word 3-letter token that names a real station.
/// Callers must reject the input when this fails.
pub fn resolve_crs(items: &[StationRecord], input: &str) -> Result<String, FetchError> {
    let trimmed = input.trim();
    let direct = trimmed.to_uppercase();
    if direct.len() == 3 && direct.chars().all(|c| c.is_ascii_alphabetic()) && catalog_has(items, &direct)
    {
        return Ok(direct);
    }

    for token in trimmed.split(|c: char| !c.is_ascii_alphanumeric()) {
        if token.len() != 3 || !token.chars().all(|c| c.is_ascii_alphabetic()) {
            continue;
        }
        let candidate = token.to_uppercase();
        if catalog_has(items, &candidate) {
            return Ok(candidate);
        }
    }
    Err(FetchError::NoMatch(input.to_string()))
}

fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let a = point!(x: lon1, y: lat1);
    let b = point!(x: lon2, y: lat2);
    a.haversine_distance(&b) / 1000.0
}

/// Stations within 45 km of a base code, closest first.
pub fn nearby_in(items: &[StationRecord], crs: &str, limit: usize) -> Result<Nearby, FetchError> {
    let base = items
        .iter()
        .find(|st| st.crs == crs)
        .cloned()
        .ok_or_else(|| FetchError::NoMatch(crs.to_string()))?;

    let (Some(base_lat), Some(base_lon)) = (base.lat, base.lon) else {
        return Ok(Nearby { base, stations: Vec::new() });
    };

    let mut nearby: Vec<NearbyStation> = items
        .iter()
        .filter(|st| st.crs != crs)
        .filter_map(|st| {
            let (Some(lat), Some(lon)) = (st.lat, st.lon) else {
                return None;
            };
            let d = distance_km(base_lat, base_lon, lat, lon);
            if d > NEARBY_RADIUS_KM {
                return None;
            }
            Some(NearbyStation {
                crs: st.crs.clone(),
                name: st.name.clone(),
                lat,
                lon,
                distance_km: (d * 100.0).round() / 100.0,
            })
        })
        .collect();
    nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    nearby.truncate(limit);

    Ok(Nearby { base, stations: nearby })
}

pub async fn nearby_stations(ctx: &AppContext, crs: &str, limit: usize) -> Result<Nearby, FetchError> {
    let catalog = station_catalog(ctx).await?;
    nearby_in(&catalog, crs, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn catalog() -> Vec<StationRecord> {
        let mk = |crs: &str, name: &str, lat: f64, lon: f64| StationRecord {
            crs: crs.to_string(),
            name: name.to_string(),
            country: String::from("england"),
            lat: Some(lat),
            lon: Some(lon),
        };
        vec![
            mk("KGX", "London Kings Cross", 51.5308, -0.1238),
            mk("EUS", "London Euston", 51.5282, -0.1337),
            mk("STP", "London St Pancras (Intl)", 51.5305, -0.1260),
            mk("YRK", "York", 53.9580, -1.0933),
            mk("KNG", "Kingswear", 50.3490, -3.5710),
        ]
    }

    #[test]
    fn exact_crs_outranks_name_matches() {
        let items = catalog();
        let results = search_catalog(&items, "kgx", 10);
        assert_eq!(results[0].crs, "KGX");
    }

    #[test]
    fn name_prefix_outranks_name_substring() {
        let items = catalog();
        let results = search_catalog(&items, "king", 10);
        assert_eq!(results[0].crs, "KNG");
        assert!(results.iter().any(|st| st.crs == "KGX"));
    }

    #[test]
    fn search_caps_results() {
        let items = catalog();
        let results = search_catalog(&items, "london", 2);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn resolve_crs_takes_verbatim_code() {
        let items = catalog();
        assert_eq!(resolve_crs(&items, " kgx ").unwrap(), "KGX");
    }

    #[test]
    fn resolve_crs_finds_whole_word_token() {
        let items = catalog();
        assert_eq!(resolve_crs(&items, "board for YRK please").unwrap(), "YRK");
    }

    #[test]
    fn resolve_crs_rejects_embedded_letters() {
        let items = catalog();
        // "York" contains no standalone 3-letter station token.
        let err = resolve_crs(&items, "York").unwrap_err();
        assert!(matches!(err, FetchError::NoMatch(_)));
    }

    #[test]
    fn nearby_sorts_by_distance_and_stays_in_radius() {
        let items = catalog();
        let nearby = nearby_in(&items, "KGX", 14).unwrap();
        assert_eq!(nearby.base.crs, "KGX");
        let codes: Vec<&str> = nearby.stations.iter().map(|s| s.crs.as_str()).collect();
        // St Pancras is a few hundred metres away, Euston under a kilometre;
        // York and Kingswear are far outside the 45 km radius.
        assert_eq!(codes, vec!["STP", "EUS"]);
        assert!(nearby.stations[0].distance_km < nearby.stations[1].distance_km);
    }

    #[test]
    fn nearby_unknown_base_is_no_match() {
        let items = catalog();
        assert!(matches!(nearby_in(&items, "ZZZ", 5), Err(FetchError::NoMatch(_))));
    }

    #[test]
    fn limit_clamps_to_catalog_bounds() {
        assert_eq!(clamp_limit(Some(500), 20), 100);
        assert_eq!(clamp_limit(Some(0), 20), 1);
        assert_eq!(clamp_limit(None, 20), 20);
    }

    fn seeded_context() -> AppContext {
        let ctx = AppContext::new(Config::for_tests());
        ctx.station_catalog.set(Arc::new(catalog())).unwrap();
        ctx
    }

    #[tokio::test]
    async fn remote_success_short_circuits_the_catalog() {
        let ctx = seeded_context();
        let remote = vec![StationRecord {
            crs: String::from("RMT"),
            name: String::from("Remote Only"),
            country: String::from("england"),
            lat: None,
            lon: None,
        }];
        let results = suggest_with(&ctx, "kgx", 10, || async { Ok(remote.clone()) })
            .await
            .unwrap();
        // The catalog has a KGX hit, but the remote answer is taken as-is.
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].crs, "RMT");
    }

    #[tokio::test]
    async fn remote_failure_with_short_query_surfaces_the_error() {
        let ctx = seeded_context();
        let err = suggest_with(&ctx, "k", 10, || async {
            Err(FetchError::CatalogUnavailable(String::from("HTTP 503")))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, FetchError::CatalogUnavailable(_)));
    }

    #[tokio::test]
    async fn remote_failure_with_longer_query_falls_back_to_catalog() {
        let ctx = seeded_context();
        let results = suggest_with(&ctx, "kgx", 10, || async {
            Err(FetchError::CatalogUnavailable(String::from("HTTP 503")))
        })
        .await
        .unwrap();
        assert_eq!(results[0].crs, "KGX");
    }
}
