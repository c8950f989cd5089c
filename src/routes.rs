// Route derivation for the map layer: real destination lines when the board
// carries endpoint names, approximate spokes to nearby stations otherwise.

use crate::board::Board;
use crate::context::AppContext;
use crate::errors::FetchError;
use crate::providers::BoardType;
use crate::stations;
use serde::Serialize;
use serde_json::Value;

pub const MAX_ROUTE_LINES: usize = 10;
pub const SPOKE_STATION_LIMIT: usize = 14;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteMode {
    Real,
    Spokes,
}

/// One drawable map line: endpoints plus the text the renderer shows.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RouteLine {
    pub from: (f64, f64),
    pub to: (f64, f64),
    pub label: String,
    pub tooltip: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct RoutePlan {
    pub mode: RouteMode,
    pub signature: String,
    pub lines: Vec<RouteLine>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EndpointAgg {
    pub name: String,
    pub count: usize,
    pub soonest: String,
}

/// Aggregate a board's far endpoints (destinations for departures, origins
/// for arrivals) in first-seen order, then order by service count. The
/// stable sort keeps first-seen order among equal counts.
pub fn aggregate_endpoints(board: &Board, board_type: BoardType) -> Vec<EndpointAgg> {
    let mut aggs: Vec<EndpointAgg> = Vec::new();
    for svc in &board.services {
        let (names, scheduled, estimated) = match board_type {
            BoardType::Departures => (&svc.destination, &svc.std, &svc.etd),
            BoardType::Arrivals => (&svc.origin, &svc.sta, &svc.eta),
        };
        let time = if scheduled.is_empty() { estimated } else { scheduled };
        for name in names {
            if name.is_empty() {
                continue;
            }
            match aggs.iter_mut().find(|agg| agg.name == *name) {
                Some(agg) => {
                    agg.count += 1;
                    if !time.is_empty() && (agg.soonest.is_empty() || *time < agg.soonest) {
                        agg.soonest = time.clone();
                    }
                }
                None => aggs.push(EndpointAgg {
                    name: name.clone(),
                    count: 1,
                    soonest: time.clone(),
                }),
            }
        }
    }
    aggs.sort_by(|a, b| b.count.cmp(&a.count));
    aggs.truncate(MAX_ROUTE_LINES);
    aggs
}

/// Signature for redraw suppression: the drawn set is fully described by the
/// board location plus the sorted name:count pairs.
pub fn route_signature(location_name: &str, aggs: &[EndpointAgg]) -> String {
    let mut pairs: Vec<String> = aggs
        .iter()
        .map(|agg| format!("{}:{}", agg.name, agg.count))
        .collect();
    pairs.sort();
    format!("{}|{}", location_name, pairs.join(";"))
}

fn parse_geo_coord(entry: &Value, key: &str) -> Option<f64> {
    match entry.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// First hit of a geocoder response (Nominatim jsonv2 returns lat/lon as
/// strings).
pub fn parse_geo_results(raw: &Value) -> Option<(f64, f64)> {
    let first = raw.as_array()?.first()?;
    Some((parse_geo_coord(first, "lat")?, parse_geo_coord(first, "lon")?))
}

/// Geocode a place name, memoized for the life of the process.
pub async fn geocode(ctx: &AppContext, name: &str) -> Result<Option<(f64, f64)>, FetchError> {
    if let Some(hit) = ctx.geocode_cache.get(name) {
        return Ok(Some(*hit.value()));
    }

    let url = format!(
        "{}?q={}&format=jsonv2&limit=1",
        ctx.config.geocoder_base,
        urlencoding::encode(name)
    );
    let response = ctx
        .client
        .get(&url)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| FetchError::Geocoder(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Geocoder(format!("HTTP {}", status.as_u16())));
    }
    let raw: Value = response
        .json()
        .await
        .map_err(|e| FetchError::Geocoder(e.to_string()))?;

    let coords = parse_geo_results(&raw);
    if let Some(coords) = coords {
        ctx.geocode_cache.insert(name.to_string(), coords);
    }
    Ok(coords)
}

/// Real-route mode. `None` means the board had no usable endpoint names (or
/// nothing geocoded) and the caller should fall back to spokes.
pub async fn plan_real_routes(
    ctx: &AppContext,
    board: &Board,
    board_type: BoardType,
) -> Result<Option<RoutePlan>, FetchError> {
    let aggs = aggregate_endpoints(board, board_type);
    if aggs.is_empty() || board.location_name.is_empty() {
        return Ok(None);
    }

    let Some(from) = geocode(ctx, &board.location_name).await? else {
        return Ok(None);
    };

    let mut lines = Vec::new();
    for agg in &aggs {
        match geocode(ctx, &agg.name).await {
            Ok(Some(to)) => {
                let tooltip = if agg.soonest.is_empty() {
                    format!("{} services", agg.count)
                } else {
                    format!("{} services, soonest {}", agg.count, agg.soonest)
                };
                lines.push(RouteLine {
                    from,
                    to,
                    label: agg.name.clone(),
                    tooltip,
                });
            }
            Ok(None) => log::debug!("no geocode hit for {:?}", agg.name),
            Err(err) => log::warn!("geocode failed for {:?}: {}", agg.name, err),
        }
    }
    if lines.is_empty() {
        return Ok(None);
    }

    Ok(Some(RoutePlan {
        mode: RouteMode::Real,
        signature: route_signature(&board.location_name, &aggs),
        lines,
    }))
}

/// Approximate-spoke mode: lines to nearby stations when real routing data
/// is unavailable. Used both for boards with no endpoint names and when the
/// live feed is down entirely; callers decide which trigger applies.
pub async fn plan_spokes(ctx: &AppContext, crs: &str) -> Result<RoutePlan, FetchError> {
    let nearby = stations::nearby_stations(ctx, crs, SPOKE_STATION_LIMIT).await?;
    let (Some(base_lat), Some(base_lon)) = (nearby.base.lat, nearby.base.lon) else {
        return Err(FetchError::NoMatch(crs.to_string()));
    };

    let mut names: Vec<&str> = nearby.stations.iter().map(|st| st.name.as_str()).collect();
    names.sort_unstable();
    let signature = format!("spokes|{}|{}", crs, names.join(";"));

    let lines = nearby
        .stations
        .iter()
        .map(|st| RouteLine {
            from: (base_lat, base_lon),
            to: (st.lat, st.lon),
            label: st.name.clone(),
            tooltip: format!("approx {} km", st.distance_km),
        })
        .collect();

    Ok(RoutePlan {
        mode: RouteMode::Spokes,
        signature,
        lines,
    })
}

/// Tracks what is currently drawn; a plan whose signature matches the last
/// drawn one is a no-op so unchanged fetches do not flicker the map.
#[derive(Debug, Default)]
pub struct RoutePlotter {
    last_signature: Option<String>,
    draws: u64,
}

impl RoutePlotter {
    pub fn new() -> RoutePlotter {
        RoutePlotter::default()
    }

    /// Returns true when the plan should actually be drawn.
    pub fn apply(&mut self, plan: &RoutePlan) -> bool {
        if self.last_signature.as_deref() == Some(plan.signature.as_str()) {
            return false;
        }
        self.last_signature = Some(plan.signature.clone());
        self.draws += 1;
        true
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }

    pub fn reset(&mut self) {
        self.last_signature = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Service;
    use crate::providers::ProviderKind;
    use serde_json::json;

    fn svc(dest: &str, std: &str) -> Service {
        Service {
            service_id: format!("id-{}-{}", dest, std),
            std: std.to_string(),
            etd: String::from("On time"),
            sta: String::new(),
            eta: String::new(),
            platform: String::new(),
            operator: String::from("LNER"),
            operator_code: String::from("GR"),
            length: String::new(),
            origin: vec![String::from("London Kings Cross")],
            destination: vec![dest.to_string()],
        }
    }

    fn board(generated_at: &str, services: Vec<Service>) -> Board {
        Board {
            generated_at: generated_at.to_string(),
            location_name: String::from("London Kings Cross"),
            crs: String::from("KGX"),
            nrcc_messages: Vec::new(),
            services,
            provider: ProviderKind::Darwin,
        }
    }

    #[test]
    fn aggregation_counts_and_orders_by_count() {
        let b = board(
            "t0",
            vec![
                svc("Leeds", "10:10"),
                svc("Edinburgh", "10:00"),
                svc("Edinburgh", "09:30"),
            ],
        );
        let aggs = aggregate_endpoints(&b, BoardType::Departures);
        assert_eq!(aggs[0].name, "Edinburgh");
        assert_eq!(aggs[0].count, 2);
        assert_eq!(aggs[0].soonest, "09:30");
        assert_eq!(aggs[1].name, "Leeds");
    }

    #[test]
    fn aggregation_ties_keep_first_seen_order() {
        let b = board("t0", vec![svc("Leeds", "10:10"), svc("Edinburgh", "10:00")]);
        let aggs = aggregate_endpoints(&b, BoardType::Departures);
        assert_eq!(aggs[0].name, "Leeds");
        assert_eq!(aggs[1].name, "Edinburgh");
    }

    #[test]
    fn aggregation_caps_at_ten_lines() {
        let services: Vec<Service> = (0..15).map(|i| svc(&format!("Dest {}", i), "10:00")).collect();
        let b = board("t0", services);
        assert_eq!(aggregate_endpoints(&b, BoardType::Departures).len(), MAX_ROUTE_LINES);
    }

    #[test]
    fn arrivals_aggregate_origins() {
        let mut s = svc("Leeds", "10:10");
        s.sta = String::from("11:00");
        let b = board("t0", vec![s]);
        let aggs = aggregate_endpoints(&b, BoardType::Arrivals);
        assert_eq!(aggs[0].name, "London Kings Cross");
        assert_eq!(aggs[0].soonest, "11:00");
    }

    #[test]
    fn signature_ignores_timestamp_differences() {
        let first = board("2026-08-26T10:00:00Z", vec![svc("Leeds", "10:10"), svc("Edinburgh", "10:00")]);
        let second = board("2026-08-26T10:01:00Z", vec![svc("Leeds", "10:11"), svc("Edinburgh", "10:02")]);

        let sig_a = route_signature(
            &first.location_name,
            &aggregate_endpoints(&first, BoardType::Departures),
        );
        let sig_b = route_signature(
            &second.location_name,
            &aggregate_endpoints(&second, BoardType::Departures),
        );
        assert_eq!(sig_a, sig_b);
    }

    #[test]
    fn plotter_suppresses_identical_signature() {
        let plan = RoutePlan {
            mode: RouteMode::Real,
            signature: String::from("London Kings Cross|Edinburgh:2;Leeds:1"),
            lines: Vec::new(),
        };
        let mut plotter = RoutePlotter::new();
        assert!(plotter.apply(&plan));
        assert!(!plotter.apply(&plan));
        assert_eq!(plotter.draws(), 1);
    }

    #[test]
    fn plotter_redraws_when_count_set_changes() {
        let mut plotter = RoutePlotter::new();
        let plan_a = RoutePlan {
            mode: RouteMode::Real,
            signature: String::from("KGX|Edinburgh:2"),
            lines: Vec::new(),
        };
        let plan_b = RoutePlan {
            mode: RouteMode::Real,
            signature: String::from("KGX|Edinburgh:3"),
            lines: Vec::new(),
        };
        assert!(plotter.apply(&plan_a));
        assert!(plotter.apply(&plan_b));
        assert_eq!(plotter.draws(), 2);
    }

    #[test]
    fn spoke_and_real_plans_are_distinct_modes() {
        // Missing endpoint names and dead feeds both end in spoke mode, but
        // they arrive there differently; keep the two triggers separate.
        let empty_board = board("t0", Vec::new());
        assert!(aggregate_endpoints(&empty_board, BoardType::Departures).is_empty());

        let spoke_plan = RoutePlan {
            mode: RouteMode::Spokes,
            signature: String::from("spokes|KGX|London Euston"),
            lines: Vec::new(),
        };
        assert_ne!(spoke_plan.mode, RouteMode::Real);
    }

    #[test]
    fn geo_results_accept_string_and_numeric_coords() {
        let raw = json!([{"lat": "51.53", "lon": -0.12}]);
        assert_eq!(parse_geo_results(&raw), Some((51.53, -0.12)));
        assert_eq!(parse_geo_results(&json!([])), None);
    }
}
