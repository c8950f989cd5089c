use crate::providers::ProviderKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One normalized live board for a station, one direction. Produced fresh on
/// every fetch; a new board for the same code replaces the old one outright.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub generated_at: String,
    pub location_name: String,
    pub crs: String,
    pub nrcc_messages: Vec<String>,
    pub services: Vec<Service>,
    pub provider: ProviderKind,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Service {
    #[serde(rename = "serviceID")]
    pub service_id: String,
    pub std: String,
    pub etd: String,
    pub sta: String,
    pub eta: String,
    pub platform: String,
    pub operator: String,
    #[serde(rename = "operatorCode")]
    pub operator_code: String,
    #[serde(default)]
    pub length: String,
    pub origin: Vec<String>,
    pub destination: Vec<String>,
}

/// Auxiliary per-service record kept in the detail cache keyed by serviceID.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceDetail {
    #[serde(rename = "serviceID")]
    pub service_id: String,
    pub operator: String,
    pub std: String,
    pub etd: String,
    pub sta: String,
    pub eta: String,
    pub platform: String,
    #[serde(rename = "locationName")]
    pub location_name: String,
    #[serde(rename = "delayReason")]
    pub delay_reason: String,
    #[serde(rename = "cancelReason")]
    pub cancel_reason: String,
}

impl ServiceDetail {
    pub fn from_service(svc: &Service, location_name: &str) -> ServiceDetail {
        ServiceDetail {
            service_id: svc.service_id.clone(),
            operator: svc.operator.clone(),
            std: svc.std.clone(),
            etd: svc.etd.clone(),
            sta: svc.sta.clone(),
            eta: svc.eta.clone(),
            platform: svc.platform.clone(),
            location_name: location_name.to_string(),
            delay_reason: String::new(),
            cancel_reason: String::new(),
        }
    }
}

/// Field-name aliases for providers with arbitrary row shapes, in priority
/// order. First key with a non-empty value wins; no match yields "".
const SERVICE_ALIASES: &[(&str, &[&str])] = &[
    (
        "serviceID",
        &["serviceID", "serviceId", "service_id", "id", "train_id", "rid"],
    ),
    (
        "std",
        &["std", "scheduled_departure", "planned_departure", "departure_scheduled"],
    ),
    (
        "etd",
        &["etd", "estimated_departure", "expected_departure", "departure_estimated"],
    ),
    (
        "sta",
        &["sta", "scheduled_arrival", "planned_arrival", "arrival_scheduled"],
    ),
    (
        "eta",
        &["eta", "estimated_arrival", "expected_arrival", "arrival_estimated"],
    ),
    ("platform", &["platform", "platform_number", "plat"]),
    ("operator", &["operator", "operator_name", "toc_name"]),
    ("operatorCode", &["operatorCode", "operator_code", "toc", "toc_code"]),
    ("length", &["length", "num_coaches", "coaches"]),
];

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn first_alias_value(row: &Value, keys: &[&str]) -> String {
    for key in keys {
        if let Some(value) = row.get(key) {
            let text = scalar_to_string(value);
            if !text.is_empty() {
                return text;
            }
        }
    }
    String::new()
}

fn alias_field(row: &Value, logical: &str) -> String {
    SERVICE_ALIASES
        .iter()
        .find(|(name, _)| *name == logical)
        .map(|(_, keys)| first_alias_value(row, keys))
        .unwrap_or_default()
}

/// Location lists arrive either as plain strings or `{locationName}` objects.
fn location_names(row: &Value, keys: &[&str]) -> Vec<String> {
    for key in keys {
        let Some(list) = row.get(key).and_then(Value::as_array) else {
            continue;
        };
        let names: Vec<String> = list
            .iter()
            .filter_map(|entry| match entry {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Object(_) => entry
                    .get("locationName")
                    .or_else(|| entry.get("name"))
                    .map(scalar_to_string),
                _ => None,
            })
            .filter(|name| !name.is_empty())
            .collect();
        if !names.is_empty() {
            return names;
        }
    }
    Vec::new()
}

/// Normalize one arbitrarily shaped service row via the alias table.
pub fn normalize_alias_row(row: &Value) -> Service {
    Service {
        service_id: alias_field(row, "serviceID"),
        std: alias_field(row, "std"),
        etd: alias_field(row, "etd"),
        sta: alias_field(row, "sta"),
        eta: alias_field(row, "eta"),
        platform: alias_field(row, "platform"),
        operator: alias_field(row, "operator"),
        operator_code: alias_field(row, "operatorCode"),
        length: alias_field(row, "length"),
        origin: location_names(row, &["origin", "origins", "from"]),
        destination: location_names(row, &["destination", "destinations", "to", "headcode_destination"]),
    }
}

fn service_rows(raw: &Value) -> Vec<&Value> {
    for key in ["trainServices", "services", "trains", "results", "data"] {
        if let Some(list) = raw.get(key).and_then(Value::as_array) {
            return list.iter().filter(|v| v.is_object()).collect();
        }
    }
    // Some feeds return the row list at the top level.
    raw.as_array()
        .map(|list| list.iter().filter(|v| v.is_object()).collect())
        .unwrap_or_default()
}

/// Normalize a board whose row shape is unknown, probing the alias table.
pub fn normalize_alias_board(raw: &Value, crs_fallback: &str, provider: ProviderKind) -> Board {
    Board {
        generated_at: first_alias_value(raw, &["generatedAt", "generated_at", "timestamp"]),
        location_name: first_alias_value(raw, &["locationName", "location_name", "station_name", "name"]),
        crs: {
            let crs = first_alias_value(raw, &["crs", "station", "station_code", "code"]);
            if crs.is_empty() { crs_fallback.to_string() } else { crs }
        },
        nrcc_messages: message_texts(raw),
        services: service_rows(raw).into_iter().map(normalize_alias_row).collect(),
        provider,
    }
}

/// Normalize the canonical LDBWS JSON shape (trainServices / nrccMessages).
pub fn normalize_native_board(raw: &Value, crs_fallback: &str, provider: ProviderKind) -> Board {
    let services = raw
        .get("trainServices")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter(|svc| svc.is_object())
                .map(normalize_alias_row)
                .collect()
        })
        .unwrap_or_default();

    Board {
        generated_at: raw.get("generatedAt").map(scalar_to_string).unwrap_or_default(),
        location_name: raw.get("locationName").map(scalar_to_string).unwrap_or_default(),
        crs: {
            let crs = raw.get("crs").map(scalar_to_string).unwrap_or_default();
            if crs.is_empty() { crs_fallback.to_string() } else { crs }
        },
        nrcc_messages: message_texts(raw),
        services,
        provider,
    }
}

fn message_texts(raw: &Value) -> Vec<String> {
    raw.get("nrccMessages")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .map(|m| match m {
                    Value::String(s) => s.trim().to_string(),
                    Value::Object(_) => m
                        .get("Value")
                        .or_else(|| m.get("value"))
                        .or_else(|| m.get("message"))
                        .map(scalar_to_string)
                        .unwrap_or_default(),
                    _ => String::new(),
                })
                .filter(|m| !m.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn alias_lookup_prefers_canonical_key() {
        let row = json!({"std": "10:00", "scheduled_departure": "10:02"});
        assert_eq!(normalize_alias_row(&row).std, "10:00");
    }

    #[test]
    fn alias_lookup_falls_through_to_later_keys() {
        let row = json!({"scheduled_departure": "10:02", "toc": "GR"});
        let svc = normalize_alias_row(&row);
        assert_eq!(svc.std, "10:02");
        assert_eq!(svc.operator_code, "GR");
        assert_eq!(svc.etd, "");
    }

    #[test]
    fn empty_alias_values_do_not_win() {
        let row = json!({"std": "", "scheduled_departure": "09:45"});
        assert_eq!(normalize_alias_row(&row).std, "09:45");
    }

    #[test]
    fn location_lists_accept_objects_and_strings() {
        let row = json!({
            "destination": [{"locationName": "Edinburgh"}, {"locationName": ""}],
            "origin": ["London Kings Cross"]
        });
        let svc = normalize_alias_row(&row);
        assert_eq!(svc.destination, vec!["Edinburgh"]);
        assert_eq!(svc.origin, vec!["London Kings Cross"]);
    }

    #[test]
    fn native_board_keeps_crs_fallback_when_absent() {
        let raw = json!({
            "generatedAt": "2026-08-26T10:00:00Z",
            "locationName": "London Kings Cross",
            "trainServices": [
                {"serviceID": "a1", "std": "10:02", "etd": "On time",
                 "platform": "4", "operator": "LNER", "operatorCode": "GR",
                 "destination": [{"locationName": "Edinburgh"}]}
            ]
        });
        let board = normalize_native_board(&raw, "KGX", ProviderKind::Darwin);
        assert_eq!(board.crs, "KGX");
        assert_eq!(board.services.len(), 1);
        assert_eq!(board.services[0].destination, vec!["Edinburgh"]);
        assert_eq!(board.provider, ProviderKind::Darwin);
    }

    #[test]
    fn nrcc_messages_accept_wrapped_objects() {
        let raw = json!({"nrccMessages": [{"Value": "Engineering works"}, "Plain text", 7]});
        let board = normalize_native_board(&raw, "KGX", ProviderKind::Darwin);
        assert_eq!(board.nrcc_messages, vec!["Engineering works", "Plain text"]);
    }
}
