// Sidebar entity search: a weighted linear scan over an externally owned,
// already-loaded entity list. No I/O here.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use titlecase::titlecase;

pub const DEFAULT_SEARCH_LIMIT: usize = 100;

pub const SCORE_LABEL_EXACT: u32 = 100;
pub const SCORE_ATTR_EXACT: u32 = 90;
pub const SCORE_LABEL_PREFIX: u32 = 80;
pub const SCORE_LABEL_SUBSTRING: u32 = 60;
pub const SCORE_ATTR_SUBSTRING: u32 = 50;
pub const SCORE_AUX_SUBSTRING: u32 = 45;
pub const SCORE_TYPE_NAME: u32 = 20;

/// One searchable map entity. The type tag is an open set; attributes are
/// flat scalars and `aux` carries whatever nested payload the source had.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub label: String,
    #[serde(default)]
    pub attributes: AHashMap<String, Value>,
    #[serde(default)]
    pub position: Option<(f64, f64)>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub aux: Option<Value>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SearchFilter {
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
    pub source: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ScoredEntity<'a> {
    pub score: u32,
    pub entity: &'a Entity,
}

pub fn type_display_name(entity_type: &str) -> String {
    titlecase(&entity_type.replace(['_', '-'], " "))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.to_lowercase()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn aux_contains(value: &Value, query: &str) -> bool {
    match value {
        Value::Object(map) => map.values().any(|v| aux_contains(v, query)),
        Value::Array(list) => list.iter().any(|v| aux_contains(v, query)),
        _ => scalar_text(value).is_some_and(|text| text.contains(query)),
    }
}

/// Score one entity against a lowercased query. The strongest matching rule
/// wins; the type-name rule only fires when nothing else matched at all.
pub fn score_entity(entity: &Entity, query: &str) -> u32 {
    let label = entity.label.to_lowercase();
    let mut best = 0;

    if label == query {
        best = best.max(SCORE_LABEL_EXACT);
    } else if label.starts_with(query) {
        best = best.max(SCORE_LABEL_PREFIX);
    } else if label.contains(query) {
        best = best.max(SCORE_LABEL_SUBSTRING);
    }

    for value in entity.attributes.values() {
        let Some(text) = scalar_text(value) else {
            continue;
        };
        if text == query {
            best = best.max(SCORE_ATTR_EXACT);
        } else if text.contains(query) {
            best = best.max(SCORE_ATTR_SUBSTRING);
        }
    }

    if let Some(aux) = &entity.aux {
        if aux_contains(aux, query) {
            best = best.max(SCORE_AUX_SUBSTRING);
        }
    }

    if best == 0 && type_display_name(&entity.entity_type).to_lowercase().contains(query) {
        best = SCORE_TYPE_NAME;
    }

    best
}

/// Linear scan, scored, stable-sorted descending so ties keep discovery
/// order, truncated to the filter limit (default 100).
pub fn search_entities<'a>(
    entities: &'a [Entity],
    query: &str,
    filter: &SearchFilter,
) -> Vec<ScoredEntity<'a>> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    let limit = filter.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);

    let mut results: Vec<ScoredEntity<'a>> = entities
        .iter()
        .filter(|entity| {
            filter
                .entity_type
                .as_deref()
                .is_none_or(|t| entity.entity_type == t)
        })
        .filter(|entity| {
            filter
                .source
                .as_deref()
                .is_none_or(|s| entity.source.as_deref() == Some(s))
        })
        .filter_map(|entity| {
            let score = score_entity(entity, &query);
            (score > 0).then_some(ScoredEntity { score, entity })
        })
        .collect();

    // Vec::sort_by is stable, which the tie-order contract relies on.
    results.sort_by(|a, b| b.score.cmp(&a.score));
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(id: &str, label: &str) -> Entity {
        Entity {
            id: id.to_string(),
            entity_type: String::from("station"),
            label: label.to_string(),
            attributes: AHashMap::new(),
            position: None,
            source: None,
            aux: None,
        }
    }

    #[test]
    fn exact_beats_prefix_and_nonmatches_drop_out() {
        let entities = vec![
            entity("a", "KGX"),
            entity("b", "KGX Platform 1"),
            entity("c", "Other"),
        ];
        let results = search_entities(&entities, "KGX", &SearchFilter::default());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].entity.id, "a");
        assert_eq!(results[0].score, SCORE_LABEL_EXACT);
        assert_eq!(results[1].entity.id, "b");
        assert_eq!(results[1].score, SCORE_LABEL_PREFIX);
    }

    #[test]
    fn attribute_exact_outranks_label_prefix() {
        let mut with_attr = entity("a", "Something else");
        with_attr.attributes.insert(String::from("code"), json!("KGX"));
        let entities = vec![entity("b", "KGX Platform 1"), with_attr];

        let results = search_entities(&entities, "kgx", &SearchFilter::default());
        assert_eq!(results[0].entity.id, "a");
        assert_eq!(results[0].score, SCORE_ATTR_EXACT);
        assert_eq!(results[1].score, SCORE_LABEL_PREFIX);
    }

    #[test]
    fn aux_nested_properties_match_weakly() {
        let mut e = entity("a", "Unrelated");
        e.aux = Some(json!({"details": {"operator": "Great KGX Railways"}}));
        let entities = [e];
        let results = search_entities(&entities, "kgx", &SearchFilter::default());
        assert_eq!(results[0].score, SCORE_AUX_SUBSTRING);
    }

    #[test]
    fn type_name_only_fires_without_stronger_match() {
        let weak = entity("a", "Unrelated");
        let mut strong = entity("b", "west station house");
        strong.entity_type = String::from("depot");

        let entities = [weak, strong];
        let results = search_entities(&entities, "station", &SearchFilter::default());
        // The label substring outranks the type-name rule; the plain
        // "station" type tag on the other entity only earns the weak score.
        assert_eq!(results[0].entity.id, "b");
        assert_eq!(results[0].score, SCORE_LABEL_SUBSTRING);
        assert_eq!(results[1].entity.id, "a");
        assert_eq!(results[1].score, SCORE_TYPE_NAME);
    }

    #[test]
    fn ties_keep_discovery_order() {
        let entities = vec![
            entity("first", "KGX north"),
            entity("second", "KGX south"),
            entity("third", "KGX west"),
        ];
        let results = search_entities(&entities, "kgx", &SearchFilter::default());
        let ids: Vec<&str> = results.iter().map(|r| r.entity.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn truncation_keeps_the_highest_scores() {
        let mut entities: Vec<Entity> = (0..9)
            .map(|i| entity(&format!("sub{}", i), &format!("area KGX {}", i)))
            .collect();
        entities.push(entity("exact", "KGX"));

        let filter = SearchFilter {
            limit: Some(2),
            ..SearchFilter::default()
        };
        let results = search_entities(&entities, "kgx", &filter);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].entity.id, "exact");
        assert_eq!(results[0].score, SCORE_LABEL_EXACT);
        assert_eq!(results[1].score, SCORE_LABEL_SUBSTRING);
    }

    #[test]
    fn filters_restrict_type_and_source() {
        let mut a = entity("a", "KGX");
        a.source = Some(String::from("darwin"));
        let mut b = entity("b", "KGX");
        b.source = Some(String::from("signalbox"));
        b.entity_type = String::from("train");

        let filter = SearchFilter {
            entity_type: Some(String::from("train")),
            source: Some(String::from("signalbox")),
            limit: None,
        };
        let entities = [a, b];
        let results = search_entities(&entities, "kgx", &filter);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entity.id, "b");
    }

    #[test]
    fn type_display_name_titlecases_tags() {
        assert_eq!(type_display_name("rail_station"), "Rail Station");
    }
}
