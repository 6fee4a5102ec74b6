//! Pure translation of a merged filter map into the backend's boolean
//! search query body.

use serde_json::{json, Value};

use super::query::FilterMap;

/// Fields matched exactly (unanalyzed `term` constraints).
pub const EXACT_FIELDS: [&str; 3] = ["user", "asset", "system_user"];

/// Fields matched with analyzed `match` constraints.
pub const MATCH_FIELDS: [&str; 4] = ["session", "input", "org_id", "risk_level"];

/// Build the boolean query body for a merged filter map.
///
/// Routing is fixed: exact fields become `filter` term clauses, match
/// fields become `must` match clauses, and a timestamp range clause is
/// emitted only when both `date_from` and `date_to` are present. An
/// empty `org_id` never becomes a match clause; it is translated into a
/// wildcard exclusion so only unscoped commands are returned. Keys
/// outside the recognized set are ignored, which keeps old deployments
/// tolerant of filters added by newer callers.
pub fn build_query_body(filters: &FilterMap) -> Value {
    let mut must = Vec::new();
    let mut must_not = Vec::new();
    let mut filter = Vec::new();

    for (key, value) in filters {
        if EXACT_FIELDS.contains(&key.as_str()) {
            filter.push(json!({ "term": { key.as_str(): value } }));
        } else if MATCH_FIELDS.contains(&key.as_str()) {
            if key == "org_id" && value.as_str() == Some("") {
                must_not.push(json!({ "wildcard": { "org_id": "*" } }));
            } else {
                must.push(json!({ "match": { key.as_str(): value } }));
            }
        }
    }

    if let (Some(date_from), Some(date_to)) = (filters.get("date_from"), filters.get("date_to")) {
        filter.push(json!({
            "range": { "timestamp": { "gte": date_from, "lte": date_to } }
        }));
    }

    json!({
        "query": {
            "bool": {
                "must": must,
                "must_not": must_not,
                "filter": filter,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(pairs: &[(&str, Value)]) -> FilterMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn exact_fields_become_term_filters() {
        let body = build_query_body(&filters(&[("user", json!("alice"))]));
        assert_eq!(
            body["query"]["bool"]["filter"],
            json!([{ "term": { "user": "alice" } }])
        );
        assert_eq!(body["query"]["bool"]["must"], json!([]));
    }

    #[test]
    fn match_fields_become_must_clauses() {
        let body = build_query_body(&filters(&[("input", json!("rm -rf"))]));
        assert_eq!(
            body["query"]["bool"]["must"],
            json!([{ "match": { "input": "rm -rf" } }])
        );
        assert_eq!(body["query"]["bool"]["filter"], json!([]));
    }

    #[test]
    fn empty_org_id_becomes_wildcard_exclusion() {
        let body = build_query_body(&filters(&[("org_id", json!(""))]));
        assert_eq!(
            body["query"]["bool"]["must_not"],
            json!([{ "wildcard": { "org_id": "*" } }])
        );
        assert_eq!(body["query"]["bool"]["must"], json!([]));
    }

    #[test]
    fn non_empty_org_id_is_a_match_clause() {
        let body = build_query_body(&filters(&[("org_id", json!("default"))]));
        assert_eq!(
            body["query"]["bool"]["must"],
            json!([{ "match": { "org_id": "default" } }])
        );
        assert_eq!(body["query"]["bool"]["must_not"], json!([]));
    }

    #[test]
    fn range_requires_both_bounds() {
        let both = build_query_body(&filters(&[
            ("date_from", json!(100)),
            ("date_to", json!(200)),
        ]));
        assert_eq!(
            both["query"]["bool"]["filter"],
            json!([{ "range": { "timestamp": { "gte": 100, "lte": 200 } } }])
        );

        let only_from = build_query_body(&filters(&[("date_from", json!(100))]));
        assert_eq!(only_from["query"]["bool"]["filter"], json!([]));

        let only_to = build_query_body(&filters(&[("date_to", json!(200))]));
        assert_eq!(only_to["query"]["bool"]["filter"], json!([]));
    }

    #[test]
    fn unrecognized_keys_are_ignored() {
        let body = build_query_body(&filters(&[
            ("user", json!("alice")),
            ("not_a_field", json!("whatever")),
        ]));
        assert_eq!(body["query"]["bool"]["must"], json!([]));
        assert_eq!(
            body["query"]["bool"]["filter"],
            json!([{ "term": { "user": "alice" } }])
        );
    }

    #[test]
    fn empty_filter_map_builds_empty_bool_query() {
        let body = build_query_body(&FilterMap::new());
        assert_eq!(
            body,
            json!({
                "query": { "bool": { "must": [], "must_not": [], "filter": [] } }
            })
        );
    }

    #[test]
    fn combined_chain_translates_deterministically() {
        let map = filters(&[("user", json!("alice")), ("risk_level", json!(5))]);
        let body = build_query_body(&map);
        assert_eq!(
            body["query"]["bool"]["filter"],
            json!([{ "term": { "user": "alice" } }])
        );
        assert_eq!(
            body["query"]["bool"]["must"],
            json!([{ "match": { "risk_level": 5 } }])
        );
        // Same map, same body.
        assert_eq!(body, build_query_body(&map));
    }

    #[test]
    fn clause_order_follows_sorted_keys() {
        let body = build_query_body(&filters(&[
            ("system_user", json!("root")),
            ("asset", json!("web-01")),
            ("user", json!("alice")),
        ]));
        assert_eq!(
            body["query"]["bool"]["filter"],
            json!([
                { "term": { "asset": "web-01" } },
                { "term": { "system_user": "root" } },
                { "term": { "user": "alice" } },
            ])
        );
    }
}
