use oq_schemas::ExplainSummary;
use serde_json::Value;

/// Walk a Postgres `EXPLAIN (FORMAT JSON)` tree and pull out the figures the
/// gate cares about (spec §4.4): the root node's estimated rows/cost, and
/// every sequential-scan relation anywhere in the subtree.
///
/// Malformed input never fails the probe — it yields a zeroed summary plus a
/// warning, and the gate treats that as non-blocking.
pub fn parse_plan(raw: &Value) -> ExplainSummary {
    let root = raw
        .as_array()
        .and_then(|arr| arr.first())
        .and_then(|entry| entry.get("Plan"));

    let Some(root) = root else {
        return ExplainSummary {
            warnings: vec!["EXPLAIN output was malformed".to_string()],
            ..ExplainSummary::default()
        };
    };

    let estimated_rows = root
        .get("Plan Rows")
        .and_then(Value::as_f64)
        .map(|v| v as i64)
        .unwrap_or(0);
    let estimated_cost = root.get("Total Cost").and_then(Value::as_f64).unwrap_or(0.0);

    let mut seq_scan_relations = Vec::new();
    walk_seq_scans(root, &mut seq_scan_relations);
    seq_scan_relations.sort();
    seq_scan_relations.dedup();

    let has_seq_scan = !seq_scan_relations.is_empty();
    let mut warnings = Vec::new();
    if has_seq_scan {
        warnings.push(format!(
            "sequential scan on: {}",
            seq_scan_relations.join(", ")
        ));
    }

    ExplainSummary {
        estimated_rows,
        estimated_cost,
        has_seq_scan,
        seq_scan_relations,
        warnings,
    }
}

fn walk_seq_scans(node: &Value, out: &mut Vec<String>) {
    if node.get("Node Type").and_then(Value::as_str) == Some("Seq Scan") {
        if let Some(name) = node.get("Relation Name").and_then(Value::as_str) {
            out.push(name.to_string());
        }
    }
    if let Some(children) = node.get("Plans").and_then(Value::as_array) {
        for child in children {
            walk_seq_scans(child, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_root_rows_and_cost() {
        let raw = json!([{
            "Plan": {
                "Node Type": "Index Scan",
                "Total Cost": 12.5,
                "Plan Rows": 42,
                "Plans": []
            }
        }]);
        let summary = parse_plan(&raw);
        assert_eq!(summary.estimated_rows, 42);
        assert_eq!(summary.estimated_cost, 12.5);
        assert!(!summary.has_seq_scan);
    }

    #[test]
    fn detects_seq_scan_in_subtree() {
        let raw = json!([{
            "Plan": {
                "Node Type": "Hash Join",
                "Total Cost": 100.0,
                "Plan Rows": 10,
                "Plans": [
                    {"Node Type": "Seq Scan", "Relation Name": "users", "Total Cost": 50.0, "Plan Rows": 5},
                    {"Node Type": "Index Scan", "Relation Name": "orders", "Total Cost": 10.0, "Plan Rows": 5}
                ]
            }
        }]);
        let summary = parse_plan(&raw);
        assert!(summary.has_seq_scan);
        assert_eq!(summary.seq_scan_relations, vec!["users".to_string()]);
        assert!(!summary.warnings.is_empty());
    }

    #[test]
    fn malformed_plan_does_not_panic() {
        let raw = json!({"not": "a plan array"});
        let summary = parse_plan(&raw);
        assert_eq!(summary.estimated_rows, 0);
        assert_eq!(summary.estimated_cost, 0.0);
        assert!(summary.warnings.iter().any(|w| w.contains("malformed")));
    }
}
