//! Run results and aggregation.
//!
//! Outcomes are created once per check execution and never mutated.
//! The aggregator orders them by item id, which is the canonical
//! catalog order for whatever subset was invoked, regardless of the
//! order concurrent checks finished in. The serialized report keys the
//! passed/failed maps by id through a `BTreeMap`, so field order in the
//! document is stable too.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

use crate::catalog::CheckItem;

/// The result of one check execution.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub item_id: u32,
    pub name: String,
    pub ok: bool,
    pub message: String,
    /// Raw rate samples for topic checks; absent for gate and mount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<u64>>,
}

impl Outcome {
    pub fn passed(item: &CheckItem, message: impl Into<String>, samples: Option<Vec<u64>>) -> Self {
        Self {
            item_id: item.id,
            name: item.name.clone(),
            ok: true,
            message: message.into(),
            samples,
        }
    }

    pub fn failed(item: &CheckItem, message: impl Into<String>, samples: Option<Vec<u64>>) -> Self {
        Self {
            item_id: item.id,
            name: item.name.clone(),
            ok: false,
            message: message.into(),
            samples,
        }
    }
}

/// One entry in the serialized passed/failed maps.
#[derive(Debug, Clone, Serialize)]
pub struct ReportItem {
    pub name: String,
    pub message: String,
}

/// The report for one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub timestamp: String,
    pub success: bool,
    pub duration_seconds: f64,
    pub passed: BTreeMap<u32, ReportItem>,
    pub failed: BTreeMap<u32, ReportItem>,
    pub passed_count: usize,
    pub failed_count: usize,
    pub total_count: usize,
    /// Full outcomes in canonical order; consumed by the table
    /// renderer, not part of the document.
    #[serde(skip)]
    pub outcomes: Vec<Outcome>,
}

/// Partition outcomes into passed/failed and compute the summary.
pub fn aggregate(mut outcomes: Vec<Outcome>, start: Instant) -> RunResult {
    outcomes.sort_by_key(|o| o.item_id);

    let mut passed = BTreeMap::new();
    let mut failed = BTreeMap::new();
    for outcome in &outcomes {
        let entry = ReportItem {
            name: outcome.name.clone(),
            message: outcome.message.clone(),
        };
        if outcome.ok {
            passed.insert(outcome.item_id, entry);
        } else {
            failed.insert(outcome.item_id, entry);
        }
    }

    RunResult {
        timestamp: Utc::now().to_rfc3339(),
        success: failed.is_empty(),
        duration_seconds: start.elapsed().as_secs_f64(),
        passed_count: passed.len(),
        failed_count: failed.len(),
        total_count: outcomes.len(),
        passed,
        failed,
        outcomes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CheckItem};
    use crate::config::CheckConfig;

    fn item(catalog: &Catalog, id: u32) -> CheckItem {
        catalog.items()[(id - 1) as usize].clone()
    }

    #[test]
    fn test_aggregate_partitions_and_counts() {
        let catalog = Catalog::build(&CheckConfig::default());
        let outcomes = vec![
            Outcome::failed(&item(&catalog, 7), "no samples", Some(vec![])),
            Outcome::passed(&item(&catalog, 1), "", None),
            Outcome::failed(&item(&catalog, 3), "below threshold", None),
        ];

        let result = aggregate(outcomes, Instant::now());
        assert!(!result.success);
        assert_eq!(result.passed_count, 1);
        assert_eq!(result.failed_count, 2);
        assert_eq!(result.total_count, 3);
        assert!(result.passed.contains_key(&1));
        assert!(result.failed.contains_key(&3));
        assert!(result.failed.contains_key(&7));
    }

    #[test]
    fn test_aggregate_orders_by_item_id() {
        let catalog = Catalog::build(&CheckConfig::default());
        let outcomes = vec![
            Outcome::passed(&item(&catalog, 9), "", None),
            Outcome::passed(&item(&catalog, 2), "", None),
            Outcome::passed(&item(&catalog, 5), "", None),
        ];

        let result = aggregate(outcomes, Instant::now());
        let ids: Vec<u32> = result.outcomes.iter().map(|o| o.item_id).collect();
        assert_eq!(ids, vec![2, 5, 9]);
        assert!(result.success);
    }

    #[test]
    fn test_empty_run_is_trivially_successful() {
        let result = aggregate(Vec::new(), Instant::now());
        assert!(result.success);
        assert_eq!(result.total_count, 0);
    }

    #[test]
    fn test_serialized_report_shape() {
        let catalog = Catalog::build(&CheckConfig::default());
        let outcomes = vec![
            Outcome::passed(&item(&catalog, 2), "available capacity 850G", None),
            Outcome::failed(&item(&catalog, 10), "windows=[0, 4]", Some(vec![0, 4])),
        ];

        let result = aggregate(outcomes, Instant::now());
        let doc: serde_json::Value = serde_json::from_str(&serde_json::to_string(&result).unwrap()).unwrap();

        assert_eq!(doc["success"], false);
        assert_eq!(doc["passed"]["2"]["message"], "available capacity 850G");
        assert_eq!(doc["failed"]["10"]["name"], "MDC2 rear lidar");
        assert_eq!(doc["passed_count"], 1);
        assert_eq!(doc["failed_count"], 1);
        assert_eq!(doc["total_count"], 2);
        // Outcomes stay internal.
        assert!(doc.get("outcomes").is_none());
    }
}
