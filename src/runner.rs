//! Bounded-concurrency runner for one host's topic group.
//!
//! Each check runs as its own task holding a semaphore permit, so at
//! most `max_concurrency` sessions hit the host at once. Results come
//! back over a channel and are re-indexed by item id: the caller sees
//! input order no matter which task finished first. A task's timeout
//! or failure never cancels its siblings.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};

use crate::catalog::CheckItem;
use crate::report::Outcome;
use crate::throughput::ThroughputChecker;

/// Run every item's throughput check under the concurrency bound.
/// Returns outcomes in input item order plus the group verdict.
pub async fn run_group(
    checker: Arc<ThroughputChecker>,
    items: Vec<CheckItem>,
    max_concurrency: usize,
) -> (Vec<Outcome>, bool) {
    if items.is_empty() {
        return (Vec::new(), true);
    }

    let limit = max_concurrency.clamp(1, items.len());
    let semaphore = Arc::new(Semaphore::new(limit));
    let (tx, mut rx) = mpsc::channel::<Outcome>(items.len());

    for item in items.clone() {
        let checker = checker.clone();
        let semaphore = semaphore.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            let outcome = checker.check(&item).await;
            let _ = tx.send(outcome).await;
        });
    }
    drop(tx);

    let mut by_id: HashMap<u32, Outcome> = HashMap::new();
    while let Some(outcome) = rx.recv().await {
        by_id.insert(outcome.item_id, outcome);
    }

    let mut ordered = Vec::with_capacity(items.len());
    let mut all_ok = true;
    for item in &items {
        let outcome = by_id
            .remove(&item.id)
            .unwrap_or_else(|| Outcome::failed(item, "check task aborted", None));
        all_ok &= outcome.ok;
        ordered.push(outcome);
    }

    (ordered, all_ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::catalog::Catalog;
    use crate::config::CheckConfig;
    use crate::exec::testing::{stdout, ScriptedExecutor};

    fn fixture() -> (Arc<ScriptedExecutor>, Arc<ThroughputChecker>, Vec<CheckItem>) {
        let cfg = Arc::new(CheckConfig::default());
        let exec = Arc::new(ScriptedExecutor::new());
        let checker = Arc::new(ThroughputChecker::new(exec.clone(), cfg.clone()));
        let catalog = Catalog::build(&cfg);
        let items: Vec<CheckItem> = catalog
            .group_items("mdc1")
            .into_iter()
            .cloned()
            .collect();
        (exec, checker, items)
    }

    fn rate_line(sample: u64) -> String {
        format!("/topic    diag_dds    {sample}\n")
    }

    #[tokio::test]
    async fn test_result_order_matches_input_despite_completion_order() {
        let (exec, checker, items) = fixture();
        // Staggered delays force out-of-order completion.
        let delays_ms = [30u64, 5, 20, 1, 15, 8];
        for (item, delay) in items.iter().zip(delays_ms) {
            exec.push_delayed(
                item.command.as_deref().unwrap(),
                Duration::from_millis(delay),
                stdout(&rate_line(10)),
            );
        }

        let (outcomes, all_ok) = run_group(checker, items.clone(), 6).await;
        assert!(all_ok);
        let got: Vec<u32> = outcomes.iter().map(|o| o.item_id).collect();
        let want: Vec<u32> = items.iter().map(|i| i.id).collect();
        assert_eq!(got, want);
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_bound() {
        let (exec, checker, items) = fixture();
        for item in &items {
            exec.push_delayed(
                item.command.as_deref().unwrap(),
                Duration::from_millis(20),
                stdout(&rate_line(10)),
            );
        }

        let (outcomes, _) = run_group(checker, items, 2).await;
        assert_eq!(outcomes.len(), 6);
        assert!(exec.peak() <= 2, "peak in-flight was {}", exec.peak());
    }

    #[tokio::test]
    async fn test_one_failure_does_not_cancel_siblings() {
        let (exec, checker, items) = fixture();
        // Item 2 reports a dead window; everyone else is healthy.
        for (idx, item) in items.iter().enumerate() {
            let sample = if idx == 1 { 0 } else { 10 };
            let out = stdout(&rate_line(sample));
            let cmd = item.command.as_deref().unwrap();
            exec.push(cmd, out.clone());
            // Cover the retry the all-zero result triggers.
            exec.push(cmd, out);
        }

        let (outcomes, all_ok) = run_group(checker, items, 3).await;
        assert!(!all_ok);
        assert_eq!(outcomes.len(), 6);
        assert_eq!(outcomes.iter().filter(|o| !o.ok).count(), 1);
        assert!(!outcomes[1].ok);
    }

    #[tokio::test]
    async fn test_empty_group_is_trivially_ok() {
        let (_exec, checker, _items) = fixture();
        let (outcomes, all_ok) = run_group(checker, Vec::new(), 4).await;
        assert!(all_ok);
        assert!(outcomes.is_empty());
    }
}
