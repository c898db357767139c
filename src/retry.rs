//! Selective retry of previously failed checks.

use std::collections::BTreeSet;

use crate::catalog::GATE_ITEM_ID;
use crate::report::RunResult;

/// The item ids the next run should cover, given the previous result.
///
/// A failed gate collapses the selection to the gate alone: nothing
/// else is worth checking until reachability is restored. Otherwise
/// exactly the failed items are re-run; previously passed items stay
/// untouched and absent from the next result.
pub fn select_failed(previous: &RunResult) -> BTreeSet<u32> {
    let failed: BTreeSet<u32> = previous.failed.keys().copied().collect();
    if failed.contains(&GATE_ITEM_ID) {
        return [GATE_ITEM_ID].into();
    }
    failed
}
