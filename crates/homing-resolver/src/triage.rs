//! Per-run log of dropped candidates.

use tracing::warn;

use homing_core::{DropReason, RunContext, TriageRecord, TriageReport};

/// Append-only collector of drop records.
///
/// One collector per demand task; the engine merges them in demand order
/// once the run completes.
#[derive(Debug, Default)]
pub struct TriageCollector {
    records: Vec<TriageRecord>,
}

impl TriageCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        candidate_id: &str,
        location_id: &str,
        demand_name: &str,
        reason: DropReason,
    ) {
        warn!(
            demand = %demand_name,
            candidate = %candidate_id,
            location = %location_id,
            %reason,
            "candidate dropped"
        );
        self.records.push(TriageRecord {
            candidate_id: candidate_id.to_string(),
            location_id: location_id.to_string(),
            demand_name: demand_name.to_string(),
            reason,
        });
    }

    pub fn records(&self) -> &[TriageRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn merge(&mut self, other: TriageCollector) {
        self.records.extend(other.records);
    }

    pub fn into_report(self, ctx: &RunContext) -> TriageReport {
        let mut report = TriageReport::new(ctx);
        report.dropped = self.records;
        report
    }
}
