//! Triage records: why a candidate was not offered for a demand.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::demand::RunContext;

/// Why a candidate (or an in-progress item) was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropReason {
    /// The inventory system could not be reached.
    NoResponse { context: String },
    /// The inventory system answered with a non-success status.
    RemoteRejected { context: String, status: u16 },
    /// A successful response lacked a field we needed.
    IncompleteBody { context: String },
    /// A record did not reference a required related item.
    MissingRelationship { related_to: String },
    /// A relationship resolved to several disagreeing values.
    AmbiguousRelationship { related_to: String, key: String },
    /// The workload belongs to a different customer.
    TenantMismatch {
        expected: String,
        found: Option<String>,
    },
    ComplexUnavailable { complex_id: Option<String> },
    InterfacesMissing { vserver_id: Option<String> },
    AttributeMismatch { attribute: String },
    RegionMismatch { attribute: String, expected: String },
    Excluded,
    NotRequired,
    ConflictAttributeMissing { attribute: String },
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::NoResponse { context } => write!(f, "no response from inventory ({context})"),
            DropReason::RemoteRejected { context, status } => {
                write!(f, "inventory returned HTTP {status} ({context})")
            }
            DropReason::IncompleteBody { context } => {
                write!(f, "incomplete inventory response ({context})")
            }
            DropReason::MissingRelationship { related_to } => {
                write!(f, "{related_to} relationship not available")
            }
            DropReason::AmbiguousRelationship { related_to, key } => {
                write!(f, "more than one {related_to} ({key})")
            }
            DropReason::TenantMismatch { expected, found } => write!(
                f,
                "candidate is for a different customer (expected {expected}, found {})",
                found.as_deref().unwrap_or("none")
            ),
            DropReason::ComplexUnavailable { complex_id } => write!(
                f,
                "complex information not available ({})",
                complex_id.as_deref().unwrap_or("unknown")
            ),
            DropReason::InterfacesMissing { vserver_id } => write!(
                f,
                "vserver interfaces not available ({})",
                vserver_id.as_deref().unwrap_or("unknown")
            ),
            DropReason::AttributeMismatch { attribute } => {
                write!(f, "attribute {attribute} does not match")
            }
            DropReason::RegionMismatch { attribute, expected } => {
                write!(f, "candidate {attribute} does not match {expected}")
            }
            DropReason::Excluded => f.write_str("excluded candidate"),
            DropReason::NotRequired => f.write_str("not in required candidates"),
            DropReason::ConflictAttributeMissing { attribute } => {
                write!(f, "conflict identifier attribute {attribute} missing")
            }
        }
    }
}

/// One dropped candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageRecord {
    pub candidate_id: String,
    pub location_id: String,
    pub demand_name: String,
    pub reason: DropReason,
}

/// All drops recorded during one resolution run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriageReport {
    pub plan_id: String,
    pub plan_name: String,
    pub dropped: Vec<TriageRecord>,
}

impl TriageReport {
    pub fn new(ctx: &RunContext) -> Self {
        Self {
            plan_id: ctx.plan_id.clone(),
            plan_name: ctx.plan_name.clone(),
            dropped: Vec::new(),
        }
    }

    /// Records dropped for one demand, in the order they were recorded.
    pub fn for_demand<'a>(&'a self, demand: &'a str) -> impl Iterator<Item = &'a TriageRecord> + 'a {
        self.dropped.iter().filter(move |r| r.demand_name == demand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_serializes_with_kind_tag() {
        let json = serde_json::to_value(DropReason::Excluded).unwrap();
        assert_eq!(json["kind"], "excluded");

        let json = serde_json::to_value(DropReason::TenantMismatch {
            expected: "c1".to_string(),
            found: Some("c2".to_string()),
        })
        .unwrap();
        assert_eq!(json["kind"], "tenant_mismatch");
        assert_eq!(json["found"], "c2");
    }

    #[test]
    fn reason_display_is_readable() {
        let reason = DropReason::RemoteRejected {
            context: "vserver".to_string(),
            status: 404,
        };
        assert_eq!(reason.to_string(), "inventory returned HTTP 404 (vserver)");
    }

    #[test]
    fn report_filters_by_demand() {
        let mut report = TriageReport::new(&RunContext {
            plan_id: "p1".to_string(),
            plan_name: "plan".to_string(),
        });
        for demand in ["a", "b", "a"] {
            report.dropped.push(TriageRecord {
                candidate_id: "c".to_string(),
                location_id: String::new(),
                demand_name: demand.to_string(),
                reason: DropReason::NotRequired,
            });
        }
        assert_eq!(report.for_demand("a").count(), 2);
        assert_eq!(report.plan_id, "p1");
    }
}
