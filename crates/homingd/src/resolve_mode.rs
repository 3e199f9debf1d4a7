//! Resolve mode: one demands document in, candidates and triage out.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use homing_core::{Demands, HomingConfig, RunContext};
use homing_inventory::{InventoryCache, InventoryClient};
use homing_resolver::ResolutionEngine;

pub async fn run<C: InventoryClient>(
    cache: Arc<InventoryCache<C>>,
    config: &HomingConfig,
    demands_path: &Path,
    plan_id: String,
    plan_name: String,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(demands_path)
        .with_context(|| format!("read demands {}", demands_path.display()))?;
    let demands = parse_demands(&raw)?;
    info!(demands = demands.len(), plan = %plan_id, "demands loaded");

    let engine = ResolutionEngine::new(cache, config);
    let run = RunContext { plan_id, plan_name };
    let resolution = engine.resolve_demands(&demands, &run).await;

    for (demand, candidates) in &resolution.candidates {
        if candidates.is_empty() {
            warn!(%demand, "demand has no candidates");
        }
    }

    let rendered = serde_json::to_string_pretty(&resolution)?;
    match output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("write result {}", path.display()))?;
            info!(path = %path.display(), "result written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

/// Parse a demands document: demand name → requirements.
pub fn parse_demands(raw: &str) -> anyhow::Result<Demands> {
    let demands: Demands = serde_json::from_str(raw).context("parse demands")?;
    for (name, requirements) in &demands {
        if requirements.is_empty() {
            warn!(demand = %name, "demand has no requirements");
        }
    }
    Ok(demands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use homing_core::InventoryType;

    #[test]
    fn demands_document_parses() {
        let demands = parse_demands(
            r#"{
                "vGMuxInfra": [
                    {"inventory_type": "service",
                     "attributes": {"equipment-role": "vG_Mux", "customer-id": "cust-1"}}
                ],
                "vG": [
                    {"inventory_type": "cloud"},
                    {"inventory_type": "service", "unique": "false"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(demands.len(), 2);
        assert_eq!(demands["vG"][0].inventory_type, InventoryType::Cloud);
        assert!(!demands["vG"][1].unique);
    }

    #[test]
    fn sample_document_parses() {
        let demands = parse_demands(include_str!("../fixtures/demands.json")).unwrap();
        assert_eq!(demands["vGMuxInfra"].len(), 2);
        assert_eq!(demands["vG"][0].region.as_deref(), Some("mtn6"));
        assert!(demands["vGMuxInfra"][0].conflict_identifier.is_some());
    }

    #[test]
    fn unknown_inventory_type_is_rejected() {
        let err = parse_demands(r#"{"vG": [{"inventory_type": "pnf"}]}"#).unwrap_err();
        assert!(format!("{err:#}").contains("unknown inventory type"));
    }
}
