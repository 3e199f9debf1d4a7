//! Cloud regions, straight from the region cache.

use serde_json::Map;
use tracing::debug;

use homing_core::Requirement;
use homing_inventory::{CloudRegionSnapshot, InventoryClient};

use super::workload::put;
use super::{base_candidate, vim_id, Discovered, Discovery, ResolveContext, Resolver};

pub struct CloudResolver;

impl<C: InventoryClient> Resolver<C> for CloudResolver {
    async fn resolve(
        &self,
        ctx: &ResolveContext<C>,
        demand: &str,
        requirement: &Requirement,
    ) -> Vec<Discovery> {
        let snapshot = ctx.cache.get_regions().await;
        if snapshot.is_empty() {
            debug!(%demand, "no regions in cache");
        }
        snapshot
            .regions
            .values()
            .map(|region| Ok(build(ctx, requirement, region)))
            .collect()
    }
}

fn build<C: InventoryClient>(
    ctx: &ResolveContext<C>,
    requirement: &Requirement,
    region: &CloudRegionSnapshot,
) -> Discovered {
    let mut candidate = base_candidate(requirement, ctx.costs.cloud_candidate_cost);
    candidate.candidate_id = region.region_id.clone();
    candidate.location_id = region.region_id.clone();
    candidate.cloud_owner = region.cloud_owner.clone();
    candidate.cloud_region_version = Some(region.version.clone());
    candidate.sriov_automation = Some(ctx.sriov_automation(&region.version));
    candidate.site = Some(region.complex.site_fields());

    if ctx.capability_aware() {
        let owner = region.cloud_owner.as_deref().unwrap_or_default();
        candidate.vim_id = Some(vim_id(owner, &region.region_id));
        candidate.flavors = region.flavors.clone();
    }

    let mut attributes = Map::new();
    put(&mut attributes, "cloud-owner", region.cloud_owner.as_deref());
    put(&mut attributes, "cloud-region-version", Some(region.version_raw.as_str()));
    put(&mut attributes, "cloud-type", region.cloud_type.as_deref());
    put(&mut attributes, "cloud-zone", region.cloud_zone.as_deref());
    put(&mut attributes, "complex-name", region.complex.complex_name.as_deref());
    put(&mut attributes, "physical-location-id", Some(region.physical_location_id.as_str()));

    Discovered {
        candidate,
        attributes,
    }
}
