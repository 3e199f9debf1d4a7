//! Service candidates: deployed workloads of the requesting customer.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use homing_core::{Candidate, DropReason, Requirement};
use homing_inventory::records::GenericVnf;
use homing_inventory::{Attributed, InventoryClient};

use super::workload::{self, put};
use super::{
    base_candidate, vim_id, Discovered, Discovery, Dropped, ResolveContext, Resolved, Resolver,
};

pub struct ServiceResolver;

impl<C: InventoryClient> Resolver<C> for ServiceResolver {
    async fn resolve(
        &self,
        ctx: &ResolveContext<C>,
        demand: &str,
        requirement: &Requirement,
    ) -> Vec<Discovery> {
        let Some(customer_id) = requirement.customer_id() else {
            warn!(%demand, "service requirement without customer id");
            return Vec::new();
        };

        let mut found: Vec<Discovery> = Vec::new();
        for vnf in workload::discover(ctx, demand, requirement).await {
            let mut candidate = base_candidate(requirement, ctx.costs.service_candidate_cost);
            candidate.host_id = vnf.record.vnf_name.clone();
            candidate.vlan_key = requirement.vlan_key.clone();
            candidate.port_key = requirement.port_key.clone();

            let mut skipped = Vec::new();
            let outcome = build(ctx, customer_id, &vnf, &mut candidate, &mut skipped).await;
            found.extend(skipped.into_iter().map(|reason| Err(dropped(&candidate, &vnf, reason))));
            found.push(match outcome {
                Ok(attributes) => Ok(Discovered {
                    candidate,
                    attributes,
                }),
                Err(reason) => Err(dropped(&candidate, &vnf, reason)),
            });
        }
        found
    }
}

async fn build<C: InventoryClient>(
    ctx: &ResolveContext<C>,
    customer_id: &str,
    vnf: &Attributed<GenericVnf>,
    candidate: &mut Candidate,
    skipped: &mut Vec<DropReason>,
) -> Resolved<Map<String, Value>> {
    let owner = workload::cloud_owner(vnf)?;
    candidate.cloud_owner = owner.clone();

    let (region_id, version) = workload::cloud_region(ctx, vnf).await?;
    candidate.location_id = region_id.clone();
    candidate.cloud_region_version = Some(version.clone());

    if ctx.capability_aware() {
        let Some(owner) = owner.as_deref() else {
            return Err(DropReason::MissingRelationship {
                related_to: "cloud-owner".to_string(),
            });
        };
        candidate.vim_id = Some(vim_id(owner, &region_id));
    }
    candidate.sriov_automation = Some(ctx.sriov_automation(&version));

    candidate.candidate_id = workload::service_instance(vnf, customer_id)?;

    let chain = workload::vserver_chain(ctx, vnf, owner.as_deref(), &region_id, false, skipped).await?;
    let site = chain.complex.site_fields();
    debug!(candidate = %candidate.candidate_id, complex = %site.physical_location_id, "service candidate located");

    let mut attributes = vnf.attributes.clone();
    put(&mut attributes, "global-customer-id", Some(customer_id));
    put(&mut attributes, "customer-id", Some(customer_id));
    put(&mut attributes, "cloud-region-id", Some(region_id.as_str()));
    put(&mut attributes, "physical-location-id", Some(site.physical_location_id.as_str()));
    candidate.site = Some(site);
    Ok(attributes)
}

/// Drop record for a workload; identified by vnf-id until its service
/// instance is known.
pub(super) fn dropped(
    candidate: &Candidate,
    vnf: &Attributed<GenericVnf>,
    reason: DropReason,
) -> Dropped {
    let mut dropped = Dropped::from_candidate(candidate, reason);
    if dropped.candidate_id.is_empty() {
        dropped.candidate_id = vnf.record.vnf_id.clone().unwrap_or_default();
    }
    dropped
}
