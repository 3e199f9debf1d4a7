//! Vf-module candidates: one per deployable sub-component of a workload.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use homing_core::{Candidate, DropReason, Requirement};
use homing_inventory::paths;
use homing_inventory::records::{non_empty, parse, GenericVnf, VfModule};
use homing_inventory::{Attributed, InventoryClient};

use super::service::dropped;
use super::workload::{self, put};
use super::{
    base_candidate, vim_id, Discovered, Discovery, ResolveContext, Resolved, Resolver,
};

pub struct VfModuleResolver;

impl<C: InventoryClient> Resolver<C> for VfModuleResolver {
    async fn resolve(
        &self,
        ctx: &ResolveContext<C>,
        demand: &str,
        requirement: &Requirement,
    ) -> Vec<Discovery> {
        let Some(customer_id) = requirement.customer_id() else {
            warn!(%demand, "vf-module requirement without customer id");
            return Vec::new();
        };

        let mut found: Vec<Discovery> = Vec::new();
        for vnf in workload::discover(ctx, demand, requirement).await {
            let mut base = base_candidate(requirement, ctx.costs.service_candidate_cost);
            base.host_id = vnf.record.vnf_name.clone();
            base.vlan_key = requirement.vlan_key.clone();
            base.port_key = requirement.port_key.clone();
            base.nf_name = vnf.record.vnf_name.clone();
            base.nf_id = vnf.record.vnf_id.clone();
            base.nf_type = Some("vnf".to_string());
            base.vnf_type = vnf.record.vnf_type.clone();
            base.ipv4_oam_address = vnf.record.ipv4_oam_address.clone();
            base.ipv6_oam_address = vnf.record.ipv6_oam_address.clone();

            let modules = match modules_of(ctx, customer_id, &vnf, &mut base).await {
                Ok(modules) => modules,
                Err(reason) => {
                    found.push(Err(dropped(&base, &vnf, reason)));
                    continue;
                }
            };
            debug!(%demand, vnf = ?vnf.record.vnf_id, count = modules.len(), "vf-modules listed");

            for module in modules {
                let mut candidate = base.clone();
                let mut skipped = Vec::new();
                let outcome =
                    build(ctx, customer_id, &vnf, &module, &mut candidate, &mut skipped).await;
                found.extend(
                    skipped
                        .into_iter()
                        .map(|reason| Err(dropped(&candidate, &vnf, reason))),
                );
                found.push(match outcome {
                    Ok(attributes) => Ok(Discovered {
                        candidate,
                        attributes,
                    }),
                    Err(reason) => Err(dropped(&candidate, &vnf, reason)),
                });
            }
        }
        found
    }
}

/// Check the workload's tenant and list its vf-modules.
async fn modules_of<C: InventoryClient>(
    ctx: &ResolveContext<C>,
    customer_id: &str,
    vnf: &Attributed<GenericVnf>,
    base: &mut Candidate,
) -> Resolved<Vec<Attributed<VfModule>>> {
    base.service_instance_id = Some(workload::service_instance(vnf, customer_id)?);

    let Some(vnf_id) = vnf.record.vnf_id.as_deref() else {
        return Err(DropReason::IncompleteBody {
            context: "generic-vnf".to_string(),
        });
    };
    let body = ctx
        .cache
        .gateway()
        .get(&paths::generic_vnf_detail(vnf_id), "generic-vnf")
        .await
        .map_err(|e| e.to_drop_reason("generic-vnf"))?;
    let detail: GenericVnf = parse(&body).map_err(|_| DropReason::IncompleteBody {
        context: "generic-vnf".to_string(),
    })?;

    let modules: Vec<_> = detail
        .vf_modules
        .map(|list| list.vf_module)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|raw| match Attributed::<VfModule>::from_value(raw) {
            Ok(module) => Some(module),
            Err(e) => {
                warn!(%vnf_id, error = %e, "skipping malformed vf-module");
                None
            }
        })
        .collect();
    if modules.is_empty() {
        return Err(DropReason::IncompleteBody {
            context: "vf-modules".to_string(),
        });
    }
    Ok(modules)
}

async fn build<C: InventoryClient>(
    ctx: &ResolveContext<C>,
    customer_id: &str,
    vnf: &Attributed<GenericVnf>,
    module: &Attributed<VfModule>,
    candidate: &mut Candidate,
    skipped: &mut Vec<DropReason>,
) -> Resolved<Map<String, Value>> {
    candidate.vf_module_name = module.record.vf_module_name.clone();
    let Some(module_id) = non_empty(module.record.vf_module_id.clone()) else {
        return Err(DropReason::IncompleteBody {
            context: "vf-module-id".to_string(),
        });
    };
    candidate.candidate_id = module_id.clone();
    candidate.vf_module_id = Some(module_id);

    let owner = workload::cloud_owner(module)?;
    candidate.cloud_owner = owner.clone();
    let (region_id, version) = workload::cloud_region(ctx, module).await?;
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

    let chain = workload::vserver_chain(ctx, module, owner.as_deref(), &region_id, true, skipped).await?;
    let site = chain.complex.site_fields();
    candidate.vservers = chain.vservers;

    let mut attributes = vnf.attributes.clone();
    attributes.extend(module.attributes.clone());
    put(&mut attributes, "global-customer-id", Some(customer_id));
    put(&mut attributes, "customer-id", Some(customer_id));
    put(&mut attributes, "cloud-region-id", Some(region_id.as_str()));
    put(&mut attributes, "physical-location-id", Some(site.physical_location_id.as_str()));
    put(&mut attributes, "service_instance_id", candidate.service_instance_id.as_deref());
    candidate.site = Some(site);
    Ok(attributes)
}
