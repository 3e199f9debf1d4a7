//! Transport candidates: service instances located through their zone.

use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use homing_core::{Candidate, DropReason, Requirement};
use homing_inventory::paths;
use homing_inventory::records::{list_field, non_empty, parse, ServiceInstance, Zone};
use homing_inventory::{first_related_link, related_links, Attributed, InventoryClient, LinkQuery};

use super::workload::put;
use super::{base_candidate, Discovered, Discovery, Dropped, ResolveContext, Resolved, Resolver};

const COMPLEX_KEY: &str = "complex.physical-location-id";

pub struct TransportResolver;

impl<C: InventoryClient> Resolver<C> for TransportResolver {
    async fn resolve(
        &self,
        ctx: &ResolveContext<C>,
        demand: &str,
        requirement: &Requirement,
    ) -> Vec<Discovery> {
        let (Some(customer), Some(subscription), Some(service_type), Some(role)) = (
            requirement.customer_id(),
            requirement.service_subscription(),
            requirement.service_type(),
            requirement.service_role(),
        ) else {
            warn!(%demand, "transport requirement needs customer, subscription, service type and role");
            return Vec::new();
        };

        let path = paths::service_instances(customer, subscription, service_type, role);
        let body = match ctx.cache.gateway().get(&path, "service instances").await {
            Ok(body) => body,
            Err(e) => {
                error!(%demand, error = %e, "service instance listing failed");
                return Vec::new();
            }
        };

        let mut found = Vec::new();
        for raw in list_field(&body, "service-instance") {
            let instance = match Attributed::<ServiceInstance>::from_value(raw.clone()) {
                Ok(instance) => instance,
                Err(e) => {
                    warn!(%demand, error = %e, "skipping malformed service-instance");
                    continue;
                }
            };
            let mut candidate = base_candidate(requirement, ctx.costs.transport_candidate_cost);
            let outcome = match build(ctx, &instance, &mut candidate).await {
                Ok(mut attributes) => {
                    // Instances were selected by these keys.
                    put(&mut attributes, "global-customer-id", Some(customer));
                    put(&mut attributes, "customer-id", Some(customer));
                    put(&mut attributes, "service-role", Some(role));
                    Ok(Discovered {
                        candidate,
                        attributes,
                    })
                }
                Err(reason) => Err(Dropped::from_candidate(&candidate, reason)),
            };
            found.push(outcome);
        }
        debug!(%demand, count = found.len(), "transport instances resolved");
        found
    }
}

async fn build<C: InventoryClient>(
    ctx: &ResolveContext<C>,
    instance: &Attributed<ServiceInstance>,
    candidate: &mut Candidate,
) -> Resolved<Map<String, Value>> {
    let Some(instance_id) = non_empty(instance.record.service_instance_id.clone()) else {
        return Err(DropReason::IncompleteBody {
            context: "service-instance-id".to_string(),
        });
    };
    candidate.candidate_id = instance_id;

    let Some(zone_link) = first_related_link(instance, "zone") else {
        return Err(DropReason::MissingRelationship {
            related_to: "zone".to_string(),
        });
    };
    let gateway = ctx.cache.gateway();
    let body = gateway
        .get_link(&zone_link, "", "zone")
        .await
        .map_err(|e| e.to_drop_reason("zone"))?;
    let zone: Zone = parse(&body).map_err(|_| DropReason::IncompleteBody {
        context: "zone".to_string(),
    })?;
    candidate.zone_id = zone.zone_id.clone();
    candidate.zone_name = zone.zone_name.clone();

    let mut complexes = related_links(&zone, "complex", LinkQuery::SearchKey(COMPLEX_KEY));
    if complexes.len() > 1 {
        return Err(DropReason::AmbiguousRelationship {
            related_to: "complex".to_string(),
            key: COMPLEX_KEY.to_string(),
        });
    }
    let reference = complexes.swap_remove(0);
    let (Some(link), Some(complex_id)) = (reference.link, reference.value) else {
        return Err(DropReason::ComplexUnavailable { complex_id: None });
    };
    let complex = ctx.cache.get_complex(&link, Some(&complex_id)).await?;
    candidate.location_id = complex_id;

    let site = complex.site_fields();
    let mut attributes = instance.attributes.clone();
    put(&mut attributes, "zone-id", zone.zone_id.as_deref());
    put(&mut attributes, "physical-location-id", Some(site.physical_location_id.as_str()));
    candidate.site = Some(site);
    Ok(attributes)
}
