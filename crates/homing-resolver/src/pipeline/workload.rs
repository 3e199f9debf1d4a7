//! Workload (generic-vnf) discovery and the relationship chains shared by
//! the service and vf-module pipelines.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, error, warn};

use homing_core::{DropReason, InterfaceDetail, Requirement, VserverDetail};
use homing_inventory::paths::{self, normalize_version};
use homing_inventory::records::{
    list_field, non_empty, parse, CloudRegion, GenericVnf, Pserver, Vserver,
};
use homing_inventory::{
    group_agree, related_links, Attributed, ComplexLocation, HasRelationships, InventoryClient,
    LinkQuery, RelationshipLink,
};

use super::{ResolveContext, Resolved};

const CLOUD_OWNER_KEY: &str = "cloud-region.cloud-owner";
const CLOUD_REGION_KEY: &str = "cloud-region.cloud-region-id";
const CUSTOMER_KEY: &str = "customer.global-customer-id";
const SERVICE_INSTANCE_KEY: &str = "service-instance.service-instance-id";
const COMPLEX_KEY: &str = "complex.physical-location-id";

/// List workloads by model and by equipment role, deduplicated by vnf-id.
///
/// A failed listing contributes no workloads.
pub(crate) async fn discover<C: InventoryClient>(
    ctx: &ResolveContext<C>,
    demand: &str,
    requirement: &Requirement,
) -> Vec<Attributed<GenericVnf>> {
    let mut queries = Vec::new();
    if let Some(model) = requirement.model_invariant_id() {
        queries.push(paths::generic_vnfs_by_model(model, requirement.model_version_id()));
    }
    if let Some(role) = requirement.service_type() {
        queries.push(paths::generic_vnfs_by_role(role));
    }

    let gateway = ctx.cache.gateway();
    let mut seen = HashSet::new();
    let mut workloads = Vec::new();
    for path in queries {
        let body = match gateway.get(&path, "generic-vnf").await {
            Ok(body) => body,
            Err(e) => {
                warn!(%demand, error = %e, "workload listing failed");
                continue;
            }
        };
        for raw in list_field(&body, "generic-vnf") {
            let vnf = match Attributed::<GenericVnf>::from_value(raw.clone()) {
                Ok(vnf) => vnf,
                Err(e) => {
                    warn!(%demand, error = %e, "skipping malformed generic-vnf");
                    continue;
                }
            };
            if seen.insert(vnf.record.vnf_id.clone()) {
                workloads.push(vnf);
            }
        }
    }
    debug!(%demand, count = workloads.len(), "workloads discovered");
    workloads
}

/// The single value of a relationship key, requiring agreement when the
/// relation is multi-valued.
fn agreed<R: HasRelationships + ?Sized>(
    record: &R,
    related_to: &str,
    query: LinkQuery<'_>,
    key: &str,
) -> Resolved<RelationshipLink> {
    let mut links = related_links(record, related_to, query);
    if !group_agree(&links) {
        return Err(DropReason::AmbiguousRelationship {
            related_to: related_to.to_string(),
            key: key.to_string(),
        });
    }
    Ok(links.swap_remove(0))
}

pub(crate) fn cloud_owner<R: HasRelationships + ?Sized>(record: &R) -> Resolved<Option<String>> {
    Ok(agreed(record, "vserver", LinkQuery::SearchKey(CLOUD_OWNER_KEY), CLOUD_OWNER_KEY)?.value)
}

/// Region id plus its version, looked up by id and normalized.
pub(crate) async fn cloud_region<C: InventoryClient, R: HasRelationships + ?Sized>(
    ctx: &ResolveContext<C>,
    record: &R,
) -> Resolved<(String, String)> {
    let Some(region_id) = non_empty(
        agreed(record, "vserver", LinkQuery::SearchKey(CLOUD_REGION_KEY), CLOUD_REGION_KEY)?.value,
    ) else {
        return Err(DropReason::MissingRelationship {
            related_to: "cloud-region".to_string(),
        });
    };

    let body = ctx
        .cache
        .gateway()
        .get(&paths::cloud_regions_by_id(&region_id), "cloud region")
        .await
        .map_err(|e| e.to_drop_reason("cloud region"))?;
    let version = list_field(&body, "cloud-region")
        .iter()
        .filter_map(|raw| parse::<CloudRegion>(raw).ok())
        .filter_map(|region| region.cloud_region_version)
        .last()
        .map(|raw| normalize_version(&raw))
        .unwrap_or_default();
    Ok((region_id, version))
}

/// Customer and service instance the workload belongs to, checked
/// against the requested customer.
pub(crate) fn service_instance<R: HasRelationships + ?Sized>(
    record: &R,
    customer_id: &str,
) -> Resolved<String> {
    let found_customer = agreed(
        record,
        "service-instance",
        of_customer(CUSTOMER_KEY, customer_id),
        CUSTOMER_KEY,
    )?
    .value;
    let instance = agreed(
        record,
        "service-instance",
        of_customer(SERVICE_INSTANCE_KEY, customer_id),
        SERVICE_INSTANCE_KEY,
    )?
    .value;

    if found_customer.as_deref() != Some(customer_id) {
        return Err(DropReason::TenantMismatch {
            expected: customer_id.to_string(),
            found: found_customer,
        });
    }
    non_empty(instance).ok_or_else(|| DropReason::MissingRelationship {
        related_to: "service-instance".to_string(),
    })
}

fn of_customer<'a>(search_key: &'a str, customer_id: &'a str) -> LinkQuery<'a> {
    LinkQuery::Matching {
        search_key,
        match_key: CUSTOMER_KEY,
        match_value: customer_id,
    }
}

/// Links of the virtual servers a workload runs on.
pub(crate) fn vserver_links<R: HasRelationships + ?Sized>(record: &R) -> Vec<Option<String>> {
    related_links(record, "vserver", LinkQuery::SearchKey(CLOUD_OWNER_KEY))
        .into_iter()
        .map(|l| l.link)
        .collect()
}

/// Fetch one virtual server with its interfaces.
pub(crate) async fn fetch_vserver<C: InventoryClient>(
    ctx: &ResolveContext<C>,
    link: Option<&str>,
) -> Resolved<Attributed<Vserver>> {
    let Some(link) = link else {
        return Err(DropReason::MissingRelationship {
            related_to: "vserver".to_string(),
        });
    };
    let body = ctx
        .cache
        .gateway()
        .get_link(link, "?depth=2", "vserver")
        .await
        .map_err(|e| e.to_drop_reason("vserver"))?;
    Attributed::from_value(body).map_err(|_| DropReason::IncompleteBody {
        context: "vserver".to_string(),
    })
}

/// The complex reference of a virtual server, through its physical server.
///
/// Without a physical server, capability-aware runs fall back to the
/// complex of the cloud region itself.
pub(crate) async fn vserver_complex<C: InventoryClient>(
    ctx: &ResolveContext<C>,
    vserver: &Attributed<Vserver>,
    cloud_owner: Option<&str>,
    region_id: &str,
) -> Resolved<RelationshipLink> {
    let pservers = related_links(vserver, "pserver", LinkQuery::LinkOnly);
    if pservers.len() > 1 {
        return Err(DropReason::AmbiguousRelationship {
            related_to: "pserver".to_string(),
            key: "related-link".to_string(),
        });
    }
    let gateway = ctx.cache.gateway();

    let complexes = match pservers[0].link.as_deref() {
        Some(link) => {
            let body = gateway
                .get_link(link, "", "pserver")
                .await
                .map_err(|e| e.to_drop_reason("pserver"))?;
            let pserver: Pserver = parse(&body).map_err(|_| DropReason::IncompleteBody {
                context: "pserver".to_string(),
            })?;
            related_links(&pserver, "complex", LinkQuery::SearchKey(COMPLEX_KEY))
        }
        None if ctx.capability_aware() => {
            let Some(owner) = cloud_owner else {
                error!(region = %region_id, "cloud owner unknown, no pserver fallback");
                return Err(DropReason::MissingRelationship {
                    related_to: "pserver".to_string(),
                });
            };
            let body = gateway
                .get(&paths::cloud_region_by_owner(owner, region_id), "cloud region")
                .await
                .map_err(|e| e.to_drop_reason("cloud region"))?;
            let raw = list_field(&body, "cloud-region").first().unwrap_or(&body);
            let region: CloudRegion = parse(raw).map_err(|_| DropReason::IncompleteBody {
                context: "cloud region".to_string(),
            })?;
            related_links(&region, "complex", LinkQuery::SearchKey(COMPLEX_KEY))
        }
        None => {
            return Err(DropReason::MissingRelationship {
                related_to: "pserver".to_string(),
            });
        }
    };

    if !group_agree(&complexes) {
        return Err(DropReason::AmbiguousRelationship {
            related_to: "complex".to_string(),
            key: COMPLEX_KEY.to_string(),
        });
    }
    Ok(complexes.into_iter().next().unwrap_or_default())
}

/// Resolve the one complex the collected references agree on.
pub(crate) async fn agreed_complex<C: InventoryClient>(
    ctx: &ResolveContext<C>,
    references: &[RelationshipLink],
) -> Resolved<ComplexLocation> {
    if !group_agree(references) {
        return Err(DropReason::AmbiguousRelationship {
            related_to: "complex".to_string(),
            key: COMPLEX_KEY.to_string(),
        });
    }
    let (Some(link), Some(complex_id)) = references
        .first()
        .map(|r| (r.link.as_deref(), r.value.as_deref()))
        .unwrap_or((None, None))
    else {
        return Err(DropReason::ComplexUnavailable { complex_id: None });
    };
    ctx.cache.get_complex(link, Some(complex_id)).await
}

/// Where a workload's virtual servers are, and what they look like.
pub(crate) struct VserverChain {
    pub complex: ComplexLocation,
    pub vservers: Vec<VserverDetail>,
}

/// Walk every virtual server of `record` to the complex they share.
///
/// A virtual server that cannot be followed is skipped and its reason
/// pushed to `skipped`; the record is dropped only when none can be
/// followed. With `interfaces` set, virtual servers reporting no
/// interfaces are skipped too.
pub(crate) async fn vserver_chain<C: InventoryClient, R: HasRelationships + ?Sized>(
    ctx: &ResolveContext<C>,
    record: &R,
    cloud_owner: Option<&str>,
    region_id: &str,
    interfaces: bool,
    skipped: &mut Vec<DropReason>,
) -> Resolved<VserverChain> {
    let mut references = Vec::new();
    let mut vservers = Vec::new();

    for link in vserver_links(record) {
        let step = async {
            let vserver = fetch_vserver(ctx, link.as_deref()).await?;
            let reference = vserver_complex(ctx, &vserver, cloud_owner, region_id).await?;
            let detail = if interfaces {
                Some(vserver_detail(&vserver.record).ok_or_else(|| {
                    DropReason::InterfacesMissing {
                        vserver_id: vserver.record.vserver_id.clone(),
                    }
                })?)
            } else {
                None
            };
            Ok::<_, DropReason>((reference, detail))
        };
        match step.await {
            Ok((reference, detail)) => {
                references.push(reference);
                vservers.extend(detail);
            }
            Err(reason) => {
                debug!(link = ?link, %reason, "skipping vserver");
                skipped.push(reason);
            }
        }
    }

    if references.is_empty() {
        return Err(DropReason::ComplexUnavailable { complex_id: None });
    }
    let complex = agreed_complex(ctx, &references).await?;
    Ok(VserverChain { complex, vservers })
}

/// Interfaces of a virtual server, or `None` when it reports none.
pub(crate) fn vserver_detail(vserver: &Vserver) -> Option<VserverDetail> {
    let interfaces = vserver.l_interfaces.as_ref()?;
    if interfaces.l_interface.is_empty() {
        return None;
    }
    let interfaces = interfaces
        .l_interface
        .iter()
        .map(|iface| InterfaceDetail {
            interface_id: iface.interface_id.clone(),
            interface_name: iface.interface_name.clone(),
            macaddr: iface.macaddr.clone(),
            network_id: iface.network_name.clone(),
            ipv4_addresses: iface
                .l3_interface_ipv4_address_list
                .iter()
                .filter_map(|a| a.l3_interface_ipv4_address.clone())
                .collect(),
            ipv6_addresses: iface
                .l3_interface_ipv6_address_list
                .iter()
                .filter_map(|a| a.l3_interface_ipv6_address.clone())
                .collect(),
        })
        .collect();
    Some(VserverDetail {
        vserver_id: vserver.vserver_id.clone(),
        vserver_name: vserver.vserver_name.clone(),
        interfaces,
    })
}

/// Set a string attribute used for matching.
pub(crate) fn put(attributes: &mut serde_json::Map<String, Value>, key: &str, value: Option<&str>) {
    let value = value.map_or(Value::Null, |v| Value::String(v.to_string()));
    attributes.insert(key.to_string(), value);
}
