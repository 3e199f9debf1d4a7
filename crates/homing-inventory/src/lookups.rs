//! One-off inventory lookups used outside demand resolution.
//!
//! These answer location and role questions for the layer that builds
//! demands. A failed lookup yields `None` after logging.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

use crate::client::{InventoryClient, InventoryGateway, Method};
use crate::paths;
use crate::records::{
    list_field, non_empty, parse, ComplexRecord, GenericVnf, InstanceGroup, L3Network,
};
use crate::relationships::{related_links, LinkQuery};

/// Named query reserved in inventory for role lookups.
const ROLE_NAMED_QUERY_UUID: &str = "role-UUID";

/// Coordinates of a site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoLocation {
    pub latitude: String,
    pub longitude: String,
    pub country: Option<String>,
}

impl GeoLocation {
    fn from_complex(record: ComplexRecord) -> Option<Self> {
        Some(Self {
            latitude: non_empty(record.latitude)?,
            longitude: non_empty(record.longitude)?,
            country: non_empty(record.country),
        })
    }
}

/// Locate a pnf or pserver by host name through the complex it sits in.
///
/// Only latitude and longitude are required of the complex.
pub async fn resolve_host_location<C: InventoryClient>(
    gateway: &InventoryGateway<C>,
    host_name: &str,
) -> Option<GeoLocation> {
    let query = json!({
        "start": [
            format!("network/pnfs/pnf/{host_name}"),
            format!("cloud-infrastructure/pservers/pserver/{host_name}"),
        ],
        "query": "query/ucpe-instance",
    });
    let body = gateway
        .fetch(Method::Put, &paths::named_query(), Some(query), "host name")
        .await
        .ok()?;

    let complex_link = list_field(&body, "results")
        .iter()
        .filter(|r| r.get("resource-type").and_then(Value::as_str) == Some("complex"))
        .filter_map(|r| r.get("resource-link").and_then(Value::as_str))
        .next_back();
    let Some(complex_link) = complex_link else {
        error!(host = %host_name, "no complex link for host");
        return None;
    };

    let body = match gateway.get_link(complex_link, "", "complex").await {
        Ok(body) => body,
        Err(e) => {
            error!(host = %host_name, link = %complex_link, error = %e, "complex lookup failed");
            return None;
        }
    };
    let record = body.get("complex").unwrap_or(&body);
    let location = parse::<ComplexRecord>(record)
        .ok()
        .and_then(GeoLocation::from_complex);
    if location.is_none() {
        error!(host = %host_name, link = %complex_link, "no latitude and longitude for host");
    }
    location
}

/// Locate a complex by its CLLI code.
pub async fn resolve_clli_location<C: InventoryClient>(
    gateway: &InventoryGateway<C>,
    clli: &str,
) -> Option<GeoLocation> {
    let body = gateway.get(&paths::complex_by_clli(clli), "clli name").await.ok()?;
    let location = parse::<ComplexRecord>(&body)
        .ok()
        .and_then(GeoLocation::from_complex);
    if location.is_none() {
        error!(%clli, "no latitude and longitude for CLLI code");
    }
    location
}

/// Ids of cloud regions hosting an l3-network with the given role.
pub async fn check_network_roles<C: InventoryClient>(
    gateway: &InventoryGateway<C>,
    network_role: &str,
) -> Option<BTreeSet<String>> {
    let query = json!({
        "query-parameters": {
            "named-query": {"named-query-uuid": ROLE_NAMED_QUERY_UUID}
        },
        "instance-filters": {
            "instance-filter": [{"l3-network": {"network-role": network_role}}]
        }
    });
    let body = gateway
        .fetch(
            Method::Get,
            &paths::l3_networks_by_role(network_role),
            Some(query),
            "role",
        )
        .await
        .ok()?;

    let mut region_ids = BTreeSet::new();
    for raw in list_field(&body, "l3-network") {
        let Ok(network) = parse::<L3Network>(raw) else {
            continue;
        };
        let regions = related_links(
            &network,
            "cloud-region",
            LinkQuery::SearchKey("cloud-region.cloud-region-id"),
        );
        region_ids.extend(regions.into_iter().filter_map(|r| r.value));
    }
    Some(region_ids)
}

/// Role of the allotted resource under the service instance of a vnf.
pub async fn check_candidate_role<C: InventoryClient>(
    gateway: &InventoryGateway<C>,
    host_id: &str,
) -> Option<String> {
    let body = gateway
        .get(&paths::generic_vnfs_by_name(host_id), "vnf name")
        .await
        .ok()?;
    let raw = list_field(&body, "generic-vnf").first()?;
    let vnf: GenericVnf = parse(raw).ok()?;

    let instances = related_links(
        &vnf,
        "service-instance",
        LinkQuery::SearchKey("customer.global-customer-id"),
    );
    if instances.len() != 1 {
        return None;
    }
    let Some(link) = instances[0].link.as_deref() else {
        error!(host = %host_id, "no candidate role link for host");
        return None;
    };

    let body = gateway
        .get_link(link, "/allotted-resources?depth=all", "candidate role")
        .await
        .ok()?;
    list_field(&body, "allotted-resource")
        .first()?
        .get("role")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Service-instance id pairs from instance groups matching a description.
///
/// Groups that do not relate to exactly two service instances are skipped.
pub async fn get_inventory_group_pairs<C: InventoryClient>(
    gateway: &InventoryGateway<C>,
    description: &str,
) -> Option<Vec<(String, String)>> {
    let body = gateway
        .get(
            &paths::instance_groups_by_description(description),
            "inventory group",
        )
        .await
        .ok()?;
    if body.get("instance-group").is_none() {
        error!(%description, "no instance groups in inventory response");
        return None;
    }

    let mut pairs = Vec::new();
    for raw in list_field(&body, "instance-group") {
        let Ok(group) = parse::<InstanceGroup>(raw) else {
            continue;
        };
        let instances = related_links(
            &group,
            "service-instance",
            LinkQuery::SearchKey("service-instance.service-instance-id"),
        );
        match instances.as_slice() {
            [a, b] => pairs.push((
                a.value.clone().unwrap_or_default(),
                b.value.clone().unwrap_or_default(),
            )),
            _ => error!(group = ?group.id, count = instances.len(), "instance group is not a pair"),
        }
    }
    Some(pairs)
}
