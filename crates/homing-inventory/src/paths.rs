//! Inventory URI building.
//!
//! Every request path is prefixed with the configured API version.
//! Related links embedded in records carry their own absolute URI; they
//! are cut at the version segment and re-versioned so requests always go
//! through the configured base URL.

/// Builds version-prefixed inventory paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedPaths {
    version: String,
}

impl VersionedPaths {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.trim_matches('/').to_string(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// `/{version}/{path}`.
    pub fn versioned(&self, path: &str) -> String {
        format!("/{}/{}", self.version, path.trim_start_matches('/'))
    }

    /// The part of a related link after the version segment, with a leading `/`.
    ///
    /// Returns `None` if the link does not contain the version.
    pub fn path_from_link(&self, link: &str) -> Option<String> {
        let marker = format!("/{}/", self.version);
        link.split_once(marker.as_str())
            .map(|(_, rest)| format!("/{rest}"))
    }

    /// A related link converted to a versioned request path.
    pub fn versioned_link(&self, link: &str) -> Option<String> {
        self.path_from_link(link).map(|p| self.versioned(&p))
    }
}

/// Percent-encode a query value.
pub fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Keep only digits and dots: `"aic3.0"` → `"3.0"`.
pub fn normalize_version(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect()
}

// ── Unversioned request paths ──────────────────────────────────────

pub fn cloud_regions_shallow() -> String {
    "/cloud-infrastructure/cloud-regions/?depth=0".to_string()
}

pub fn cloud_regions_by_id(region_id: &str) -> String {
    format!(
        "/cloud-infrastructure/cloud-regions/?cloud-region-id={}",
        encode(region_id)
    )
}

pub fn cloud_region_by_owner(cloud_owner: &str, region_id: &str) -> String {
    format!(
        "/cloud-infrastructure/cloud-regions/cloud-region/?cloud-owner={}&cloud-region-id={}",
        encode(cloud_owner),
        encode(region_id)
    )
}

pub fn flavors(cloud_owner: &str, region_id: &str) -> String {
    format!(
        "/cloud-infrastructure/cloud-regions/cloud-region/{}/{}/flavors?depth=full",
        encode(cloud_owner),
        encode(region_id)
    )
}

pub fn generic_vnfs_by_model(model_invariant_id: &str, model_version_id: Option<&str>) -> String {
    match model_version_id {
        Some(version) => format!(
            "/network/generic-vnfs/?model-invariant-id={}&model-version-id={}&depth=0",
            encode(model_invariant_id),
            encode(version)
        ),
        None => format!(
            "/network/generic-vnfs/?model-invariant-id={}&depth=0",
            encode(model_invariant_id)
        ),
    }
}

pub fn generic_vnfs_by_role(equipment_role: &str) -> String {
    format!(
        "/network/generic-vnfs/?equipment-role={}&depth=0",
        encode(equipment_role)
    )
}

pub fn generic_vnfs_by_name(vnf_name: &str) -> String {
    format!(
        "/network/generic-vnfs/?vnf-name={}&depth=0",
        encode(vnf_name)
    )
}

pub fn generic_vnf_detail(vnf_id: &str) -> String {
    format!("/network/generic-vnfs/generic-vnf/{}?depth=1", encode(vnf_id))
}

pub fn service_instances(
    customer_id: &str,
    subscription: &str,
    service_type: &str,
    service_role: &str,
) -> String {
    format!(
        "/business/customers/customer/{}/service-subscriptions/service-subscription/{}/service-instances?service-type={}&service-role={}",
        encode(customer_id),
        encode(subscription),
        encode(service_type),
        encode(service_role)
    )
}

pub fn complex_by_clli(clli: &str) -> String {
    format!("/cloud-infrastructure/complexes/complex/{}", encode(clli))
}

pub fn l3_networks_by_role(network_role: &str) -> String {
    format!("/network/l3-networks?network-role={}", encode(network_role))
}

pub fn instance_groups_by_description(description: &str) -> String {
    format!(
        "/network/instance-groups/?description={}&depth=0",
        encode(description)
    )
}

pub fn named_query() -> String {
    "/query?format=id".to_string()
}
