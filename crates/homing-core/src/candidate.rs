//! Candidate records produced by resolution.
//!
//! Field names serialize the way the placement optimizer expects them,
//! so a candidate can be handed downstream as plain JSON. Type-specific
//! fields are optional and omitted when unset.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::demand::InventoryType;

/// Provider tag stamped on every candidate.
pub const INVENTORY_PROVIDER: &str = "aai";

/// Location type stamped on every candidate.
pub const LOCATION_TYPE: &str = "att_aic";

/// Physical site fields copied from a resolved complex.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SiteFields {
    pub physical_location_id: String,
    pub complex_name: Option<String>,
    pub latitude: String,
    pub longitude: String,
    pub city: String,
    pub state: Option<String>,
    pub region: Option<String>,
    pub country: String,
}

/// One network interface observed on a virtual server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InterfaceDetail {
    #[serde(rename = "interface-id")]
    pub interface_id: Option<String>,
    #[serde(rename = "interface-name")]
    pub interface_name: Option<String>,
    pub macaddr: Option<String>,
    #[serde(rename = "network-id")]
    pub network_id: Option<String>,
    #[serde(rename = "ipv4-addresses")]
    pub ipv4_addresses: Vec<String>,
    #[serde(rename = "ipv6-addresses")]
    pub ipv6_addresses: Vec<String>,
}

/// A virtual server backing a vf-module candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VserverDetail {
    #[serde(rename = "vserver-id")]
    pub vserver_id: Option<String>,
    #[serde(rename = "vserver-name")]
    pub vserver_name: Option<String>,
    #[serde(rename = "l-interfaces")]
    pub interfaces: Vec<InterfaceDetail>,
}

/// One concrete, filterable resource option for a requirement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub inventory_provider: String,
    pub inventory_type: InventoryType,
    pub candidate_id: String,
    pub location_id: String,
    pub location_type: String,
    pub cost: f64,
    pub uniqueness: bool,
    pub existing_placement: bool,
    pub service_resource_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sriov_automation: Option<bool>,

    // cloud / service / vfmodule
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_region_version: Option<String>,
    #[serde(rename = "vim-id", skip_serializing_if = "Option::is_none")]
    pub vim_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flavors: Option<Value>,

    // service / vfmodule
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_instance_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_key: Option<String>,

    // vfmodule
    #[serde(rename = "nf-name", skip_serializing_if = "Option::is_none")]
    pub nf_name: Option<String>,
    #[serde(rename = "nf-id", skip_serializing_if = "Option::is_none")]
    pub nf_id: Option<String>,
    #[serde(rename = "nf-type", skip_serializing_if = "Option::is_none")]
    pub nf_type: Option<String>,
    #[serde(rename = "vnf-type", skip_serializing_if = "Option::is_none")]
    pub vnf_type: Option<String>,
    #[serde(rename = "ipv4-oam-address", skip_serializing_if = "Option::is_none")]
    pub ipv4_oam_address: Option<String>,
    #[serde(rename = "ipv6-oam-address", skip_serializing_if = "Option::is_none")]
    pub ipv6_oam_address: Option<String>,
    #[serde(rename = "vf-module-name", skip_serializing_if = "Option::is_none")]
    pub vf_module_name: Option<String>,
    #[serde(rename = "vf-module-id", skip_serializing_if = "Option::is_none")]
    pub vf_module_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub vservers: Vec<VserverDetail>,

    // transport
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,

    #[serde(flatten)]
    pub site: Option<SiteFields>,
}

impl Candidate {
    /// A candidate with identity and cost set and every optional field empty.
    pub fn new(inventory_type: InventoryType, cost: f64) -> Self {
        Self {
            inventory_provider: INVENTORY_PROVIDER.to_string(),
            inventory_type,
            candidate_id: String::new(),
            location_id: String::new(),
            location_type: LOCATION_TYPE.to_string(),
            cost,
            uniqueness: true,
            existing_placement: false,
            service_resource_id: String::new(),
            conflict_id: None,
            sriov_automation: None,
            cloud_owner: None,
            cloud_region_version: None,
            vim_id: None,
            flavors: None,
            host_id: None,
            service_instance_id: None,
            vlan_key: None,
            port_key: None,
            nf_name: None,
            nf_id: None,
            nf_type: None,
            vnf_type: None,
            ipv4_oam_address: None,
            ipv6_oam_address: None,
            vf_module_name: None,
            vf_module_id: None,
            vservers: Vec::new(),
            zone_id: None,
            zone_name: None,
            site: None,
        }
    }

    /// Physical location id, once the site is resolved.
    pub fn physical_location_id(&self) -> Option<&str> {
        self.site.as_ref().map(|s| s.physical_location_id.as_str())
    }

    /// Look up a candidate attribute by its serialized name, as a string.
    ///
    /// Returns `None` for absent attributes and for non-scalar values.
    pub fn attribute(&self, name: &str) -> Option<String> {
        let value = serde_json::to_value(self).ok()?;
        match value.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_candidate_has_provider_and_location_type() {
        let c = Candidate::new(InventoryType::Cloud, 2.0);
        assert_eq!(c.inventory_provider, "aai");
        assert_eq!(c.location_type, "att_aic");
        assert!(c.uniqueness);
        assert!(!c.existing_placement);
    }

    #[test]
    fn site_fields_flatten_into_candidate() {
        let mut c = Candidate::new(InventoryType::Cloud, 2.0);
        c.candidate_id = "region-1".to_string();
        c.site = Some(SiteFields {
            physical_location_id: "DLLSTX55".to_string(),
            complex_name: Some("dalls_one".to_string()),
            latitude: "32.78".to_string(),
            longitude: "-96.80".to_string(),
            city: "Dallas".to_string(),
            state: Some("TX".to_string()),
            region: Some("USA".to_string()),
            country: "USA".to_string(),
        });

        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["physical_location_id"], "DLLSTX55");
        assert_eq!(json["city"], "Dallas");
        assert_eq!(json["inventory_type"], "cloud");
        assert!(json.get("zone_id").is_none());
        assert_eq!(c.physical_location_id(), Some("DLLSTX55"));
    }

    #[test]
    fn attribute_lookup_by_serialized_name() {
        let mut c = Candidate::new(InventoryType::VfModule, 1.0);
        c.candidate_id = "vfm-1".to_string();
        c.vf_module_name = Some("module-a".to_string());

        assert_eq!(c.attribute("candidate_id").as_deref(), Some("vfm-1"));
        assert_eq!(c.attribute("vf-module-name").as_deref(), Some("module-a"));
        assert_eq!(c.attribute("uniqueness").as_deref(), Some("true"));
        assert_eq!(c.attribute("zone_id"), None);
    }
}
