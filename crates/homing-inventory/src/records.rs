//! Typed views over inventory records.
//!
//! Inventory payloads are loosely typed: any field may be missing. Every
//! field here is optional and callers decide what is required. Records
//! that feed attribute matching keep their raw field map alongside the
//! typed view in [`Attributed`].

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Field holding the relationship groups on every record.
pub const RELATIONSHIP_LIST: &str = "relationship-list";

/// One keyed side-data entry on a relationship.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct RelationshipDatum {
    #[serde(default)]
    pub relationship_key: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub relationship_value: Option<String>,
}

/// A cross-reference from one record to another.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Relationship {
    #[serde(default)]
    pub related_to: Option<String>,
    #[serde(default)]
    pub related_link: Option<String>,
    #[serde(default)]
    pub relationship_data: Vec<RelationshipDatum>,
}

/// Group name (normally `relationship`) → relationships.
pub type RelationshipGroups = BTreeMap<String, Vec<Relationship>>;

/// Records that embed relationship groups.
pub trait HasRelationships {
    fn relationship_groups(&self) -> Option<&RelationshipGroups>;
}

macro_rules! has_relationships {
    ($($ty:ty),* $(,)?) => {
        $(
            impl HasRelationships for $ty {
                fn relationship_groups(&self) -> Option<&RelationshipGroups> {
                    self.relationship_list.as_ref()
                }
            }
        )*
    };
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct CloudRegion {
    #[serde(default)]
    pub cloud_owner: Option<String>,
    #[serde(default)]
    pub cloud_region_id: Option<String>,
    #[serde(default)]
    pub cloud_type: Option<String>,
    #[serde(default)]
    pub cloud_zone: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub cloud_region_version: Option<String>,
    #[serde(default)]
    pub relationship_list: Option<RelationshipGroups>,
}

/// A physical site record.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ComplexRecord {
    #[serde(default)]
    pub physical_location_id: Option<String>,
    #[serde(default)]
    pub complex_name: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub latitude: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub longitude: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct GenericVnf {
    #[serde(default)]
    pub vnf_id: Option<String>,
    #[serde(default)]
    pub vnf_name: Option<String>,
    #[serde(default)]
    pub vnf_type: Option<String>,
    #[serde(default)]
    pub ipv4_oam_address: Option<String>,
    #[serde(default)]
    pub ipv6_oam_address: Option<String>,
    #[serde(default)]
    pub relationship_list: Option<RelationshipGroups>,
    #[serde(default)]
    pub vf_modules: Option<VfModuleList>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct VfModuleList {
    #[serde(default)]
    pub vf_module: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct VfModule {
    #[serde(default)]
    pub vf_module_id: Option<String>,
    #[serde(default)]
    pub vf_module_name: Option<String>,
    #[serde(default)]
    pub relationship_list: Option<RelationshipGroups>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Vserver {
    #[serde(default)]
    pub vserver_id: Option<String>,
    #[serde(default)]
    pub vserver_name: Option<String>,
    #[serde(default)]
    pub relationship_list: Option<RelationshipGroups>,
    #[serde(default)]
    pub l_interfaces: Option<LInterfaceList>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct LInterfaceList {
    #[serde(default)]
    pub l_interface: Vec<LInterface>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct LInterface {
    #[serde(default)]
    pub interface_id: Option<String>,
    #[serde(default)]
    pub interface_name: Option<String>,
    #[serde(default)]
    pub macaddr: Option<String>,
    #[serde(default)]
    pub network_name: Option<String>,
    #[serde(default)]
    pub l3_interface_ipv4_address_list: Vec<Ipv4Address>,
    #[serde(default)]
    pub l3_interface_ipv6_address_list: Vec<Ipv6Address>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Ipv4Address {
    #[serde(default)]
    pub l3_interface_ipv4_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Ipv6Address {
    #[serde(default)]
    pub l3_interface_ipv6_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Pserver {
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub relationship_list: Option<RelationshipGroups>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ServiceInstance {
    #[serde(default)]
    pub service_instance_id: Option<String>,
    #[serde(default)]
    pub relationship_list: Option<RelationshipGroups>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Zone {
    #[serde(default)]
    pub zone_id: Option<String>,
    #[serde(default)]
    pub zone_name: Option<String>,
    #[serde(default)]
    pub relationship_list: Option<RelationshipGroups>,
}

/// An l3-network, used only for its cloud-region relationships.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct L3Network {
    #[serde(default)]
    pub relationship_list: Option<RelationshipGroups>,
}

/// An instance-group, used only for its service-instance relationships.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct InstanceGroup {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub relationship_list: Option<RelationshipGroups>,
}

has_relationships!(
    CloudRegion,
    GenericVnf,
    VfModule,
    Vserver,
    Pserver,
    ServiceInstance,
    Zone,
    L3Network,
    InstanceGroup,
);

/// A typed record plus its raw scalar fields, for attribute matching.
#[derive(Debug, Clone, PartialEq)]
pub struct Attributed<T> {
    pub record: T,
    pub attributes: Map<String, Value>,
}

impl<T: DeserializeOwned> Attributed<T> {
    /// Parse a raw record. Fails only if `value` is not an object or a
    /// present field has the wrong shape.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let record: T = serde_json::from_value(value.clone())?;
        let attributes = match value {
            Value::Object(mut map) => {
                map.remove(RELATIONSHIP_LIST);
                map
            }
            _ => Map::new(),
        };
        Ok(Self { record, attributes })
    }
}

impl<T: HasRelationships> HasRelationships for Attributed<T> {
    fn relationship_groups(&self) -> Option<&RelationshipGroups> {
        self.record.relationship_groups()
    }
}

/// Parse a single record from a response body.
pub fn parse<T: DeserializeOwned>(body: &Value) -> Result<T, serde_json::Error> {
    T::deserialize(body)
}

/// The array under `field`, or empty when absent or not an array.
pub fn list_field<'a>(body: &'a Value, field: &str) -> &'a [Value] {
    body.get(field)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// An identifier or text field, treating an empty string as absent.
pub fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.is_empty())
}

/// Accept strings and numbers, keep the text form.
fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cloud_region_parses_with_missing_fields() {
        let region: CloudRegion = parse(&json!({
            "cloud-region-id": "mtn6",
            "cloud-owner": "att-aic"
        }))
        .unwrap();
        assert_eq!(region.cloud_region_id.as_deref(), Some("mtn6"));
        assert_eq!(region.cloud_region_version, None);
        assert!(region.relationship_groups().is_none());
    }

    #[test]
    fn numeric_coordinates_become_strings() {
        let complex: ComplexRecord = parse(&json!({
            "latitude": 32.89948,
            "longitude": "-97.0",
        }))
        .unwrap();
        assert_eq!(complex.latitude.as_deref(), Some("32.89948"));
        assert_eq!(complex.longitude.as_deref(), Some("-97.0"));
    }

    #[test]
    fn attributed_keeps_raw_fields_without_relationships() {
        let vnf = Attributed::<GenericVnf>::from_value(json!({
            "vnf-id": "vnf-1",
            "prov-status": "ACTIVE",
            "relationship-list": {"relationship": []}
        }))
        .unwrap();
        assert_eq!(vnf.record.vnf_id.as_deref(), Some("vnf-1"));
        assert_eq!(vnf.attributes["prov-status"], "ACTIVE");
        assert!(!vnf.attributes.contains_key(RELATIONSHIP_LIST));
        assert!(vnf.relationship_groups().is_some());
    }

    #[test]
    fn vserver_interfaces_parse() {
        let vserver: Vserver = parse(&json!({
            "vserver-id": "vs-1",
            "l-interfaces": {"l-interface": [{
                "interface-id": "if-1",
                "macaddr": "aa:bb",
                "l3-interface-ipv4-address-list": [{"l3-interface-ipv4-address": "10.0.0.1"}]
            }]}
        }))
        .unwrap();
        let ifaces = vserver.l_interfaces.unwrap().l_interface;
        assert_eq!(ifaces.len(), 1);
        assert_eq!(
            ifaces[0].l3_interface_ipv4_address_list[0]
                .l3_interface_ipv4_address
                .as_deref(),
            Some("10.0.0.1")
        );
        assert!(ifaces[0].l3_interface_ipv6_address_list.is_empty());
    }

    #[test]
    fn list_field_tolerates_absence() {
        let body = json!({"cloud-region": [{"cloud-region-id": "a"}]});
        assert_eq!(list_field(&body, "cloud-region").len(), 1);
        assert!(list_field(&body, "generic-vnf").is_empty());
        assert!(list_field(&json!(null), "generic-vnf").is_empty());
    }
}
