//! Demand and requirement types.
//!
//! A demand names a placement request; each of its requirements asks for
//! one kind of inventory resource and says how to filter it. These types
//! are immutable inputs to a resolution run.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Demand name → ordered requirements.
pub type Demands = BTreeMap<String, Vec<Requirement>>;

/// Attribute keys consumed upstream to select workloads; never matched
/// against candidate attributes.
pub const RESERVED_ATTRIBUTE_KEYS: [&str; 4] = [
    "service-type",
    "equipment-role",
    "model-invariant-id",
    "model-version-id",
];

/// Which resolution pipeline a requirement goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryType {
    Cloud,
    Service,
    VfModule,
    Transport,
}

impl InventoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryType::Cloud => "cloud",
            InventoryType::Service => "service",
            InventoryType::VfModule => "vfmodule",
            InventoryType::Transport => "transport",
        }
    }
}

impl fmt::Display for InventoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InventoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cloud" => Ok(InventoryType::Cloud),
            "service" => Ok(InventoryType::Service),
            "vfmodule" => Ok(InventoryType::VfModule),
            "transport" => Ok(InventoryType::Transport),
            other => Err(format!("unknown inventory type: {other}")),
        }
    }
}

impl<'de> Deserialize<'de> for InventoryType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One typed constraint set within a demand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Requirement {
    pub inventory_type: InventoryType,
    /// Attribute constraints plus selection keys (customer, service type, model ids).
    #[serde(default)]
    pub attributes: Option<Map<String, Value>>,
    /// Restrict candidates to this cloud region.
    #[serde(default)]
    pub region: Option<String>,
    /// Restrict candidates to this complex (physical location id).
    #[serde(default)]
    pub complex: Option<String>,
    #[serde(default)]
    pub required_candidates: Option<Vec<CandidateRef>>,
    #[serde(default)]
    pub excluded_candidates: Option<Vec<CandidateRef>>,
    #[serde(default)]
    pub existing_placement: Option<ExistingPlacement>,
    #[serde(default)]
    pub conflict_identifier: Option<Vec<ConflictToken>>,
    /// Legacy selectors used when `attributes` is absent.
    #[serde(default)]
    pub service_type: Option<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub service_subscription: Option<String>,
    #[serde(default)]
    pub service_resource_id: Option<String>,
    #[serde(default)]
    pub vlan_key: Option<String>,
    #[serde(default)]
    pub port_key: Option<String>,
    #[serde(default = "default_unique", deserialize_with = "deserialize_flag")]
    pub unique: bool,
}

fn default_unique() -> bool {
    true
}

/// Accepts `true`/`false` as JSON booleans or strings.
fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(true),
            "false" | "no" | "0" => Ok(false),
            other => Err(serde::de::Error::custom(format!("invalid flag: {other}"))),
        },
        Value::Null => Ok(true),
        other => Err(serde::de::Error::custom(format!("invalid flag: {other}"))),
    }
}

impl Requirement {
    /// A bare requirement of the given type with every option unset.
    pub fn new(inventory_type: InventoryType) -> Self {
        Self {
            inventory_type,
            attributes: None,
            region: None,
            complex: None,
            required_candidates: None,
            excluded_candidates: None,
            existing_placement: None,
            conflict_identifier: None,
            service_type: None,
            customer_id: None,
            service_subscription: None,
            service_resource_id: None,
            vlan_key: None,
            port_key: None,
            unique: true,
        }
    }

    fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes
            .as_ref()
            .and_then(|attrs| attrs.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Equipment role (or service type) used to select workloads.
    ///
    /// `equipment-role` wins over `service-type`; without attributes the
    /// legacy top-level `service_type` is used.
    pub fn service_type(&self) -> Option<&str> {
        if self.attributes.is_some() {
            self.attribute_str("equipment-role")
                .or_else(|| self.attribute_str("service-type"))
        } else {
            self.service_type.as_deref().filter(|s| !s.is_empty())
        }
    }

    /// Requested customer; `global-customer-id` wins over `customer-id`.
    pub fn customer_id(&self) -> Option<&str> {
        if self.attributes.is_some() {
            self.attribute_str("global-customer-id")
                .or_else(|| self.attribute_str("customer-id"))
        } else {
            self.customer_id.as_deref().filter(|s| !s.is_empty())
        }
    }

    pub fn model_invariant_id(&self) -> Option<&str> {
        self.attribute_str("model-invariant-id")
    }

    pub fn model_version_id(&self) -> Option<&str> {
        self.attribute_str("model-version-id")
    }

    pub fn service_role(&self) -> Option<&str> {
        self.attribute_str("service-role")
    }

    pub fn service_subscription(&self) -> Option<&str> {
        self.service_subscription.as_deref().filter(|s| !s.is_empty())
    }

    /// Attribute constraints to match against candidates, reserved keys excluded.
    pub fn attribute_constraints(&self) -> Vec<(String, AttributeConstraint)> {
        let Some(attrs) = &self.attributes else {
            return Vec::new();
        };
        attrs
            .iter()
            .filter(|(key, _)| !RESERVED_ATTRIBUTE_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), AttributeConstraint::from_value(value)))
            .collect()
    }
}

/// How a single attribute must relate to the candidate's value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeConstraint {
    /// Attribute must be present and, if the list is non-empty, a member.
    Any(Vec<Value>),
    /// Attribute, when present and non-empty, must not be a member.
    Not(Vec<Value>),
}

impl AttributeConstraint {
    /// Interpret a raw constraint value.
    ///
    /// Plain lists and `{"any": [...]}` select membership, `{"not": [...]}`
    /// selects exclusion. A scalar is treated as a one-element list and an
    /// unrecognised object as an empty list (presence only).
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Array(items) => AttributeConstraint::Any(items.clone()),
            Value::Object(obj) => {
                if let Some(any) = obj.get("any") {
                    AttributeConstraint::Any(as_list(any))
                } else if let Some(not) = obj.get("not") {
                    AttributeConstraint::Not(as_list(not))
                } else {
                    AttributeConstraint::Any(Vec::new())
                }
            }
            Value::Null => AttributeConstraint::Any(Vec::new()),
            scalar => AttributeConstraint::Any(vec![scalar.clone()]),
        }
    }
}

fn as_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        scalar => vec![scalar.clone()],
    }
}

/// An `(inventory_type, candidate_id)` pair in a required/excluded list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateRef {
    pub inventory_type: InventoryType,
    pub candidate_id: String,
}

/// Describes where the demand is currently placed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExistingPlacement {
    pub candidate_id: String,
}

/// One element of a conflict-identifier template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ConflictToken {
    Attribute { get_candidate_attribute: String },
    Literal(String),
}

/// Identifies one resolution run in diagnostics.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunContext {
    pub plan_id: String,
    pub plan_name: String,
}
