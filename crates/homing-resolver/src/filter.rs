//! Per-candidate filtering and annotation.
//!
//! Checks run in a fixed order and the first failure drops the candidate:
//! attributes, region/complex restriction, excluded list, required list.
//! The existing-placement annotation runs before the list checks so a
//! required current placement still carries its cost override.

use serde_json::{Map, Value};

use homing_core::{AttributeConstraint, Candidate, CandidateRef, ConflictToken, DropReason, Requirement};

/// Appended after every conflict-identifier token.
pub const CONFLICT_SEPARATOR: char = '|';

/// Filter stage for one requirement.
pub struct FilterChain<'a> {
    requirement: &'a Requirement,
    constraints: Vec<(String, AttributeConstraint)>,
    existing_placement_cost: f64,
}

impl<'a> FilterChain<'a> {
    pub fn new(requirement: &'a Requirement, existing_placement_cost: f64) -> Self {
        Self {
            requirement,
            constraints: requirement.attribute_constraints(),
            existing_placement_cost,
        }
    }

    /// Run every stage; returns the candidate ready to emit.
    pub fn apply(
        &self,
        mut candidate: Candidate,
        attributes: &Map<String, Value>,
    ) -> Result<Candidate, DropReason> {
        self.match_attributes(attributes)?;
        self.match_region(&candidate)?;
        self.mark_existing_placement(&mut candidate);

        if let Some(excluded) = non_empty(&self.requirement.excluded_candidates) {
            if listed(&candidate, excluded) {
                return Err(DropReason::Excluded);
            }
        }
        if let Some(required) = non_empty(&self.requirement.required_candidates) {
            if !listed(&candidate, required) {
                return Err(DropReason::NotRequired);
            }
        }

        if let Some(template) = &self.requirement.conflict_identifier {
            candidate.conflict_id = Some(conflict_id(template, &candidate)?);
        }
        Ok(candidate)
    }

    pub fn match_attributes(&self, attributes: &Map<String, Value>) -> Result<(), DropReason> {
        for (key, constraint) in &self.constraints {
            if !constraint_holds(constraint, attributes.get(key)) {
                return Err(DropReason::AttributeMismatch {
                    attribute: key.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn match_region(&self, candidate: &Candidate) -> Result<(), DropReason> {
        if let Some(region) = restriction(&self.requirement.region) {
            if candidate.location_id != region {
                return Err(DropReason::RegionMismatch {
                    attribute: "location_id".to_string(),
                    expected: region.to_string(),
                });
            }
        }
        if let Some(complex) = restriction(&self.requirement.complex) {
            if candidate.physical_location_id() != Some(complex) {
                return Err(DropReason::RegionMismatch {
                    attribute: "physical_location_id".to_string(),
                    expected: complex.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn mark_existing_placement(&self, candidate: &mut Candidate) {
        candidate.existing_placement = false;
        if let Some(existing) = &self.requirement.existing_placement {
            if existing.candidate_id == candidate.candidate_id {
                candidate.existing_placement = true;
                candidate.cost = self.existing_placement_cost;
            }
        }
    }
}

fn constraint_holds(constraint: &AttributeConstraint, value: Option<&Value>) -> bool {
    match constraint {
        AttributeConstraint::Any(allowed) => match value {
            None => false,
            Some(value) => allowed.is_empty() || allowed.contains(value),
        },
        AttributeConstraint::Not(denied) => match value {
            Some(value) if truthy(value) => !denied.contains(value),
            _ => true,
        },
    }
}

/// Null, false, zero and empty values do not count as set.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn restriction(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn non_empty(list: &Option<Vec<CandidateRef>>) -> Option<&[CandidateRef]> {
    list.as_deref().filter(|l| !l.is_empty())
}

fn listed(candidate: &Candidate, list: &[CandidateRef]) -> bool {
    list.iter().any(|entry| {
        entry.inventory_type == candidate.inventory_type
            && entry.candidate_id == candidate.candidate_id
    })
}

/// Join literal tokens and candidate attribute values, each followed by
/// the separator.
pub fn conflict_id(template: &[ConflictToken], candidate: &Candidate) -> Result<String, DropReason> {
    let mut id = String::new();
    for token in template {
        match token {
            ConflictToken::Literal(text) => id.push_str(text),
            ConflictToken::Attribute {
                get_candidate_attribute,
            } => {
                let value = candidate.attribute(get_candidate_attribute).ok_or_else(|| {
                    DropReason::ConflictAttributeMissing {
                        attribute: get_candidate_attribute.clone(),
                    }
                })?;
                id.push_str(&value);
            }
        }
        id.push(CONFLICT_SEPARATOR);
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use homing_core::{ExistingPlacement, InventoryType, SiteFields};
    use serde_json::json;

    fn requirement(value: Value) -> Requirement {
        let mut base = json!({"inventory_type": "cloud"});
        if let (Some(base), Some(extra)) = (base.as_object_mut(), value.as_object()) {
            base.extend(extra.clone());
        }
        serde_json::from_value(base).unwrap()
    }

    fn candidate(id: &str) -> Candidate {
        let mut c = Candidate::new(InventoryType::Cloud, 1.0);
        c.candidate_id = id.to_string();
        c.location_id = id.to_string();
        c.site = Some(SiteFields {
            physical_location_id: "DLLSTX55".to_string(),
            ..SiteFields::default()
        });
        c
    }

    fn attrs(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn plain_list_requires_membership() {
        let req = requirement(json!({"attributes": {"cloud-type": ["openstack"]}}));
        let chain = FilterChain::new(&req, -8000.0);

        assert!(chain.match_attributes(&attrs(json!({"cloud-type": "openstack"}))).is_ok());
        assert_eq!(
            chain.match_attributes(&attrs(json!({"cloud-type": "vmware"}))),
            Err(DropReason::AttributeMismatch {
                attribute: "cloud-type".to_string()
            })
        );
        assert!(chain.match_attributes(&attrs(json!({}))).is_err());
    }

    #[test]
    fn empty_list_means_presence() {
        let req = requirement(json!({"attributes": {"cloud-zone": []}}));
        let chain = FilterChain::new(&req, -8000.0);
        assert!(chain.match_attributes(&attrs(json!({"cloud-zone": null}))).is_ok());
        assert!(chain.match_attributes(&attrs(json!({}))).is_err());
    }

    #[test]
    fn not_drops_only_present_listed_values() {
        let req = requirement(json!({"attributes": {"prov-status": {"not": ["PROV", ""]}}}));
        let chain = FilterChain::new(&req, -8000.0);

        assert!(chain.match_attributes(&attrs(json!({}))).is_ok());
        assert!(chain.match_attributes(&attrs(json!({"prov-status": ""}))).is_ok());
        assert!(chain.match_attributes(&attrs(json!({"prov-status": null}))).is_ok());
        assert!(chain.match_attributes(&attrs(json!({"prov-status": "ACTIVE"}))).is_ok());
        assert!(chain.match_attributes(&attrs(json!({"prov-status": "PROV"}))).is_err());
    }

    #[test]
    fn reserved_keys_are_not_matched() {
        let req = requirement(json!({"attributes": {"equipment-role": "vG", "model-invariant-id": "m1"}}));
        let chain = FilterChain::new(&req, -8000.0);
        assert!(chain.match_attributes(&attrs(json!({}))).is_ok());
    }

    #[test]
    fn region_and_complex_restrictions() {
        let req = requirement(json!({"region": "mtn6"}));
        let chain = FilterChain::new(&req, -8000.0);
        assert!(chain.match_region(&candidate("mtn6")).is_ok());
        assert!(matches!(
            chain.match_region(&candidate("mtn7")),
            Err(DropReason::RegionMismatch { .. })
        ));

        let req = requirement(json!({"complex": "OTHER"}));
        let chain = FilterChain::new(&req, -8000.0);
        assert!(chain.match_region(&candidate("mtn6")).is_err());

        let req = requirement(json!({"region": ""}));
        let chain = FilterChain::new(&req, -8000.0);
        assert!(chain.match_region(&candidate("anything")).is_ok());
    }

    #[test]
    fn existing_placement_overrides_cost() {
        let mut req = requirement(json!({}));
        req.existing_placement = Some(ExistingPlacement {
            candidate_id: "mtn6".to_string(),
        });
        let chain = FilterChain::new(&req, -8000.0);

        let kept = chain.apply(candidate("mtn6"), &Map::new()).unwrap();
        assert!(kept.existing_placement);
        assert_eq!(kept.cost, -8000.0);

        let other = chain.apply(candidate("mtn7"), &Map::new()).unwrap();
        assert!(!other.existing_placement);
        assert_eq!(other.cost, 1.0);
    }

    #[test]
    fn excluded_and_required_lists_match_type_and_id() {
        let req = requirement(json!({
            "excluded_candidates": [{"inventory_type": "cloud", "candidate_id": "mtn6"}]
        }));
        let chain = FilterChain::new(&req, -8000.0);
        assert_eq!(chain.apply(candidate("mtn6"), &Map::new()), Err(DropReason::Excluded));
        assert!(chain.apply(candidate("mtn7"), &Map::new()).is_ok());

        let req = requirement(json!({
            "required_candidates": [{"inventory_type": "service", "candidate_id": "mtn6"}]
        }));
        let chain = FilterChain::new(&req, -8000.0);
        assert_eq!(chain.apply(candidate("mtn6"), &Map::new()), Err(DropReason::NotRequired));
    }

    #[test]
    fn conflict_id_joins_tokens() {
        let req = requirement(json!({
            "conflict_identifier": [{"get_candidate_attribute": "candidate_id"}, "vG"]
        }));
        let chain = FilterChain::new(&req, -8000.0);
        let kept = chain.apply(candidate("mtn6"), &Map::new()).unwrap();
        assert_eq!(kept.conflict_id.as_deref(), Some("mtn6|vG|"));

        let template = vec![ConflictToken::Attribute {
            get_candidate_attribute: "zone_id".to_string(),
        }];
        assert_eq!(
            conflict_id(&template, &candidate("mtn6")),
            Err(DropReason::ConflictAttributeMissing {
                attribute: "zone_id".to_string()
            })
        );
    }
}
