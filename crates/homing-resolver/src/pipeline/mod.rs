//! Candidate resolution pipelines, one per inventory type.
//!
//! A pipeline turns one requirement into discovered candidates, each
//! paired with the inventory fields the attribute filter matches against.
//! Items that cannot be built are returned as [`Dropped`] with a reason;
//! a failure never aborts sibling items.

mod cloud;
mod service;
mod transport;
mod vfmodule;
mod workload;

use std::future::Future;
use std::sync::Arc;

use serde_json::{Map, Value};

use homing_core::{Candidate, CostConfig, DropReason, HomingConfig, Requirement, ResolverConfig};
use homing_inventory::{InventoryCache, InventoryClient};

pub use cloud::CloudResolver;
pub use service::ServiceResolver;
pub use transport::TransportResolver;
pub use vfmodule::VfModuleResolver;

/// A value or the reason the current item was dropped.
pub type Resolved<T> = Result<T, DropReason>;

/// A candidate built by a pipeline, before filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct Discovered {
    pub candidate: Candidate,
    /// Inventory fields visible to attribute constraints.
    pub attributes: Map<String, Value>,
}

/// An item dropped during resolution or filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct Dropped {
    pub candidate_id: String,
    pub location_id: String,
    pub reason: DropReason,
}

impl Dropped {
    /// Drop `candidate` as built so far.
    pub fn from_candidate(candidate: &Candidate, reason: DropReason) -> Self {
        Self {
            candidate_id: candidate.candidate_id.clone(),
            location_id: candidate.location_id.clone(),
            reason,
        }
    }
}

pub type Discovery = Result<Discovered, Dropped>;

/// Everything a pipeline needs besides the requirement.
pub struct ResolveContext<C> {
    pub cache: Arc<InventoryCache<C>>,
    pub costs: CostConfig,
    pub settings: ResolverConfig,
}

impl<C: InventoryClient> ResolveContext<C> {
    pub fn new(cache: Arc<InventoryCache<C>>, config: &HomingConfig) -> Self {
        Self {
            cache,
            costs: config.costs.clone(),
            settings: config.resolver.clone(),
        }
    }

    pub(crate) fn capability_aware(&self) -> bool {
        self.settings.capability_aware
    }

    /// SR-IOV automation is available on regions at the configured version.
    pub(crate) fn sriov_automation(&self, version: &str) -> bool {
        !version.is_empty() && version == self.settings.sriov_automation_version
    }
}

/// Shared capability of the per-type pipelines.
pub trait Resolver<C: InventoryClient> {
    fn resolve(
        &self,
        ctx: &ResolveContext<C>,
        demand: &str,
        requirement: &Requirement,
    ) -> impl Future<Output = Vec<Discovery>> + Send;
}

/// A candidate with the fields every pipeline sets up front.
pub(crate) fn base_candidate(requirement: &Requirement, cost: f64) -> Candidate {
    let mut candidate = Candidate::new(requirement.inventory_type, cost);
    candidate.uniqueness = requirement.unique;
    candidate.service_resource_id = requirement.service_resource_id.clone().unwrap_or_default();
    candidate
}

/// `{owner}_{region}`, the identifier a VIM knows a region by.
pub(crate) fn vim_id(cloud_owner: &str, region_id: &str) -> String {
    format!("{cloud_owner}_{region_id}")
}
