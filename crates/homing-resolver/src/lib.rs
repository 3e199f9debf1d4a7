//! Homing candidate resolution.
//!
//! Turns demands into candidate lists by querying the inventory through
//! [`homing_inventory::InventoryCache`], one pipeline per inventory type,
//! then filtering each candidate against its requirement. Every dropped
//! candidate is recorded with a reason.
//!
//! # Components
//!
//! - **`pipeline`**: Cloud, service, vf-module and transport resolvers
//! - **`filter`**: Attribute, region, list and conflict-id stages
//! - **`triage`**: Drop records per run
//! - **`engine`**: Concurrent per-demand orchestration

pub mod engine;
pub mod filter;
pub mod pipeline;
pub mod triage;

pub use engine::{Resolution, ResolutionEngine, resolve_demand, resolve_requirement};
pub use filter::{CONFLICT_SEPARATOR, FilterChain, conflict_id};
pub use pipeline::{
    CloudResolver, Discovered, Discovery, Dropped, ResolveContext, Resolved, Resolver,
    ServiceResolver, TransportResolver, VfModuleResolver,
};
pub use triage::TriageCollector;
