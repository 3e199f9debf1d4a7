//! homing-core: shared types for candidate resolution.
//!
//! Demands and requirements come in, candidates and triage records go
//! out. Configuration for every other crate is parsed here too.

pub mod candidate;
pub mod config;
pub mod demand;
pub mod triage;

pub use candidate::{Candidate, InterfaceDetail, SiteFields, VserverDetail};
pub use config::{CacheConfig, ConfigError, CostConfig, HomingConfig, InventoryConfig, ResolverConfig};
pub use demand::{
    AttributeConstraint, CandidateRef, ConflictToken, Demands, ExistingPlacement, InventoryType,
    Requirement, RunContext,
};
pub use triage::{DropReason, TriageRecord, TriageReport};
