//! homing-inventory: access to the remote inventory graph.
//!
//! Provides versioned request paths, typed inventory records, relationship
//! traversal, the region/complex cache, and the HTTP client used to reach
//! the inventory system.
//!
//! # Architecture
//!
//! ```text
//! InventoryCache
//!   ├── RegionSnapshot (Arc, swapped whole on refresh)
//!   ├── complex sub-cache (own TTL, lazily filled)
//!   └── InventoryGateway
//!         ├── VersionedPaths
//!         └── InventoryClient (HttpInventoryClient | FakeInventoryClient)
//! ```
//!
//! Relationship traversal ([`related_links`]) is pure and works on any
//! record implementing [`HasRelationships`].

pub mod cache;
pub mod client;
pub mod clock;
pub mod error;
pub mod fake;
pub mod http;
pub mod lookups;
pub mod paths;
pub mod records;
pub mod relationships;

pub use cache::{CloudRegionSnapshot, ComplexLocation, InventoryCache, RefreshOutcome, RegionSnapshot};
pub use client::{InventoryClient, InventoryGateway, InventoryRequest, InventoryResponse, Method};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CacheError, ClientError, FetchError};
pub use fake::FakeInventoryClient;
pub use http::HttpInventoryClient;
pub use lookups::GeoLocation;
pub use paths::VersionedPaths;
pub use records::{Attributed, HasRelationships};
pub use relationships::{first_related_link, group_agree, related_links, LinkQuery, RelationshipLink};
