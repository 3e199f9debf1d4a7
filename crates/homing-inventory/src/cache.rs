//! TTL-gated snapshot of cloud regions and their physical sites.
//!
//! The region map is rebuilt off to the side and swapped in whole, so a
//! reader holds either the old or the new [`RegionSnapshot`] and never a
//! partial one. Refreshes are pulled by callers, not timer driven, and at
//! most one runs at a time. Complex records are cached separately with
//! their own TTL and populated lazily.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::{debug, error, info, warn};

use homing_core::{CacheConfig, DropReason, SiteFields};

use crate::client::{InventoryClient, InventoryGateway};
use crate::clock::{expired, Clock};
use crate::error::CacheError;
use crate::paths::{self, normalize_version};
use crate::records::{list_field, non_empty, parse, CloudRegion, ComplexRecord};
use crate::relationships::{related_links, LinkQuery};

/// A resolved physical site.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexLocation {
    pub complex_id: String,
    pub complex_name: Option<String>,
    pub latitude: String,
    pub longitude: String,
    pub city: String,
    pub state: Option<String>,
    pub region: Option<String>,
    pub country: String,
}

impl ComplexLocation {
    /// Build from a complex record. Latitude, longitude, city and country
    /// are required; any other field may be absent.
    pub fn from_record(record: ComplexRecord, complex_id: Option<&str>) -> Option<Self> {
        let complex_id = complex_id
            .map(str::to_string)
            .or(record.physical_location_id)
            .unwrap_or_default();
        Some(Self {
            complex_id,
            complex_name: record.complex_name,
            latitude: non_empty(record.latitude)?,
            longitude: non_empty(record.longitude)?,
            city: non_empty(record.city)?,
            state: record.state,
            region: record.region,
            country: non_empty(record.country)?,
        })
    }

    /// The site fields copied onto a candidate.
    pub fn site_fields(&self) -> SiteFields {
        SiteFields {
            physical_location_id: self.complex_id.clone(),
            complex_name: self.complex_name.clone(),
            latitude: self.latitude.clone(),
            longitude: self.longitude.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            region: self.region.clone(),
            country: self.country.clone(),
        }
    }
}

/// One cached cloud region.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudRegionSnapshot {
    pub region_id: String,
    pub cloud_owner: Option<String>,
    pub cloud_type: Option<String>,
    pub cloud_zone: Option<String>,
    /// Version as stored in inventory, e.g. `aic3.0`.
    pub version_raw: String,
    /// Digits and dots only, e.g. `3.0`.
    pub version: String,
    pub physical_location_id: String,
    pub complex: ComplexLocation,
    pub flavors: Option<Value>,
}

/// The region map at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionSnapshot {
    pub regions: BTreeMap<String, CloudRegionSnapshot>,
    /// Clock seconds at commit; `None` until the first successful refresh.
    pub refreshed_at: Option<u64>,
}

impl RegionSnapshot {
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn get(&self, region_id: &str) -> Option<&CloudRegionSnapshot> {
        self.regions.get(region_id)
    }
}

/// What a call to [`InventoryCache::refresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The snapshot was still within its TTL; nothing was fetched.
    Fresh,
    /// A new snapshot with this many regions was committed.
    Refreshed { regions: usize },
}

#[derive(Debug, Default)]
struct ComplexEntries {
    entries: HashMap<String, ComplexLocation>,
    /// Clock seconds of the latest insert.
    stored_at: Option<u64>,
}

pub struct InventoryCache<C> {
    gateway: InventoryGateway<C>,
    clock: Arc<dyn Clock>,
    region_ttl: Duration,
    complex_ttl: Duration,
    capability_aware: bool,
    snapshot: RwLock<Arc<RegionSnapshot>>,
    refresh_lock: AsyncMutex<()>,
    complexes: Mutex<ComplexEntries>,
}

impl<C: InventoryClient> InventoryCache<C> {
    pub fn new(
        gateway: InventoryGateway<C>,
        clock: Arc<dyn Clock>,
        config: &CacheConfig,
        capability_aware: bool,
    ) -> Self {
        Self {
            gateway,
            clock,
            region_ttl: config.region_ttl(),
            complex_ttl: config.complex_ttl(),
            capability_aware,
            snapshot: RwLock::new(Arc::new(RegionSnapshot::default())),
            refresh_lock: AsyncMutex::new(()),
            complexes: Mutex::new(ComplexEntries::default()),
        }
    }

    pub fn gateway(&self) -> &InventoryGateway<C> {
        &self.gateway
    }

    pub fn capability_aware(&self) -> bool {
        self.capability_aware
    }

    /// The current snapshot without triggering a refresh.
    pub async fn snapshot(&self) -> Arc<RegionSnapshot> {
        Arc::clone(&*self.snapshot.read().await)
    }

    /// The current region map, refreshed first if it has expired.
    ///
    /// A fresh snapshot is returned without waiting on a running refresh.
    /// A failed refresh is logged and the previous snapshot returned.
    pub async fn get_regions(&self) -> Arc<RegionSnapshot> {
        {
            let current = self.snapshot.read().await;
            if !expired(current.refreshed_at, self.clock.now_secs(), self.region_ttl) {
                return Arc::clone(&*current);
            }
        }
        if let Err(e) = self.refresh().await {
            error!(error = %e, "region cache refresh failed, serving previous snapshot");
        }
        self.snapshot().await
    }

    /// Rebuild the region map if the current one has expired.
    pub async fn refresh(&self) -> Result<RefreshOutcome, CacheError> {
        let _guard = self.refresh_lock.lock().await;

        let refreshed_at = self.snapshot.read().await.refreshed_at;
        if !expired(refreshed_at, self.clock.now_secs(), self.region_ttl) {
            return Ok(RefreshOutcome::Fresh);
        }

        info!("refreshing inventory region cache");
        let body = self
            .gateway
            .get(&paths::cloud_regions_shallow(), "cloud regions")
            .await?;
        let listed = list_field(&body, "cloud-region");
        if listed.is_empty() {
            error!("inventory returned no regions");
            return Err(CacheError::NoRegions);
        }

        let mut regions = BTreeMap::new();
        for raw in listed {
            if let Some(region) = self.build_region(raw).await {
                regions.insert(region.region_id.clone(), region);
            }
        }
        if regions.is_empty() {
            error!(fetched = listed.len(), "no usable regions after refresh");
            return Err(CacheError::NoUsableRegions {
                fetched: listed.len(),
            });
        }

        let count = regions.len();
        let next = RegionSnapshot {
            regions,
            refreshed_at: Some(self.clock.now_secs()),
        };
        *self.snapshot.write().await = Arc::new(next);
        info!(regions = count, fetched = listed.len(), "inventory region cache refresh complete");
        Ok(RefreshOutcome::Refreshed { regions: count })
    }

    async fn build_region(&self, raw: &Value) -> Option<CloudRegionSnapshot> {
        let region: CloudRegion = match parse(raw) {
            Ok(region) => region,
            Err(e) => {
                warn!(error = %e, "skipping malformed cloud region");
                return None;
            }
        };
        let (Some(region_id), Some(version_raw)) = (
            non_empty(region.cloud_region_id.clone()),
            non_empty(region.cloud_region_version.clone()),
        )
        else {
            debug!(region = ?region.cloud_region_id, "skipping region without id or version");
            return None;
        };

        let complexes = related_links(
            &region,
            "complex",
            LinkQuery::SearchKey("complex.physical-location-id"),
        );
        if complexes.len() > 1 {
            error!(region = %region_id, count = complexes.len(), "region has more than one complex");
            return None;
        }
        let (Some(complex_id), Some(complex_link)) = (
            complexes[0].value.as_deref().filter(|v| !v.is_empty()),
            complexes[0].link.as_deref(),
        )
        else {
            error!(region = %region_id, "region does not reference a complex");
            return None;
        };

        let complex = match self.get_complex(complex_link, Some(complex_id)).await {
            Ok(complex) => complex,
            Err(reason) => {
                error!(region = %region_id, complex = %complex_id, %reason, "complex not usable");
                return None;
            }
        };
        if complex.complex_name.as_deref().is_none_or(str::is_empty) {
            error!(region = %region_id, complex = %complex_id, "complex is missing complex-name");
            return None;
        }

        let flavors = if self.capability_aware {
            let Some(owner) = region.cloud_owner.as_deref() else {
                warn!(region = %region_id, "no cloud owner, cannot fetch flavors");
                return None;
            };
            match self.fetch_flavors(owner, &region_id).await {
                Some(flavors) => Some(flavors),
                None => {
                    warn!(region = %region_id, "dropping region without flavors");
                    return None;
                }
            }
        } else {
            None
        };

        debug!(region = %region_id, complex = %complex_id, "region cached");
        Some(CloudRegionSnapshot {
            version: normalize_version(&version_raw),
            version_raw,
            physical_location_id: complex_id.to_string(),
            region_id,
            cloud_owner: region.cloud_owner,
            cloud_type: region.cloud_type,
            cloud_zone: region.cloud_zone,
            complex,
            flavors,
        })
    }

    /// Flavors of one region, or `None` when the fetch fails or the list
    /// is empty.
    pub async fn fetch_flavors(&self, cloud_owner: &str, region_id: &str) -> Option<Value> {
        let body = self
            .gateway
            .get(&paths::flavors(cloud_owner, region_id), "flavors")
            .await
            .ok()?;
        if list_field(&body, "flavor").is_empty() {
            error!(owner = %cloud_owner, region = %region_id, "flavor list missing in cloud region");
            return None;
        }
        Some(body)
    }

    /// Resolve the complex behind `link`, from the complex cache when
    /// `complex_id` is known and cached.
    ///
    /// The whole complex cache is cleared once its TTL has passed since
    /// the latest insert. Only lookups with a known id populate it.
    pub async fn get_complex(
        &self,
        link: &str,
        complex_id: Option<&str>,
    ) -> Result<ComplexLocation, DropReason> {
        if let Some(hit) = complex_id.and_then(|id| self.cached_complex(id)) {
            return Ok(hit);
        }

        let body = self
            .gateway
            .get_link(link, "", "complex")
            .await
            .map_err(|e| e.to_drop_reason("complex"))?;
        let body = body.get("complex").unwrap_or(&body);
        let unavailable = || DropReason::ComplexUnavailable {
            complex_id: complex_id.map(str::to_string),
        };
        let record: ComplexRecord = parse(body).map_err(|_| unavailable())?;
        let Some(location) = ComplexLocation::from_record(record, complex_id) else {
            error!(complex = ?complex_id, %link, "complex is missing latitude, longitude, city or country");
            return Err(unavailable());
        };

        if let Some(id) = complex_id {
            self.store_complex(id, location.clone());
        }
        Ok(location)
    }

    fn cached_complex(&self, complex_id: &str) -> Option<ComplexLocation> {
        let mut complexes = self.complexes.lock().ok()?;
        if expired(complexes.stored_at, self.clock.now_secs(), self.complex_ttl) {
            complexes.entries.clear();
            complexes.stored_at = None;
            return None;
        }
        complexes.entries.get(complex_id).cloned()
    }

    fn store_complex(&self, complex_id: &str, location: ComplexLocation) {
        if let Ok(mut complexes) = self.complexes.lock() {
            complexes.stored_at = Some(self.clock.now_secs());
            complexes.entries.insert(complex_id.to_string(), location);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::fake::FakeInventoryClient;
    use serde_json::json;

    const COMPLEX_LINK: &str = "/aai/v14/cloud-infrastructure/complexes/complex/DLLSTX55";
    const COMPLEX_PATH: &str = "/v14/cloud-infrastructure/complexes/complex/DLLSTX55";

    fn complex_body() -> Value {
        json!({
            "physical-location-id": "DLLSTX55",
            "complex-name": "dallas-55",
            "latitude": "32.89948",
            "longitude": "97.045443",
            "city": "Dallas",
            "state": "TX",
            "country": "USA"
        })
    }

    fn cache_with(
        fake: FakeInventoryClient,
        capability_aware: bool,
    ) -> (InventoryCache<FakeInventoryClient>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let gateway = InventoryGateway::new(Arc::new(fake), "v14");
        let cache = InventoryCache::new(
            gateway,
            clock.clone(),
            &CacheConfig::default(),
            capability_aware,
        );
        (cache, clock)
    }

    fn region(id: &str) -> Value {
        json!({
            "cloud-region-id": id,
            "cloud-owner": "att-aic",
            "cloud-region-version": "aic3.0",
            "relationship-list": {"relationship": [{
                "related-to": "complex",
                "related-link": COMPLEX_LINK,
                "relationship-data": [
                    {"relationship-key": "complex.physical-location-id", "relationship-value": "DLLSTX55"}
                ]
            }]}
        })
    }

    #[test]
    fn complex_requires_geo_fields() {
        let record: ComplexRecord = parse(&json!({"latitude": "1", "longitude": "2", "city": "x"})).unwrap();
        assert!(ComplexLocation::from_record(record, Some("c1")).is_none());

        let record: ComplexRecord = parse(&complex_body()).unwrap();
        let location = ComplexLocation::from_record(record, None).unwrap();
        assert_eq!(location.complex_id, "DLLSTX55");
        assert_eq!(location.site_fields().city, "Dallas");
    }

    #[tokio::test]
    async fn refresh_builds_snapshot() {
        let fake = FakeInventoryClient::new();
        fake.respond_json(
            "/v14/cloud-infrastructure/cloud-regions/?depth=0",
            json!({"cloud-region": [region("mtn6"), {"cloud-region-id": "no-version"}]}),
        );
        fake.respond_json(COMPLEX_PATH, complex_body());
        let (cache, _) = cache_with(fake, false);

        let snapshot = cache.get_regions().await;
        assert_eq!(snapshot.len(), 1);
        let mtn6 = snapshot.get("mtn6").unwrap();
        assert_eq!(mtn6.version, "3.0");
        assert_eq!(mtn6.physical_location_id, "DLLSTX55");
        assert_eq!(mtn6.complex.country, "USA");
        assert!(mtn6.flavors.is_none());
    }

    #[tokio::test]
    async fn complex_lookups_are_cached_by_id() {
        let fake = FakeInventoryClient::new();
        fake.respond_json(COMPLEX_PATH, json!({"complex": complex_body()}));
        let (cache, clock) = cache_with(fake, false);

        cache.get_complex(COMPLEX_LINK, Some("DLLSTX55")).await.unwrap();
        cache.get_complex(COMPLEX_LINK, Some("DLLSTX55")).await.unwrap();
        assert_eq!(cache.gateway().client().calls(COMPLEX_PATH), 1);

        clock.advance(Duration::from_secs(1441 * 60));
        cache.get_complex(COMPLEX_LINK, Some("DLLSTX55")).await.unwrap();
        assert_eq!(cache.gateway().client().calls(COMPLEX_PATH), 2);
    }

    #[tokio::test]
    async fn complex_cache_expiry_follows_latest_insert() {
        let other_link = "/aai/v14/cloud-infrastructure/complexes/complex/AUSTTX01";
        let other_path = "/v14/cloud-infrastructure/complexes/complex/AUSTTX01";
        let fake = FakeInventoryClient::new();
        fake.respond_json(COMPLEX_PATH, complex_body());
        fake.respond_json(other_path, complex_body());
        let (cache, clock) = cache_with(fake, false);

        cache.get_complex(COMPLEX_LINK, Some("DLLSTX55")).await.unwrap();
        clock.advance(Duration::from_secs(1000 * 60));
        cache.get_complex(other_link, Some("AUSTTX01")).await.unwrap();
        clock.advance(Duration::from_secs(500 * 60));

        cache.get_complex(COMPLEX_LINK, Some("DLLSTX55")).await.unwrap();
        assert_eq!(cache.gateway().client().calls(COMPLEX_PATH), 1);
    }

    #[tokio::test]
    async fn anonymous_complex_lookups_are_not_cached() {
        let fake = FakeInventoryClient::new();
        fake.respond_json(COMPLEX_PATH, complex_body());
        let (cache, _) = cache_with(fake, false);

        cache.get_complex(COMPLEX_LINK, None).await.unwrap();
        cache.get_complex(COMPLEX_LINK, None).await.unwrap();
        assert_eq!(cache.gateway().client().calls(COMPLEX_PATH), 2);
    }

    #[tokio::test]
    async fn incomplete_complex_is_unavailable() {
        let fake = FakeInventoryClient::new();
        fake.respond_json(COMPLEX_PATH, json!({"latitude": "1", "city": "x"}));
        let (cache, _) = cache_with(fake, false);

        let reason = cache.get_complex(COMPLEX_LINK, Some("DLLSTX55")).await.unwrap_err();
        assert_eq!(
            reason,
            DropReason::ComplexUnavailable {
                complex_id: Some("DLLSTX55".to_string())
            }
        );
    }

    #[tokio::test]
    async fn regions_without_id_are_skipped() {
        let fake = FakeInventoryClient::new();
        fake.respond_json(
            "/v14/cloud-infrastructure/cloud-regions/?depth=0",
            json!({"cloud-region": [region(""), region("mtn6")]}),
        );
        fake.respond_json(COMPLEX_PATH, complex_body());
        let (cache, _) = cache_with(fake, false);

        let snapshot = cache.get_regions().await;
        assert_eq!(snapshot.regions.keys().collect::<Vec<_>>(), vec!["mtn6"]);
    }

    #[tokio::test]
    async fn fresh_snapshot_does_not_wait_for_refresh_lock() {
        let fake = FakeInventoryClient::new();
        fake.respond_json(
            "/v14/cloud-infrastructure/cloud-regions/?depth=0",
            json!({"cloud-region": [region("mtn6")]}),
        );
        fake.respond_json(COMPLEX_PATH, complex_body());
        let (cache, _) = cache_with(fake, false);
        cache.refresh().await.unwrap();

        let _held = cache.refresh_lock.lock().await;
        let snapshot = tokio::time::timeout(Duration::from_secs(5), cache.get_regions())
            .await
            .expect("fresh read blocked on the refresh lock");
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn capability_aware_refresh_drops_regions_without_flavors() {
        let fake = FakeInventoryClient::new();
        fake.respond_json(
            "/v14/cloud-infrastructure/cloud-regions/?depth=0",
            json!({"cloud-region": [region("mtn6"), region("mtn7")]}),
        );
        fake.respond_json(COMPLEX_PATH, complex_body());
        fake.respond_json(
            "/v14/cloud-infrastructure/cloud-regions/cloud-region/att-aic/mtn6/flavors?depth=full",
            json!({"flavor": [{"flavor-id": "f1", "flavor-name": "m1.small"}]}),
        );
        fake.respond_json(
            "/v14/cloud-infrastructure/cloud-regions/cloud-region/att-aic/mtn7/flavors?depth=full",
            json!({"flavor": []}),
        );
        let (cache, _) = cache_with(fake, true);

        let snapshot = cache.get_regions().await;
        assert_eq!(snapshot.regions.keys().collect::<Vec<_>>(), vec!["mtn6"]);
        assert!(snapshot.get("mtn6").unwrap().flavors.is_some());
    }
}
