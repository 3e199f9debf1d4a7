//! Integration tests for the region cache refresh discipline.
//!
//! - Two refreshes within the TTL hit the inventory once
//! - A refresh after expiry fetches again and replaces every entry
//! - An empty or unusable refresh leaves the previous snapshot in place
//! - A region with more than one complex is left out

use std::sync::Arc;
use std::time::Duration;

use homing_core::CacheConfig;
use homing_inventory::{
    CacheError, FakeInventoryClient, InventoryCache, InventoryGateway, ManualClock,
    RefreshOutcome,
};
use serde_json::{json, Value};

const REGIONS: &str = "/v14/cloud-infrastructure/cloud-regions/?depth=0";

fn complex_path(id: &str) -> String {
    format!("/v14/cloud-infrastructure/complexes/complex/{id}")
}

fn complex_relation(id: &str) -> Value {
    json!({
        "related-to": "complex",
        "related-link": format!("https://inventory/aai/v14/cloud-infrastructure/complexes/complex/{id}"),
        "relationship-data": [
            {"relationship-key": "complex.physical-location-id", "relationship-value": id}
        ]
    })
}

fn region(id: &str, complexes: &[&str]) -> Value {
    let relations: Vec<Value> = complexes.iter().map(|c| complex_relation(c)).collect();
    json!({
        "cloud-region-id": id,
        "cloud-owner": "att-aic",
        "cloud-region-version": "aic3.0",
        "cloud-type": "openstack",
        "cloud-zone": "z1",
        "relationship-list": {"relationship": relations}
    })
}

fn complex(id: &str, city: &str) -> Value {
    json!({
        "physical-location-id": id,
        "complex-name": format!("{id}-name"),
        "latitude": "32.0",
        "longitude": "-97.0",
        "city": city,
        "state": "TX",
        "region": "SE",
        "country": "USA"
    })
}

struct Harness {
    fake: Arc<FakeInventoryClient>,
    clock: Arc<ManualClock>,
    cache: InventoryCache<FakeInventoryClient>,
}

fn harness() -> Harness {
    let fake = Arc::new(FakeInventoryClient::new());
    fake.respond_json(&complex_path("C1"), complex("C1", "Dallas"));
    fake.respond_json(&complex_path("C2"), complex("C2", "Austin"));
    let clock = Arc::new(ManualClock::new(10_000));
    let config = CacheConfig {
        refresh_interval_minutes: 10,
        complex_refresh_interval_minutes: 10,
    };
    let cache = InventoryCache::new(
        InventoryGateway::new(Arc::clone(&fake), "v14"),
        clock.clone(),
        &config,
        false,
    );
    Harness { fake, clock, cache }
}

#[tokio::test]
async fn refresh_within_ttl_fetches_once() {
    let h = harness();
    h.fake.respond_json(REGIONS, json!({"cloud-region": [region("r1", &["C1"])]}));

    assert_eq!(
        h.cache.refresh().await.unwrap(),
        RefreshOutcome::Refreshed { regions: 1 }
    );
    assert_eq!(h.cache.refresh().await.unwrap(), RefreshOutcome::Fresh);
    h.cache.get_regions().await;
    assert_eq!(h.fake.calls(REGIONS), 1);
}

#[tokio::test]
async fn concurrent_callers_share_one_refresh() {
    let h = Arc::new(harness());
    h.fake.respond_json(REGIONS, json!({"cloud-region": [region("r1", &["C1"])]}));

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let h = Arc::clone(&h);
        tasks.push(tokio::spawn(async move { h.cache.get_regions().await.len() }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), 1);
    }
    assert_eq!(h.fake.calls(REGIONS), 1);
}

#[tokio::test]
async fn refresh_after_expiry_replaces_all_entries() {
    let h = harness();
    h.fake.respond_json(
        REGIONS,
        json!({"cloud-region": [region("r1", &["C1"]), region("r2", &["C2"])]}),
    );
    let before = h.cache.get_regions().await;
    assert_eq!(before.len(), 2);

    h.fake.respond_json(REGIONS, json!({"cloud-region": [region("r3", &["C2"])]}));
    h.clock.advance(Duration::from_secs(11 * 60));
    let after = h.cache.get_regions().await;

    assert_eq!(h.fake.calls(REGIONS), 2);
    assert_eq!(after.regions.keys().collect::<Vec<_>>(), vec!["r3"]);
    assert_eq!(after.get("r3").unwrap().complex.city, "Austin");
    assert!(after.refreshed_at > before.refreshed_at);
}

#[tokio::test]
async fn empty_refresh_preserves_previous_snapshot() {
    let h = harness();
    h.fake.respond_json(REGIONS, json!({"cloud-region": [region("r1", &["C1"])]}));
    let before = h.cache.get_regions().await;

    h.fake.respond_json(REGIONS, json!({"cloud-region": []}));
    h.clock.advance(Duration::from_secs(11 * 60));
    assert!(matches!(h.cache.refresh().await, Err(CacheError::NoRegions)));

    let after = h.cache.get_regions().await;
    assert_eq!(*after, *before);
}

#[tokio::test]
async fn unusable_refresh_preserves_previous_snapshot() {
    let h = harness();
    h.fake.respond_json(REGIONS, json!({"cloud-region": [region("r1", &["C1"])]}));
    let before = h.cache.get_regions().await;

    h.fake.respond_json(REGIONS, json!({"cloud-region": [region("r9", &[])]}));
    h.clock.advance(Duration::from_secs(11 * 60));
    assert!(matches!(
        h.cache.refresh().await,
        Err(CacheError::NoUsableRegions { fetched: 1 })
    ));
    assert_eq!(*h.cache.get_regions().await, *before);
}

#[tokio::test]
async fn failed_fetch_preserves_previous_snapshot() {
    let h = harness();
    h.fake.respond_json(REGIONS, json!({"cloud-region": [region("r1", &["C1"])]}));
    let before = h.cache.get_regions().await;

    h.fake.fail(REGIONS);
    h.clock.advance(Duration::from_secs(11 * 60));
    assert!(matches!(h.cache.refresh().await, Err(CacheError::Fetch(_))));
    assert_eq!(*h.cache.get_regions().await, *before);
}

#[tokio::test]
async fn region_with_two_complexes_is_skipped() {
    let h = harness();
    h.fake.respond_json(
        REGIONS,
        json!({"cloud-region": [region("r1", &["C1"]), region("r2", &["C1", "C2"])]}),
    );

    let snapshot = h.cache.get_regions().await;
    assert_eq!(snapshot.regions.keys().collect::<Vec<_>>(), vec!["r1"]);
    assert_eq!(h.fake.calls(&complex_path("C2")), 0);
}

#[tokio::test]
async fn complex_without_name_is_not_cached_as_region() {
    let h = harness();
    h.fake.respond_json(
        &complex_path("C3"),
        json!({"latitude": "1", "longitude": "2", "city": "Waco", "country": "USA"}),
    );
    h.fake.respond_json(
        REGIONS,
        json!({"cloud-region": [region("r1", &["C1"]), region("r3", &["C3"])]}),
    );

    let snapshot = h.cache.get_regions().await;
    assert!(snapshot.get("r3").is_none());
    assert!(snapshot.regions.values().all(|r| !r.complex.complex_id.is_empty()));
}

#[tokio::test]
async fn host_location_resolves_through_named_query() {
    let h = harness();
    h.fake.respond_json(
        "/v14/query?format=id",
        json!({"results": [
            {"resource-type": "pserver", "resource-link": "/aai/v14/cloud-infrastructure/pservers/pserver/h1"},
            {"resource-type": "complex", "resource-link": "/aai/v14/cloud-infrastructure/complexes/complex/C1"}
        ]}),
    );

    let location = homing_inventory::lookups::resolve_host_location(h.cache.gateway(), "h1")
        .await
        .unwrap();
    assert_eq!(location.latitude, "32.0");
    assert_eq!(location.country.as_deref(), Some("USA"));
}
