//! Single inventory lookups, printed as JSON.

use serde_json::json;
use tracing::warn;

use homing_inventory::lookups;
use homing_inventory::{InventoryCache, InventoryClient};

pub async fn regions<C: InventoryClient>(cache: &InventoryCache<C>) -> anyhow::Result<()> {
    cache.refresh().await?;
    let snapshot = cache.snapshot().await;
    let regions: Vec<_> = snapshot
        .regions
        .values()
        .map(|r| {
            json!({
                "cloud-region-id": r.region_id,
                "cloud-owner": r.cloud_owner,
                "cloud-region-version": r.version,
                "physical-location-id": r.physical_location_id,
                "city": r.complex.city,
                "country": r.complex.country,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&regions)?);
    Ok(())
}

pub async fn host_location<C: InventoryClient>(
    cache: &InventoryCache<C>,
    host: &str,
) -> anyhow::Result<()> {
    let found = lookups::resolve_host_location(cache.gateway(), host).await;
    print_found("host", host, &found)
}

pub async fn clli_location<C: InventoryClient>(
    cache: &InventoryCache<C>,
    clli: &str,
) -> anyhow::Result<()> {
    let found = lookups::resolve_clli_location(cache.gateway(), clli).await;
    print_found("clli", clli, &found)
}

pub async fn network_roles<C: InventoryClient>(
    cache: &InventoryCache<C>,
    role: &str,
) -> anyhow::Result<()> {
    let found = lookups::check_network_roles(cache.gateway(), role).await;
    print_found("role", role, &found)
}

pub async fn candidate_role<C: InventoryClient>(
    cache: &InventoryCache<C>,
    host: &str,
) -> anyhow::Result<()> {
    let found = lookups::check_candidate_role(cache.gateway(), host).await;
    print_found("host", host, &found)
}

pub async fn group_pairs<C: InventoryClient>(
    cache: &InventoryCache<C>,
    description: &str,
) -> anyhow::Result<()> {
    let found = lookups::get_inventory_group_pairs(cache.gateway(), description).await;
    print_found("description", description, &found)
}

/// Print `found` as JSON, `null` when the lookup came back empty.
fn print_found<T: serde::Serialize>(key: &str, value: &str, found: &Option<T>) -> anyhow::Result<()> {
    if found.is_none() {
        warn!(%key, %value, "lookup found nothing");
    }
    println!("{}", serde_json::to_string_pretty(found)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use homing_core::CacheConfig;
    use homing_inventory::{FakeInventoryClient, InventoryGateway, ManualClock};

    fn cache(fake: FakeInventoryClient) -> InventoryCache<FakeInventoryClient> {
        InventoryCache::new(
            InventoryGateway::new(Arc::new(fake), "v14"),
            Arc::new(ManualClock::new(0)),
            &CacheConfig::default(),
            false,
        )
    }

    #[tokio::test]
    async fn regions_fail_without_inventory() {
        let cache = cache(FakeInventoryClient::new());
        assert!(regions(&cache).await.is_err());
    }

    #[tokio::test]
    async fn empty_lookup_is_not_an_error() {
        let fake = FakeInventoryClient::new();
        fake.respond_json(
            "/v14/network/instance-groups/?description=none&depth=0",
            json!({"instance-group": []}),
        );
        let cache = cache(fake);
        assert!(group_pairs(&cache, "none").await.is_ok());
        assert!(clli_location(&cache, "DLLSTX55").await.is_ok());
    }
}
