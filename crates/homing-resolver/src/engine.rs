//! Resolution engine: demands in, filtered candidates and triage out.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use homing_core::{Candidate, Demands, HomingConfig, InventoryType, Requirement, RunContext, TriageReport};
use homing_inventory::{InventoryCache, InventoryClient};

use crate::filter::FilterChain;
use crate::pipeline::{
    CloudResolver, Discovery, ResolveContext, Resolver, ServiceResolver, TransportResolver,
    VfModuleResolver,
};
use crate::triage::TriageCollector;

/// Output of one run.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    /// Every submitted demand name, possibly with no candidates.
    pub candidates: BTreeMap<String, Vec<Candidate>>,
    pub triage: TriageReport,
}

impl Resolution {
    pub fn for_demand(&self, demand: &str) -> &[Candidate] {
        self.candidates.get(demand).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Resolves demands concurrently, bounded by the configured limit.
///
/// Demands run as independent tasks; requirements within a demand run in
/// order, so a demand's candidate list follows its requirement order.
pub struct ResolutionEngine<C> {
    ctx: Arc<ResolveContext<C>>,
    permits: Arc<Semaphore>,
}

impl<C: InventoryClient> ResolutionEngine<C> {
    pub fn new(cache: Arc<InventoryCache<C>>, config: &HomingConfig) -> Self {
        let limit = config.resolver.concurrency_limit.max(1);
        Self {
            ctx: Arc::new(ResolveContext::new(cache, config)),
            permits: Arc::new(Semaphore::new(limit)),
        }
    }

    pub fn context(&self) -> &ResolveContext<C> {
        &self.ctx
    }

    pub async fn resolve_demands(&self, demands: &Demands, run: &RunContext) -> Resolution {
        let started = Instant::now();
        info!(plan = %run.plan_id, demands = demands.len(), "resolving demands");

        let mut tasks = JoinSet::new();
        for (name, requirements) in demands {
            let ctx = Arc::clone(&self.ctx);
            let permits = Arc::clone(&self.permits);
            let name = name.clone();
            let requirements = requirements.clone();
            tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return (name, Vec::new(), TriageCollector::new());
                };
                let (candidates, triage) = resolve_demand(&ctx, &name, &requirements).await;
                (name, candidates, triage)
            });
        }

        let mut finished = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, candidates, triage)) => {
                    finished.insert(name, (candidates, triage));
                }
                Err(e) => error!(error = %e, "demand task failed"),
            }
        }

        let mut candidates = BTreeMap::new();
        let mut triage = TriageCollector::new();
        for name in demands.keys() {
            let (found, dropped) = finished.remove(name).unwrap_or_default();
            triage.merge(dropped);
            candidates.insert(name.clone(), found);
        }

        let resolved: usize = candidates.values().map(Vec::len).sum();
        info!(
            plan = %run.plan_id,
            candidates = resolved,
            dropped = triage.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "demands resolved"
        );
        Resolution {
            candidates,
            triage: triage.into_report(run),
        }
    }
}

/// All requirements of one demand, in order.
pub async fn resolve_demand<C: InventoryClient>(
    ctx: &ResolveContext<C>,
    demand: &str,
    requirements: &[Requirement],
) -> (Vec<Candidate>, TriageCollector) {
    let mut triage = TriageCollector::new();
    let mut candidates = Vec::new();
    for requirement in requirements {
        candidates.extend(resolve_requirement(ctx, demand, requirement, &mut triage).await);
    }
    if candidates.is_empty() {
        warn!(%demand, "no candidates resolved");
    }
    (candidates, triage)
}

/// Discover and filter candidates for one requirement.
pub async fn resolve_requirement<C: InventoryClient>(
    ctx: &ResolveContext<C>,
    demand: &str,
    requirement: &Requirement,
    triage: &mut TriageCollector,
) -> Vec<Candidate> {
    let discovered = discover(ctx, demand, requirement).await;
    let chain = FilterChain::new(requirement, ctx.costs.existing_placement_cost);

    let mut kept = Vec::new();
    for item in discovered {
        match item {
            Ok(found) => {
                let candidate_id = found.candidate.candidate_id.clone();
                let location_id = found.candidate.location_id.clone();
                match chain.apply(found.candidate, &found.attributes) {
                    Ok(candidate) => kept.push(candidate),
                    Err(reason) => triage.record(&candidate_id, &location_id, demand, reason),
                }
            }
            Err(dropped) => triage.record(
                &dropped.candidate_id,
                &dropped.location_id,
                demand,
                dropped.reason,
            ),
        }
    }
    debug!(
        %demand,
        inventory_type = %requirement.inventory_type,
        kept = kept.len(),
        "requirement resolved"
    );
    kept
}

async fn discover<C: InventoryClient>(
    ctx: &ResolveContext<C>,
    demand: &str,
    requirement: &Requirement,
) -> Vec<Discovery> {
    match requirement.inventory_type {
        InventoryType::Cloud => CloudResolver.resolve(ctx, demand, requirement).await,
        InventoryType::Service => ServiceResolver.resolve(ctx, demand, requirement).await,
        InventoryType::VfModule => VfModuleResolver.resolve(ctx, demand, requirement).await,
        InventoryType::Transport => TransportResolver.resolve(ctx, demand, requirement).await,
    }
}
