//! Target selection per strategy mode
//!
//! Selection produces the full try-order up front: the engine walks it,
//! exhausting each target's retries before moving to the next. For
//! load-balance the first entry is drawn proportionally to weight — the RNG
//! is `rand::thread_rng`, i.e. a non-deterministic per-thread generator —
//! and the remaining targets follow in weight-descending order as fallback.

use rand::Rng;

use super::config::{RouterConfig, StrategyMode, Target};
use crate::core::providers::ProviderRegistry;

/// Build the ordered list of targets to try for one route call
pub(crate) fn selection_order(config: &RouterConfig, registry: &ProviderRegistry) -> Vec<Target> {
    match config.strategy.mode {
        StrategyMode::Single | StrategyMode::Fallback => config.targets.clone(),
        StrategyMode::LoadBalance => load_balance_order(&config.targets, registry),
    }
}

fn load_balance_order(targets: &[Target], registry: &ProviderRegistry) -> Vec<Target> {
    // The sampling distribution is the weight vector normalised over
    // registered-and-resolvable targets; unresolvable ones only appear at
    // the tail where they surface configuration errors.
    let resolvable: Vec<&Target> = targets
        .iter()
        .filter(|target| registry.contains(&target.provider))
        .collect();

    let primary = if resolvable.is_empty() {
        None
    } else {
        let total: f64 = resolvable.iter().filter_map(|t| t.weight).sum();
        if total > 0.0 {
            let roll: f64 = rand::thread_rng().gen_range(0.0..total);
            Some(pick_weighted(&resolvable, roll).provider.clone())
        } else {
            Some(resolvable[0].provider.clone())
        }
    };

    let mut order: Vec<Target> = Vec::with_capacity(targets.len());
    if let Some(primary_name) = &primary {
        if let Some(target) = targets.iter().find(|t| &t.provider == primary_name) {
            order.push(target.clone());
        }
    }

    let mut rest: Vec<Target> = targets
        .iter()
        .filter(|target| Some(&target.provider) != primary.as_ref())
        .cloned()
        .collect();
    rest.sort_by(|a, b| {
        b.weight
            .unwrap_or(0.0)
            .partial_cmp(&a.weight.unwrap_or(0.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order.extend(rest);
    order
}

/// Walk the cumulative weight distribution with a uniform roll in
/// `[0, total)`
fn pick_weighted<'a>(targets: &[&'a Target], roll: f64) -> &'a Target {
    let mut cumulative = 0.0;
    for target in targets {
        cumulative += target.weight.unwrap_or(0.0);
        if roll < cumulative {
            return target;
        }
    }
    targets
        .last()
        .expect("pick_weighted called with at least one target")
}
