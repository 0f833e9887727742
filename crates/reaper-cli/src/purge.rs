use std::collections::HashSet;

use tracing::{error, info, warn, Instrument};

use reaper_common::{Condition, PurgeConfig};
use reaper_engine::ProcessEngine;

#[derive(Debug, Clone, Copy, Default)]
pub struct PurgeOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub healthy: bool,
    pub dry_run: bool,
    /// Distinct ids matched by the inclusion query.
    pub included: usize,
    /// Distinct ids matched by the exclusion query.
    pub excluded: usize,
    /// Included ids that survived the exclusion filter, in server order.
    pub planned: Vec<String>,
    pub deleted: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl PurgeReport {
    pub fn skipped(&self) -> usize {
        self.included - self.planned.len()
    }
}

/// Check that the engine answers. Failure is logged and reported, never fatal.
pub async fn health_check(engine: &dyn ProcessEngine) -> bool {
    match engine.health().await {
        Ok(()) => {
            info!(target_url=%engine.describe(), "process engine is healthy and reachable");
            true
        }
        Err(e) => {
            error!(
                target_url=%engine.describe(),
                error=%e,
                "process engine ({}) is unavailable or unreachable!",
                engine.describe()
            );
            false
        }
    }
}

/// Resolve ids for `condition`, downgrading any failure to an empty list.
/// Duplicate ids are dropped, keeping the first occurrence.
pub async fn resolve_ids(
    engine: &dyn ProcessEngine,
    condition: &Condition,
    label: &str,
) -> Vec<String> {
    match engine.find_instance_ids(condition).await {
        Ok(ids) => dedup_preserving_order(ids),
        Err(e) => {
            error!(
                query = label,
                error = %e,
                "instance lookup failed, continuing with no {label} instances"
            );
            Vec::new()
        }
    }
}

fn dedup_preserving_order(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

/// Empty when the exclusion condition is empty; no request is made then.
pub async fn exclusion_set(engine: &dyn ProcessEngine, config: &PurgeConfig) -> HashSet<String> {
    if !config.has_exclusions() {
        return HashSet::new();
    }
    resolve_ids(engine, &config.excluded_condition, "excluded")
        .await
        .into_iter()
        .collect()
}

pub fn without_excluded(included: &[String], excluded: &HashSet<String>) -> Vec<String> {
    included
        .iter()
        .filter(|id| !excluded.contains(*id))
        .cloned()
        .collect()
}

/// Delete sequentially; a failure is recorded and the loop moves on.
pub async fn delete_all(
    engine: &dyn ProcessEngine,
    ids: &[String],
) -> (Vec<String>, Vec<(String, String)>) {
    let mut deleted = Vec::new();
    let mut failed = Vec::new();
    for id in ids {
        match engine.delete_instance(id).await {
            Ok(()) => {
                info!(id=%id, "Successfully deleted process instance ID '{id}'");
                deleted.push(id.clone());
            }
            Err(e) => {
                error!(
                    id = %id,
                    status = e.status(),
                    error = %e,
                    "Failed to delete process instance ID '{id}': {e}"
                );
                failed.push((id.clone(), e.to_string()));
            }
        }
    }
    (deleted, failed)
}

pub async fn run_purge(
    engine: &dyn ProcessEngine,
    config: &PurgeConfig,
    opts: PurgeOptions,
) -> PurgeReport {
    let healthy = health_check(engine)
        .instrument(tracing::info_span!("health_check"))
        .await;

    if config.includes_everything() {
        warn!(
            target_url = %engine.describe(),
            "includedCondition is empty: every historic process instance is a deletion candidate"
        );
    }

    let included = resolve_ids(engine, &config.included_condition, "included")
        .instrument(tracing::info_span!("resolve_included"))
        .await;

    let excluded = exclusion_set(engine, config)
        .instrument(tracing::info_span!("resolve_excluded"))
        .await;

    // Counts are of distinct ids: resolve_ids drops duplicates.
    info!(
        included = included.len(),
        excluded = excluded.len(),
        "Found {} processes, and will exclude {} processes.",
        included.len(),
        excluded.len()
    );

    let planned = without_excluded(&included, &excluded);

    let (deleted, failed) = if opts.dry_run {
        for id in &planned {
            info!(id=%id, "dry run: would delete process instance ID '{id}'");
        }
        (Vec::new(), Vec::new())
    } else {
        delete_all(engine, &planned)
            .instrument(tracing::info_span!("delete", count = planned.len()))
            .await
    };

    if !failed.is_empty() {
        warn!(
            failed = failed.len(),
            deleted = deleted.len(),
            "some process instances could not be deleted"
        );
    }

    PurgeReport {
        healthy,
        dry_run: opts.dry_run,
        included: included.len(),
        excluded: excluded.len(),
        planned,
        deleted,
        failed,
    }
}
