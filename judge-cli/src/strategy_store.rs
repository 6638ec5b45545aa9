//! The refreshable strategy snapshot (spec §4.E step 1, §6 "Strategy
//! snapshot"): a mapping from `endpoint/metric` to the ordered sequence of
//! strategies targeting that series.
//!
//! Refreshed wholesale on a fixed interval and swapped in behind an `Arc`,
//! so a scheduler turn in progress keeps reading the snapshot it started
//! with — mirroring the teacher's DAG-rebuild-on-version-change pattern in
//! `scheduler.rs`, simplified because this snapshot has no internal
//! versioning of its own, just a full periodic replace.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use judge_core::Strategy;
use tracing::{info, warn};

use crate::error::CliError;

pub struct StrategySnapshot {
    pub groups: HashMap<String, Vec<Strategy>>,
}

impl StrategySnapshot {
    fn build(strategies: Vec<Strategy>) -> Self {
        let mut groups: HashMap<String, Vec<Strategy>> = HashMap::new();
        for strategy in strategies {
            let key = format!("{}/{}", strategy.endpoint_pattern, strategy.metric);
            groups.entry(key).or_default().push(strategy);
        }
        Self { groups }
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

pub struct StrategyStore {
    inner: RwLock<Arc<StrategySnapshot>>,
    http: reqwest::Client,
    source_url: String,
}

impl StrategyStore {
    pub fn new(source_url: String) -> Self {
        Self {
            inner: RwLock::new(Arc::new(StrategySnapshot::build(Vec::new()))),
            http: reqwest::Client::new(),
            source_url,
        }
    }

    /// The current snapshot. Cheap — a single `Arc` clone.
    pub fn snapshot(&self) -> Arc<StrategySnapshot> {
        self.inner
            .read()
            .expect("strategy store lock poisoned")
            .clone()
    }

    /// Fetch the full strategy list and replace the snapshot.
    pub async fn refresh(&self) -> Result<(), CliError> {
        let strategies: Vec<Strategy> = self
            .http
            .get(&self.source_url)
            .send()
            .await
            .map_err(|e| CliError::StrategyFetch(e.to_string()))?
            .json()
            .await
            .map_err(|e| CliError::StrategyFetch(e.to_string()))?;

        let count = strategies.len();
        let snapshot = Arc::new(StrategySnapshot::build(strategies));
        *self.inner.write().expect("strategy store lock poisoned") = snapshot;
        info!(strategy_count = count, "strategy snapshot refreshed");
        Ok(())
    }

    /// Refresh on a fixed interval, forever. Errors are logged and the loop
    /// continues with the previous snapshot — a transient fetch failure
    /// must never stop judging against the strategies already loaded.
    pub async fn run_refresh_loop(&self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.refresh().await {
                warn!(error = %e, "strategy snapshot refresh failed, keeping prior snapshot");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use judge_core::{Operator, Tags};

    fn strategy(id: i64, endpoint: &str, metric: &str) -> Strategy {
        Strategy {
            id,
            endpoint_pattern: endpoint.to_string(),
            metric: metric.to_string(),
            tags: Tags::new(),
            func: "avg(#3)".to_string(),
            operator: Operator::Gt,
            right_value: 10.0,
            max_step: 3,
            priority: 0,
        }
    }

    #[test]
    fn groups_strategies_by_endpoint_and_metric() {
        let snapshot = StrategySnapshot::build(vec![
            strategy(1, "host1", "cpu.idle"),
            strategy(2, "host1", "cpu.idle"),
            strategy(3, "host1", "mem.used"),
        ]);
        assert_eq!(snapshot.groups.get("host1/cpu.idle").unwrap().len(), 2);
        assert_eq!(snapshot.groups.get("host1/mem.used").unwrap().len(), 1);
        assert_eq!(snapshot.len(), 3);
    }

    #[test]
    fn empty_snapshot_reports_empty() {
        let snapshot = StrategySnapshot::build(Vec::new());
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.len(), 0);
    }

    #[tokio::test]
    async fn new_store_starts_with_an_empty_snapshot() {
        let store = StrategyStore::new("http://localhost:6040/strategies".to_string());
        assert!(store.snapshot().is_empty());
    }
}
