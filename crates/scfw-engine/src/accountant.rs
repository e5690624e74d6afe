//! Behavior accountant: per-metric counters with once-per-(metric,
//! threshold) alert dedup and hard-limit Warn->Block upgrade.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use scfw_core::config::BehavioralPolicy;

use crate::operation::Metric;

#[derive(Debug, Clone, Copy, Default)]
struct CounterState {
    count: u64,
}

/// Which hard/soft threshold was just crossed, for the one-shot audit line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdCrossing {
    Soft,
    Hard,
}

/// Process-wide singleton counter map. Thread-safe: a single mutex guards
/// both the counts and the dedup set.
pub struct Counters {
    state: Mutex<Inner>,
}

struct Inner {
    counts: HashMap<Metric, CounterState>,
    alerted: HashSet<(Metric, &'static str)>,
}

impl Counters {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Inner {
                counts: HashMap::new(),
                alerted: HashSet::new(),
            }),
        }
    }

    pub fn count(&self, metric: Metric) -> u64 {
        self.state.lock().unwrap().counts.get(&metric).map(|c| c.count).unwrap_or(0)
    }

    /// Increment `metric` by one and report any newly crossed thresholds,
    /// scaled by `multiplier` for install mode.
    pub fn increment(
        &self,
        metric: Metric,
        policy: &BehavioralPolicy,
        multiplier: u64,
    ) -> (u64, Vec<ThresholdCrossing>) {
        let mut guard = self.state.lock().unwrap();
        let entry = guard.counts.entry(metric).or_default();
        entry.count += 1;
        let count = entry.count;

        let hard_limit = hard_limit_for(metric, policy).saturating_mul(multiplier.max(1));
        let soft_limit = policy
            .alert_thresholds
            .get(metric.as_str())
            .copied()
            .map(|t| t.saturating_mul(multiplier.max(1)));

        let mut crossings = Vec::new();
        if let Some(soft) = soft_limit {
            if count >= soft && guard.alerted.insert((metric, "soft")) {
                crossings.push(ThresholdCrossing::Soft);
            }
        }
        if hard_limit > 0 && count >= hard_limit && guard.alerted.insert((metric, "hard")) {
            crossings.push(ThresholdCrossing::Hard);
        }

        (count, crossings)
    }

    /// Whether `metric` has already crossed its hard limit — used by the
    /// evaluator to upgrade a subsequent Warn to Block for the same kind.
    pub fn hard_limit_breached(&self, metric: Metric, policy: &BehavioralPolicy, multiplier: u64) -> bool {
        let guard = self.state.lock().unwrap();
        let hard_limit = hard_limit_for(metric, policy).saturating_mul(multiplier.max(1));
        hard_limit > 0
            && guard
                .counts
                .get(&metric)
                .map(|c| c.count >= hard_limit)
                .unwrap_or(false)
    }

    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.state
            .lock()
            .unwrap()
            .counts
            .iter()
            .map(|(m, c)| (m.as_str().to_string(), c.count))
            .collect()
    }
}

impl Default for Counters {
    fn default() -> Self {
        Self::new()
    }
}

fn hard_limit_for(metric: Metric, policy: &BehavioralPolicy) -> u64 {
    match metric {
        Metric::FileReads => policy.max_file_reads,
        Metric::FileWrites => policy.max_file_writes,
        Metric::NetworkRequests => policy.max_network_requests,
        Metric::ProcessSpawns => policy.max_process_spawns,
        Metric::EnvReads => 0,
        Metric::ModuleLoads => 0,
    }
}
