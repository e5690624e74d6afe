//! `Engine`: the single configured-object handle every interceptor is
//! constructed against.
//! Holds the four process-wide singletons — `Config`, `ProcessContext`,
//! `Counters`, `AuditLog` — plus the compiled policy, and drives the
//! `Cold -> Ready` startup state machine.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use scfw_core::config::{Config, Severity};
use scfw_core::context::{EngineState, ProcessContext};
use scfw_core::error::{EngineInternalError, InitError};
use scfw_core::{AuditEntry, AuditLog, PolicyViolation};

use crate::accountant::Counters;
use crate::compiled::CompiledPolicy;
use crate::operation::{Metric, Operation, OperationKind, Verdict};

/// Correlation id generator: a monotonically increasing counter is enough
/// to make every `AuditEntry` uniquely attributable within one process
/// lifetime — no randomness required, and none of `Date.now`/`rand` style
/// nondeterminism leaks into the evaluator's inputs.
fn next_correlation_id() -> String {
    use std::sync::atomic::AtomicU64;
    static NEXT: AtomicU64 = AtomicU64::new(1);
    format!("corr-{}", NEXT.fetch_add(1, Ordering::Relaxed))
}

/// The configured engine handle. Constructed once at `initialize`, shared
/// (typically via `Arc<Engine>`) by every interceptor for the life of the
/// host process; never removed or rebuilt.
pub struct Engine {
    pub config: Config,
    pub context: ProcessContext,
    pub counters: Counters,
    pub audit: AuditLog,
    pub compiled: CompiledPolicy,
    pub(crate) ready: AtomicBool,
    pub(crate) blocks_by_kind: std::sync::Mutex<HashMap<&'static str, u64>>,
}

impl Engine {
    /// Run the `Cold -> Ready` sequence. Any failure fails closed: this
    /// terminates the host process and never returns `Err` to a caller
    /// that could continue in a partially initialized state.
    pub fn initialize() -> std::sync::Arc<Engine> {
        match Self::try_initialize() {
            Ok(engine) => engine,
            Err(e) => {
                EngineState::fail_closed(&e.to_string());
            }
        }
    }

    /// Fallible constructor, for hosts/tests that want to handle
    /// `InitError` themselves instead of going through `fail_closed`.
    pub fn try_initialize() -> Result<std::sync::Arc<Engine>, InitError> {
        let mut state = EngineState::Cold;

        let config = Config::load();
        state = state.next();
        debug_assert_eq!(state, EngineState::ConfigLoaded);

        let context = ProcessContext::detect();
        state = state.next();
        debug_assert_eq!(state, EngineState::ContextComputed);

        let cwd = std::env::current_dir().unwrap_or_else(|_| Path::new(".").into());
        let compiled = CompiledPolicy::from_config(&config, &cwd);
        let audit_path = config
            .audit_log_path
            .clone()
            .unwrap_or_else(|| "firewall-audit.jsonl".to_string());
        let audit = AuditLog::open(&audit_path).map_err(|e| InitError::Audit {
            path: audit_path,
            source: e,
        })?;
        state = state.next();
        debug_assert_eq!(state, EngineState::InterceptorsInstalled);

        state = state.next();
        debug_assert_eq!(state, EngineState::Ready);

        tracing::info!(mode = ?config.mode, install_mode = context.install_mode, "firewall engine ready");

        Ok(std::sync::Arc::new(Engine {
            config,
            context,
            counters: Counters::new(),
            audit,
            compiled,
            ready: AtomicBool::new(true),
            blocks_by_kind: std::sync::Mutex::new(HashMap::new()),
        }))
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    /// The single entry point every interceptor calls: evaluate, account,
    /// audit, in that fixed order. Returns the verdict; enforcement
    /// (translating `Block` into a host-native error) is the
    /// interceptor's job.
    pub fn decide(&self, op: &Operation) -> Verdict {
        let verdict = self.evaluate_guarded(op);

        let multiplier = install_multiplier(op.kind.metric(), &self.config, self.context.install_mode);
        let (_, crossings) = self.counters.increment(op.kind.metric(), &self.config.behavioral, multiplier);
        for crossing in crossings {
            tracing::warn!(
                metric = op.kind.metric().as_str(),
                crossing = ?crossing,
                "behavioral threshold crossed"
            );
        }

        if verdict.is_block() {
            let mut guard = self.blocks_by_kind.lock().unwrap();
            *guard.entry(op.kind.as_str()).or_insert(0) += 1;
        }

        self.write_audit(op, &verdict);
        verdict
    }

    /// Run the evaluator behind `catch_unwind`: a panic inside the policy
    /// match is an `EngineInternal` fault, not a reason to crash the host.
    /// It is downgraded to Block on the triggering op and the engine stays
    /// Ready for the next one.
    fn evaluate_guarded(&self, op: &Operation) -> Verdict {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            crate::evaluator::evaluate(op, &self.config, &self.context, &self.counters, &self.compiled)
        }));
        match result {
            Ok(verdict) => verdict,
            Err(payload) => {
                let fault = EngineInternalError::Evaluation(panic_message(&payload));
                tracing::error!(kind = op.kind.as_str(), %fault, "engine-internal fault, downgrading to block");
                Verdict::Block {
                    reason: format!("engine_internal:{}", fault),
                    severity: Severity::Critical,
                }
            }
        }
    }

    fn write_audit(&self, op: &Operation, verdict: &Verdict) {
        let entry = AuditEntry {
            timestamp_iso: chrono::Utc::now().to_rfc3339(),
            correlation_id: next_correlation_id(),
            operation_kind: op.kind.as_str().to_string(),
            target: op.target.clone(),
            caller_origin: op.caller_origin.clone(),
            verdict: verdict.label().to_string(),
            reason: verdict.reason().unwrap_or("allow").to_string(),
            severity: verdict.severity(),
            lifecycle_context: self.context.is_dependency_lifecycle,
            pid: std::process::id(),
        };
        if !self.config.is_silent() {
            match verdict {
                Verdict::Block { reason, .. } => tracing::warn!(target: "scfw", kind = op.kind.as_str(), %reason, "blocked"),
                Verdict::Warn { reason } => tracing::debug!(target: "scfw", kind = op.kind.as_str(), %reason, "warned"),
                Verdict::Allow => {}
            }
        }
        self.audit.record(&entry);
    }

    /// `decide`, then translate a `Block` verdict into the stable,
    /// machine-matchable error an interceptor hands back to host code.
    /// `Allow`/`Warn` both return `Ok`.
    pub fn enforce(&self, op: Operation) -> Result<Verdict, PolicyViolation> {
        let verdict = self.decide(&op);
        match &verdict {
            Verdict::Block { reason, .. } => Err(match op.kind {
                OperationKind::ModuleLoad => PolicyViolation::module_blocked(reason.clone()),
                OperationKind::EnvRead => PolicyViolation::env_blocked(reason.clone()),
                _ if reason.contains("tampering") => PolicyViolation::tamper_blocked(reason.clone()),
                _ => PolicyViolation::blocked(format!("{}: {}", op.target, reason)),
            }),
            _ => Ok(verdict),
        }
    }

    /// Append the teardown summary record. Called from the host's
    /// `beforeExit`-equivalent hook.
    pub fn teardown(&self) {
        let totals = self.counters.snapshot();
        let blocks_by_kind: HashMap<String, u64> = self
            .blocks_by_kind
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        let risky = blocks_by_kind.values().any(|v| *v > 0) || self.audit.dropped_count() > 0;
        self.audit.write_summary(totals, blocks_by_kind, risky);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn install_multiplier(metric: Metric, config: &Config, install_mode: bool) -> u64 {
    if !install_mode {
        return 1;
    }
    match metric {
        Metric::FileReads => config.install_mode_multipliers.reads,
        Metric::FileWrites => config.install_mode_multipliers.writes,
        Metric::ProcessSpawns => config.install_mode_multipliers.spawns,
        Metric::NetworkRequests => config.install_mode_multipliers.network,
        Metric::EnvReads | Metric::ModuleLoads => 1,
    }
}
