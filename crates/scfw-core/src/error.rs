//! Stable, machine-matchable error surface.

use thiserror::Error;

/// Error codes surfaced to a host wrapping a blocked operation. Consumers
/// match on these strings, not on the `Display` text.
pub const FIREWALL_BLOCKED: &str = "FIREWALL_BLOCKED";
pub const FIREWALL_MODULE_BLOCKED: &str = "FIREWALL_MODULE_BLOCKED";
pub const FIREWALL_ENV_BLOCKED: &str = "FIREWALL_ENV_BLOCKED";
pub const FIREWALL_TAMPER_BLOCKED: &str = "FIREWALL_TAMPER_BLOCKED";

/// A rejected operation, carrying a stable code and a human reason.
#[derive(Debug, Error)]
#[error("{code}: {reason}")]
pub struct PolicyViolation {
    pub code: &'static str,
    pub reason: String,
}

impl PolicyViolation {
    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            code: FIREWALL_BLOCKED,
            reason: reason.into(),
        }
    }

    pub fn module_blocked(reason: impl Into<String>) -> Self {
        Self {
            code: FIREWALL_MODULE_BLOCKED,
            reason: reason.into(),
        }
    }

    pub fn env_blocked(reason: impl Into<String>) -> Self {
        Self {
            code: FIREWALL_ENV_BLOCKED,
            reason: reason.into(),
        }
    }

    pub fn tamper_blocked(reason: impl Into<String>) -> Self {
        Self {
            code: FIREWALL_TAMPER_BLOCKED,
            reason: reason.into(),
        }
    }
}

/// A fault during `Cold -> Ready` initialize. Always fail-closed: the host
/// process terminates, it is never caught and continued.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to open audit log at {path}: {source}")]
    Audit {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Taxonomy of engine-internal faults: a fault inside the evaluator, audit,
/// or accountant path while the engine is otherwise Ready. These never
/// propagate as-is; the caller downgrades the triggering operation to
/// `Block` and records the fault, keeping the engine fail-closed without
/// tearing down the process.
#[derive(Debug, Error)]
pub enum EngineInternalError {
    #[error("pattern compilation failed: {0}")]
    PatternCompile(String),
    #[error("path resolution failed: {0}")]
    PathResolution(String),
    #[error("evaluation fault: {0}")]
    Evaluation(String),
}

/// The error surface an interceptor hands back to host code: either the
/// operation was rejected by policy, or the underlying host operation
/// itself failed. `PolicyViolation` is the only variant carrying a stable
/// `FIREWALL_*` code; everything else is the platform's own native error,
/// passed through unchanged.
#[derive(Debug, Error)]
pub enum FirewallError {
    #[error(transparent)]
    Policy(#[from] PolicyViolation),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FirewallError {
    pub fn code(&self) -> Option<&'static str> {
        match self {
            FirewallError::Policy(p) => Some(p.code),
            FirewallError::Io(_) => None,
        }
    }
}
