//! Core value types passed between interceptors, the evaluator, and the
//! accountant.

use scfw_core::config::Severity;

/// The kind of sensitive action an interceptor observed.
///
/// A bare `open()` carries no information beyond the mode it was opened
/// with, so this port folds it into `FileRead`/`FileWrite` at open time
/// (the filesystem interceptor resolves the kind from the open flags)
/// rather than adding a tenth variant whose evaluation would just alias
/// one of these two — see DESIGN.md's "descriptor equivalence" entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    FileRead,
    FileWrite,
    FileUnlink,
    FileRename,
    FileReaddir,
    NetConnect,
    NetRequest,
    ProcessSpawn,
    EnvRead,
    ModuleLoad,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::FileRead => "file_read",
            OperationKind::FileWrite => "file_write",
            OperationKind::FileUnlink => "file_unlink",
            OperationKind::FileRename => "file_rename",
            OperationKind::FileReaddir => "file_readdir",
            OperationKind::NetConnect => "net_connect",
            OperationKind::NetRequest => "net_request",
            OperationKind::ProcessSpawn => "process_spawn",
            OperationKind::EnvRead => "env_read",
            OperationKind::ModuleLoad => "module_load",
        }
    }

    /// Whether this kind reads from or writes/mutates its target — used by
    /// the evaluator's domain-deny step to pick the read or write rule set.
    pub fn is_write(self) -> bool {
        matches!(
            self,
            OperationKind::FileWrite | OperationKind::FileUnlink | OperationKind::FileRename
        )
    }

    /// The counter metric this kind rolls up into.
    pub fn metric(self) -> Metric {
        match self {
            OperationKind::FileRead | OperationKind::FileReaddir => Metric::FileReads,
            OperationKind::FileWrite | OperationKind::FileUnlink | OperationKind::FileRename => {
                Metric::FileWrites
            }
            OperationKind::NetConnect | OperationKind::NetRequest => Metric::NetworkRequests,
            OperationKind::ProcessSpawn => Metric::ProcessSpawns,
            OperationKind::EnvRead => Metric::EnvReads,
            OperationKind::ModuleLoad => Metric::ModuleLoads,
        }
    }
}

/// Accounting bucket tracked by the behavior accountant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    FileReads,
    FileWrites,
    NetworkRequests,
    ProcessSpawns,
    EnvReads,
    ModuleLoads,
}

impl Metric {
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::FileReads => "file_reads",
            Metric::FileWrites => "file_writes",
            Metric::NetworkRequests => "network_requests",
            Metric::ProcessSpawns => "process_spawns",
            Metric::EnvReads => "env_reads",
            Metric::ModuleLoads => "module_loads",
        }
    }
}

/// Caller-origin value reserved for engine-internal frames (the audit sink
/// writing its own file, the scanner reading a module it is about to
/// execute). Engine frames are the only callers self-protection and
/// audit-tamper checks let through; comparison is exact string equality,
/// never a substring check, so a same-named shim file cannot forge it.
pub const ENGINE_CALLER_ORIGIN: &str = "<scfw-engine>";

/// An attempted sensitive action submitted to the evaluator.
#[derive(Debug, Clone)]
pub struct Operation {
    pub kind: OperationKind,
    /// Path, host:port, command line, env var name, or module id — the
    /// thing being acted on.
    pub target: String,
    /// Source file of the innermost non-engine call frame. Hosts without stack introspection may pass a
    /// best-effort module id.
    pub caller_origin: String,
    /// Request/response body bytes (`NetRequest`) or module source bytes
    /// (`ModuleLoad`) — the payload the evaluator scans, when the kind has one.
    pub body: Option<Vec<u8>>,
}

impl Operation {
    pub fn new(kind: OperationKind, target: impl Into<String>, caller_origin: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            caller_origin: caller_origin.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

/// The evaluator's decision for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Warn { reason: String },
    Block { reason: String, severity: Severity },
}

impl Verdict {
    pub fn is_block(&self) -> bool {
        matches!(self, Verdict::Block { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Verdict::Allow => None,
            Verdict::Warn { reason } => Some(reason),
            Verdict::Block { reason, .. } => Some(reason),
        }
    }

    pub fn severity(&self) -> Option<Severity> {
        match self {
            Verdict::Block { severity, .. } => Some(*severity),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Allow => "allow",
            Verdict::Warn { .. } => "warn",
            Verdict::Block { .. } => "block",
        }
    }
}
