//! Public facade for the supply-chain security firewall. A host loader
//! depends on this crate alone: call [`Firewall::initialize`] before any
//! dependency code runs, install the returned guards at the host's
//! file/process/network/env/module boundaries, and call
//! [`Firewall::teardown`] on exit.

use std::sync::Arc;

pub use scfw_core::config::{Config, Mode, Severity};
pub use scfw_core::context::ProcessContext;
pub use scfw_core::error::{FirewallError, InitError, PolicyViolation};
pub use scfw_engine::{
    Engine, EnvGuard, FileGuard, FileHandle, ModuleLoadGuard, NetworkGuard, OpenMode, Operation,
    OperationKind, ProcessGuard, Verdict,
};

/// The engine plus one borrowed guard per interception point.
/// Guards borrow the engine rather than own it, so a host can hold
/// `Arc<Firewall>` and hand individual guards to whichever subsystem wraps
/// that boundary.
pub struct Firewall {
    pub engine: Arc<Engine>,
}

impl Firewall {
    /// Run `Cold -> Ready` and install observability. Fails closed: on any
    /// initialization fault this terminates the host process rather than
    /// returning a partially-initialized value.
    pub fn initialize() -> Arc<Firewall> {
        scfw_core::observability::init(&scfw_core::config::ObservabilityConfig::from_env());
        let engine = Engine::initialize();
        Arc::new(Firewall { engine })
    }

    pub fn files(&self) -> FileGuard<'_> {
        FileGuard::new(&self.engine)
    }

    pub fn processes(&self) -> ProcessGuard<'_> {
        ProcessGuard::new(&self.engine)
    }

    pub fn network(&self) -> NetworkGuard<'_> {
        NetworkGuard::new(&self.engine)
    }

    pub fn env(&self) -> EnvGuard<'_> {
        EnvGuard::new(&self.engine)
    }

    pub fn modules(&self) -> ModuleLoadGuard<'_> {
        ModuleLoadGuard::new(&self.engine)
    }

    /// Write the teardown summary record. Call once, from the
    /// host's exit hook.
    pub fn teardown(&self) {
        self.engine.teardown();
    }
}
