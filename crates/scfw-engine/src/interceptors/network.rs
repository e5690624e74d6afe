//! Network interceptor. Wraps connect and outbound-request
//! paths, scans request bodies for credential patterns, and surfaces the
//! GitHub API sub-evaluator — all through the same `evaluate()` choke point
//! the other interceptors use.

use scfw_core::error::FirewallError;

use crate::engine::Engine;
use crate::operation::{Operation, OperationKind};

pub struct NetworkGuard<'e> {
    engine: &'e Engine,
}

impl<'e> NetworkGuard<'e> {
    pub fn new(engine: &'e Engine) -> Self {
        Self { engine }
    }

    /// Evaluate a bare `connect(host, port)` with no body to scan yet (the
    /// TCP-handshake stage of an HTTP client, or any non-HTTP socket).
    pub fn guarded_connect(&self, host: &str, port: u16, caller_origin: &str) -> Result<(), FirewallError> {
        let target = format!("{host}:{port}");
        let op = Operation::new(OperationKind::NetConnect, &target, caller_origin);
        self.engine.enforce(op)?;
        Ok(())
    }

    /// Evaluate an outbound request with its body available for the
    /// credential-pattern scan and the GitHub API sub-evaluator. Callers
    /// should buffer the body up front rather than stream it past this
    /// check — streaming around the scan is a bypass.
    pub fn guarded_request(
        &self,
        host: &str,
        port: u16,
        body: &[u8],
        caller_origin: &str,
    ) -> Result<(), FirewallError> {
        let target = format!("{host}:{port}");
        let op = Operation::new(OperationKind::NetRequest, &target, caller_origin).with_body(body.to_vec());
        self.engine.enforce(op)?;
        Ok(())
    }
}
