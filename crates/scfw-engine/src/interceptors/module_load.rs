//! Module-load hook. Scans a dependency's source before it is
//! ever executed and rejects it with `FIREWALL_MODULE_BLOCKED` rather than
//! letting the module run and then cleaning up afterwards.

use scfw_core::error::FirewallError;

use crate::engine::Engine;
use crate::operation::{Operation, OperationKind};

pub struct ModuleLoadGuard<'e> {
    engine: &'e Engine,
}

impl<'e> ModuleLoadGuard<'e> {
    pub fn new(engine: &'e Engine) -> Self {
        Self { engine }
    }

    /// Evaluate `source` (the module's full text, before compilation or
    /// execution) against the scanner and mandatory-deny table. `module_id`
    /// is the specifier/path used for audit attribution, not scanned itself.
    pub fn guarded_load(&self, module_id: &str, source: &[u8], caller_origin: &str) -> Result<(), FirewallError> {
        let op = Operation::new(OperationKind::ModuleLoad, module_id, caller_origin).with_body(source.to_vec());
        self.engine.enforce(op)?;
        Ok(())
    }
}
