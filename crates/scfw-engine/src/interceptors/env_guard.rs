//! Environment guard. Presents a filtered view of the process
//! environment so protected variables never leak into dependency code that
//! was never granted trusted-module access, and routes individual reads
//! through the evaluator so the behavior accountant and audit log see them.

use std::collections::HashMap;

use scfw_core::error::FirewallError;

use crate::engine::Engine;
use crate::operation::{Operation, OperationKind};

pub struct EnvGuard<'e> {
    engine: &'e Engine,
}

impl<'e> EnvGuard<'e> {
    pub fn new(engine: &'e Engine) -> Self {
        Self { engine }
    }

    /// Evaluate a single named read, e.g. `process.env.GITHUB_TOKEN`.
    /// Returns the value on `Allow`/`Warn`, `Err` on `Block`.
    pub fn guarded_read(&self, name: &str, raw_env: &HashMap<String, String>, caller_origin: &str) -> Result<Option<String>, FirewallError> {
        let op = Operation::new(OperationKind::EnvRead, name, caller_origin);
        self.engine.enforce(op)?;
        Ok(raw_env.get(name).cloned())
    }

    /// A filtered snapshot of the full environment for code that enumerates
    /// rather than reads by name (`Object.keys(process.env)`-equivalent).
    /// In `Mode::Strict` protected variables are removed entirely; in the
    /// default modes they are replaced with a dummy value so enumeration
    /// shape (key presence) doesn't change behavior of code that merely
    /// checks whether a variable is set, while the value itself stays
    /// hidden.
    pub fn filtered_view(&self, raw_env: &HashMap<String, String>, caller_origin: &str) -> HashMap<String, String> {
        let config = &self.engine.config;
        let trusted = config.trusted_modules.iter().any(|m| m == caller_origin)
            || config.environment.allow_trusted_modules_access;
        if trusted {
            return raw_env.clone();
        }

        let strict = config.mode == scfw_core::config::Mode::Strict;
        raw_env
            .iter()
            .filter_map(|(name, value)| {
                let protected = config.environment.protected_variables.iter().any(|p| p == name);
                if !protected {
                    Some((name.clone(), value.clone()))
                } else if strict {
                    None
                } else {
                    Some((name.clone(), "<redacted-by-firewall>".to_string()))
                }
            })
            .collect()
    }
}
