//! Process interceptor. Normalizes every spawn into a command
//! string, strips protected environment variables from the child
//! unconditionally, and routes the canonical command through the evaluator
//! before the child is started.

use std::collections::HashMap;
use std::process::{Command, Output};

use scfw_core::error::FirewallError;

use crate::command;
use crate::engine::Engine;
use crate::operation::{Operation, OperationKind};

/// Native build tools that cannot host the engine if re-injected into via a
/// `NODE_OPTIONS`-style variable — stripped from the child env even though
/// they are not in `protected_variables`.
const REINJECTION_SENSITIVE_TOOLS: &[&str] = &["node-gyp", "cc", "gcc", "clang", "cargo", "rustc"];

/// A re-injection variable name to strip when spawning one of
/// `REINJECTION_SENSITIVE_TOOLS` — a single configured name, following
/// the `NODE_OPTIONS` case that motivates this.
const REINJECTION_VARIABLE: &str = "NODE_OPTIONS";

pub struct ProcessGuard<'e> {
    engine: &'e Engine,
}

impl<'e> ProcessGuard<'e> {
    pub fn new(engine: &'e Engine) -> Self {
        Self { engine }
    }

    /// Spawn `command_line` (a full shell-style command string, e.g. `"npm
    /// install left-pad"`), with `parent_env` filtered before the child
    /// inherits it. On `Block`, the child is never started.
    pub fn guarded_spawn(
        &self,
        command_line: &str,
        parent_env: &HashMap<String, String>,
        caller_origin: &str,
    ) -> Result<Output, FirewallError> {
        let op = Operation::new(OperationKind::ProcessSpawn, command_line, caller_origin);
        self.engine.enforce(op)?;

        let argv = command::split_argv(command_line);
        let Some(executable) = argv.first() else {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command line").into());
        };

        let filtered_env = self.filtered_child_env(executable, parent_env);

        let output = Command::new(executable)
            .args(&argv[1..])
            .env_clear()
            .envs(&filtered_env)
            .output()?;
        Ok(output)
    }

    /// The environment a child of `executable` should inherit: every
    /// `protected_variables` name removed unconditionally, plus `NODE_OPTIONS`-style re-injection variables stripped when
    /// the target executable is a native build tool that cannot host the
    /// engine.
    fn filtered_child_env(&self, executable: &str, parent_env: &HashMap<String, String>) -> HashMap<String, String> {
        let base_name = executable.rsplit(['/', '\\']).next().unwrap_or(executable);
        let strip_reinjection = REINJECTION_SENSITIVE_TOOLS.iter().any(|t| base_name.eq_ignore_ascii_case(t));

        parent_env
            .iter()
            .filter(|(name, _)| !self.engine.config.environment.protected_variables.iter().any(|p| p == *name))
            .filter(|(name, _)| !(strip_reinjection && name.as_str() == REINJECTION_VARIABLE))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scfw_core::config::Config;
    use scfw_core::context::ProcessContext;
    use scfw_core::AuditLog;
    use crate::accountant::Counters;
    use crate::compiled::CompiledPolicy;
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex;

    fn test_engine(dir: &std::path::Path) -> Engine {
        let audit_path = dir.join("audit.jsonl");
        let mut config = Config::baseline();
        config.audit_log_path = Some(audit_path.to_str().unwrap().to_string());
        Engine {
            compiled: CompiledPolicy::from_config(&config, dir),
            context: ProcessContext::detect_in(dir),
            counters: Counters::new(),
            audit: AuditLog::open(&audit_path).unwrap(),
            config,
            ready: AtomicBool::new(true),
            blocks_by_kind: Mutex::new(std::collections::HashMap::new()),
        }
    }

    #[test]
    fn blocked_command_pattern_prevents_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(dir.path());
        let guard = ProcessGuard::new(&engine);
        let result = guard.guarded_spawn("rm -rf /", &HashMap::new(), "user-code");
        assert!(result.is_err());
    }

    #[test]
    fn protected_env_vars_are_stripped_from_child() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(dir.path());
        let guard = ProcessGuard::new(&engine);
        let mut parent_env = HashMap::new();
        parent_env.insert("GITHUB_TOKEN".to_string(), "xyz".to_string());
        parent_env.insert("PATH".to_string(), "/usr/bin".to_string());

        let filtered = guard.filtered_child_env("node", &parent_env);
        assert!(!filtered.contains_key("GITHUB_TOKEN"));
        assert!(filtered.contains_key("PATH"));
    }

    #[test]
    fn node_options_stripped_for_native_build_tools() {
        let dir = tempfile::tempdir().unwrap();
        let engine = test_engine(dir.path());
        let guard = ProcessGuard::new(&engine);
        let mut parent_env = HashMap::new();
        parent_env.insert("NODE_OPTIONS".to_string(), "--require=/tmp/evil.js".to_string());

        let filtered = guard.filtered_child_env("cargo", &parent_env);
        assert!(!filtered.contains_key("NODE_OPTIONS"));

        let filtered_node = guard.filtered_child_env("node", &parent_env);
        assert!(filtered_node.contains_key("NODE_OPTIONS"));
    }

    #[test]
    fn allowed_command_is_permitted() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::baseline();
        let audit_path = dir.path().join("audit.jsonl");
        config.audit_log_path = Some(audit_path.to_str().unwrap().to_string());
        config.commands.allowed_commands = vec!["echo".to_string()];
        let engine = Engine {
            compiled: CompiledPolicy::from_config(&config, dir.path()),
            context: ProcessContext::detect_in(dir.path()),
            counters: Counters::new(),
            audit: AuditLog::open(&audit_path).unwrap(),
            config,
            ready: AtomicBool::new(true),
            blocks_by_kind: Mutex::new(std::collections::HashMap::new()),
        };
        let guard = ProcessGuard::new(&engine);
        let result = guard.guarded_spawn("echo hello", &HashMap::new(), "user-code");
        assert!(result.is_ok());
    }
}
