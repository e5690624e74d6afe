//! Process context: signals the evaluator reads but that never change after
//! engine initialize, plus the `Cold -> Ready` startup state machine.

use std::path::Path;

use crate::config::env_keys;

/// Root-manifest filenames used to recognize a package root directory.
const ROOT_MANIFESTS: &[&str] = &["package.json", "pyproject.toml", "Cargo.toml"];

/// Signals computed once at init from the working directory, parent
/// command, and environment markers. Immutable afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessContext {
    pub is_package_manager: bool,
    pub is_root_project: bool,
    pub is_dependency_lifecycle: bool,
    pub lifecycle_event_name: Option<String>,
    pub install_mode: bool,
}

impl ProcessContext {
    /// Compute context from the environment and the process's working
    /// directory. Never fails: absent signals default to `false`/`None`.
    pub fn detect() -> Self {
        Self::detect_in(&std::env::current_dir().unwrap_or_else(|_| ".".into()))
    }

    pub fn detect_in(cwd: &Path) -> Self {
        let install_mode = std::env::var(env_keys::FIREWALL_INSTALL_MODE)
            .map(|v| !matches!(v.trim(), "" | "0" | "false"))
            .unwrap_or(false);

        let lifecycle_event_name = std::env::var(env_keys::lifecycle::NPM_LIFECYCLE_EVENT)
            .ok()
            .filter(|s| !s.is_empty());
        let is_dependency_lifecycle = lifecycle_event_name.is_some();

        let is_package_manager = std::env::var(env_keys::lifecycle::NPM_EXECPATH)
            .map(|s| !s.is_empty())
            .unwrap_or(false)
            || is_dependency_lifecycle;

        let is_root_project = ROOT_MANIFESTS
            .iter()
            .any(|name| cwd.join(name).is_file());

        Self {
            is_package_manager,
            is_root_project,
            is_dependency_lifecycle,
            lifecycle_event_name,
            install_mode,
        }
    }
}

/// Startup state machine. The engine moves forward exactly once per state;
/// any failure moves to `FailClosed`, which is terminal and fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Cold,
    ConfigLoaded,
    ContextComputed,
    InterceptorsInstalled,
    Ready,
    FailClosed,
}

impl EngineState {
    /// The exit code used when the engine terminates the host from
    /// `FailClosed`. Distinct from ordinary host exit codes.
    pub const FAIL_CLOSED_EXIT_CODE: i32 = 78;

    pub fn next(self) -> Self {
        match self {
            EngineState::Cold => EngineState::ConfigLoaded,
            EngineState::ConfigLoaded => EngineState::ContextComputed,
            EngineState::ContextComputed => EngineState::InterceptorsInstalled,
            EngineState::InterceptorsInstalled => EngineState::Ready,
            EngineState::Ready => EngineState::Ready,
            EngineState::FailClosed => EngineState::FailClosed,
        }
    }

    /// Abort the startup sequence: log one diagnostic and terminate the
    /// host with a nonzero, distinct exit code. Does not return.
    pub fn fail_closed(reason: &str) -> ! {
        tracing::error!("engine failed closed during initialize: {}", reason);
        std::process::exit(Self::FAIL_CLOSED_EXIT_CODE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn detects_root_project_from_manifest() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\n").unwrap();
        let ctx = ProcessContext::detect_in(dir.path());
        assert!(ctx.is_root_project);
    }

    #[test]
    fn no_manifest_is_not_root_project() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let ctx = ProcessContext::detect_in(dir.path());
        assert!(!ctx.is_root_project);
    }

    #[test]
    fn lifecycle_event_env_var_sets_dependency_lifecycle() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var(env_keys::lifecycle::NPM_LIFECYCLE_EVENT, "postinstall");
        let dir = tempfile::tempdir().unwrap();
        let ctx = ProcessContext::detect_in(dir.path());
        assert!(ctx.is_dependency_lifecycle);
        assert_eq!(ctx.lifecycle_event_name.as_deref(), Some("postinstall"));
        std::env::remove_var(env_keys::lifecycle::NPM_LIFECYCLE_EVENT);
    }

    #[test]
    fn install_mode_marker_is_read() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var(env_keys::FIREWALL_INSTALL_MODE, "1");
        let ctx = ProcessContext::detect();
        assert!(ctx.install_mode);
        std::env::remove_var(env_keys::FIREWALL_INSTALL_MODE);
    }

    #[test]
    fn state_machine_advances_in_order() {
        let s = EngineState::Cold;
        let s = s.next();
        assert_eq!(s, EngineState::ConfigLoaded);
        let s = s.next();
        assert_eq!(s, EngineState::ContextComputed);
        let s = s.next();
        assert_eq!(s, EngineState::InterceptorsInstalled);
        let s = s.next();
        assert_eq!(s, EngineState::Ready);
        let s = s.next();
        assert_eq!(s, EngineState::Ready);
    }
}
