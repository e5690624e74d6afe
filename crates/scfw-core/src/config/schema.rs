//! The `Config` value: the engine's policy, grouped by domain.
//!
//! `Config` is constructed once at engine initialize (`Config::load`) and is
//! immutable afterward — every field here is read-only data, never mutated
//! by interceptors or the evaluator.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::loader::{env_bool, env_optional, env_or};
use crate::config::env_keys;

/// Top-level enforcement mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Enabled,
    Strict,
    AlertOnly,
    Silent,
    Interactive,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Enabled
    }
}

impl Mode {
    fn from_env_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "enabled" => Some(Mode::Enabled),
            "strict" => Some(Mode::Strict),
            "alert_only" | "alert-only" => Some(Mode::AlertOnly),
            "silent" => Some(Mode::Silent),
            "interactive" => Some(Mode::Interactive),
            _ => None,
        }
    }
}

/// Severity attached to a deny rule or scan finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// A pattern with an attached severity, used for command and module-scan rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverePattern {
    pub pattern: String,
    #[serde(default = "default_high")]
    pub severity: Severity,
    #[serde(default)]
    pub tag: String,
}

fn default_high() -> Severity {
    Severity::High
}

/// Overlay `overlay` onto `base` in place: objects merge key-by-key
/// (recursively), arrays union their elements (baseline entries plus any
/// new ones from the overlay, no duplicates), everything else is replaced.
/// Used to layer a policy file over the compiled-in baseline without ever
/// dropping the baseline's deny-floor entries for a key the file doesn't
/// mention — or appending to, rather than discarding, one it does.
fn merge_json(base: &mut serde_json::Value, overlay: &serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(overlay_map)) => {
            for (key, overlay_val) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_val) => merge_json(base_val, overlay_val),
                    None => {
                        base_map.insert(key.clone(), overlay_val.clone());
                    }
                }
            }
        }
        (serde_json::Value::Array(base_arr), serde_json::Value::Array(overlay_arr)) => {
            for item in overlay_arr {
                if !base_arr.contains(item) {
                    base_arr.push(item.clone());
                }
            }
        }
        (base_slot, overlay_val) => {
            *base_slot = overlay_val.clone();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FilesystemPolicy {
    #[serde(default)]
    pub blocked_read_paths: Vec<String>,
    #[serde(default)]
    pub blocked_write_paths: Vec<String>,
    #[serde(default)]
    pub blocked_extensions: Vec<String>,
    #[serde(default)]
    pub allowed_paths: Vec<String>,
    /// The engine's own audit/report paths — self-protected.
    #[serde(default)]
    pub output_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetworkPolicy {
    #[serde(default)]
    pub blocked_domains: Vec<String>,
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    #[serde(default)]
    pub suspicious_ports: Vec<u16>,
    #[serde(default)]
    pub credential_patterns: Vec<String>,
    #[serde(default = "default_true")]
    pub localhost_allowed: bool,
    #[serde(default)]
    pub private_nets_allowed: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CommandsPolicy {
    #[serde(default)]
    pub blocked_patterns: Vec<SeverePattern>,
    #[serde(default)]
    pub allowed_commands: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EnvironmentPolicy {
    #[serde(default)]
    pub protected_variables: Vec<String>,
    #[serde(default)]
    pub allow_trusted_modules_access: bool,
}

/// Capability grant for one caller-origin module id.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModuleException {
    #[serde(default)]
    pub allow_filesystem: bool,
    #[serde(default)]
    pub allow_network: bool,
    #[serde(default)]
    pub allow_commands: bool,
    #[serde(default)]
    pub allowed_paths: Vec<String>,
    #[serde(default)]
    pub allowed_hosts: Vec<String>,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExceptionsPolicy {
    #[serde(default)]
    pub modules: HashMap<String, ModuleException>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehavioralPolicy {
    #[serde(default = "default_max_reads")]
    pub max_file_reads: u64,
    #[serde(default = "default_max_writes")]
    pub max_file_writes: u64,
    #[serde(default = "default_max_net")]
    pub max_network_requests: u64,
    #[serde(default = "default_max_spawns")]
    pub max_process_spawns: u64,
    #[serde(default)]
    pub alert_thresholds: HashMap<String, u64>,
    #[serde(default = "default_true")]
    pub monitor_lifecycle_scripts: bool,
}

fn default_max_reads() -> u64 {
    5_000
}
fn default_max_writes() -> u64 {
    500
}
fn default_max_net() -> u64 {
    200
}
fn default_max_spawns() -> u64 {
    50
}

impl Default for BehavioralPolicy {
    fn default() -> Self {
        Self {
            max_file_reads: default_max_reads(),
            max_file_writes: default_max_writes(),
            max_network_requests: default_max_net(),
            max_process_spawns: default_max_spawns(),
            alert_thresholds: HashMap::new(),
            monitor_lifecycle_scripts: true,
        }
    }
}

/// Install-mode counter multipliers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InstallModeMultipliers {
    pub reads: u64,
    pub writes: u64,
    pub spawns: u64,
    pub network: u64,
}

impl Default for InstallModeMultipliers {
    fn default() -> Self {
        Self {
            reads: 100,
            writes: 100,
            spawns: 20,
            network: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GithubApiPolicy {
    #[serde(default = "default_github_host")]
    pub api_host: String,
    #[serde(default)]
    pub blocked_repo_names: Vec<String>,
    #[serde(default)]
    pub blocked_workflow_patterns: Vec<String>,
    #[serde(default)]
    pub monitor_repo_creation: bool,
    #[serde(default)]
    pub monitor_workflow_creation: bool,
}

fn default_github_host() -> String {
    "api.github.com".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModuleScanPolicy {
    #[serde(default)]
    pub malicious_patterns: Vec<SeverePattern>,
}

/// The full, immutable policy consulted by the evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub filesystem: FilesystemPolicy,
    #[serde(default)]
    pub network: NetworkPolicy,
    #[serde(default)]
    pub commands: CommandsPolicy,
    #[serde(default)]
    pub environment: EnvironmentPolicy,
    #[serde(default)]
    pub exceptions: ExceptionsPolicy,
    #[serde(default)]
    pub trusted_modules: Vec<String>,
    #[serde(default)]
    pub behavioral: BehavioralPolicy,
    #[serde(default)]
    pub install_mode_multipliers: InstallModeMultipliers,
    #[serde(default)]
    pub github_api: GithubApiPolicy,
    #[serde(default)]
    pub module_scan: ModuleScanPolicy,
    /// Path to the audit log sink; the engine always writes one.
    #[serde(default)]
    pub audit_log_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            filesystem: FilesystemPolicy::default(),
            network: NetworkPolicy::default(),
            commands: CommandsPolicy::default(),
            environment: EnvironmentPolicy::default(),
            exceptions: ExceptionsPolicy::default(),
            trusted_modules: Vec::new(),
            behavioral: BehavioralPolicy::default(),
            install_mode_multipliers: InstallModeMultipliers::default(),
            github_api: GithubApiPolicy::default(),
            module_scan: ModuleScanPolicy::default(),
            audit_log_path: None,
        }
    }
}

impl Config {
    /// The compiled-in deny floor: applied even if no file loads and no env
    /// var is set. Fail-closed by construction.
    pub fn baseline() -> Self {
        let mut cfg = Self::default();
        cfg.environment.protected_variables = vec![
            "GITHUB_TOKEN".to_string(),
            "NPM_TOKEN".to_string(),
            "AWS_SECRET_ACCESS_KEY".to_string(),
            "AWS_ACCESS_KEY_ID".to_string(),
            "OPENAI_API_KEY".to_string(),
            "ANTHROPIC_API_KEY".to_string(),
            "SSH_AUTH_SOCK".to_string(),
        ];
        cfg.filesystem.output_files = vec!["firewall-audit.jsonl".to_string()];
        cfg.network.blocked_domains = vec![
            "pastebin.com".to_string(),
            "transfer.sh".to_string(),
        ];
        cfg.commands.blocked_patterns = vec![
            SeverePattern {
                pattern: r"rm\s+-rf\s+/".to_string(),
                severity: Severity::Critical,
                tag: "rm-rf-root".to_string(),
            },
            SeverePattern {
                pattern: r"(?:^|[\s;|&])(?:/bin/)?(?:ba|z)?sh\s+-i\b".to_string(),
                severity: Severity::Critical,
                tag: "reverse-shell".to_string(),
            },
            SeverePattern {
                pattern: r"curl[^|]*\|\s*(?:ba|z)?sh".to_string(),
                severity: Severity::High,
                tag: "download-and-exec".to_string(),
            },
        ];
        cfg.module_scan.malicious_patterns = vec![
            SeverePattern {
                pattern: r"eval\s*\(\s*atob\s*\(".to_string(),
                severity: Severity::High,
                tag: "base64-eval".to_string(),
            },
            SeverePattern {
                pattern: r"eval\s*\(\s*(?:unescape|decodeURIComponent)\s*\(".to_string(),
                severity: Severity::High,
                tag: "hex-escape-payload".to_string(),
            },
            SeverePattern {
                pattern: r"constructor\s*\.\s*constructor\s*\(\s*[\x27\x22]return\s+process".to_string(),
                severity: Severity::Critical,
                tag: "vm-escape".to_string(),
            },
            SeverePattern {
                pattern: r"process\.binding\s*\(\s*[\x27\x22]natives[\x27\x22]\s*\)".to_string(),
                severity: Severity::Critical,
                tag: "vm-escape".to_string(),
            },
            SeverePattern {
                pattern: r"spawn\s*\(\s*[\x27\x22](?:/bin/)?(?:ba|z)?sh[\x27\x22]\s*,\s*\[\s*[\x27\x22]-i[\x27\x22]".to_string(),
                severity: Severity::Critical,
                tag: "reverse-shell".to_string(),
            },
            SeverePattern {
                pattern: r"https?://[^\s\x27\x22]+\.(?:sh|exe|bin)[^\s\x27\x22]*.*(?:exec|spawn)".to_string(),
                severity: Severity::High,
                tag: "download-and-exec".to_string(),
            },
        ];
        cfg
    }

    /// Load the effective config: baseline, overlaid with an optional JSON
    /// policy file, overlaid with scalar env var overrides.
    ///
    /// Never fails — a missing or malformed file degrades to the baseline
    /// with a single warning rather than an error.
    pub fn load() -> Self {
        let mut cfg = Self::baseline();

        if let Some(path) = env_optional(
            env_keys::FIREWALL_POLICY_FILE,
            env_keys::POLICY_FILE_ALIASES,
        ) {
            match std::fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str::<serde_json::Value>(&content) {
                    Ok(file_value) => {
                        let mut merged = serde_json::to_value(&cfg).expect("Config always serializes");
                        merge_json(&mut merged, &file_value);
                        match serde_json::from_value::<Config>(merged) {
                            Ok(merged_cfg) => cfg = merged_cfg,
                            Err(e) => {
                                tracing::warn!(
                                    "policy file {} does not match the config schema: {} — falling back to baseline policy",
                                    path, e
                                );
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            "failed to parse policy file {}: {} — falling back to baseline policy",
                            path, e
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        "failed to read policy file {}: {} — falling back to baseline policy",
                        path, e
                    );
                }
            }
        }

        if let Some(mode_str) = env_optional(env_keys::FIREWALL_MODE, env_keys::MODE_ALIASES) {
            if let Some(mode) = Mode::from_env_str(&mode_str) {
                cfg.mode = mode;
            } else {
                tracing::warn!("invalid {}={:?}, keeping configured mode", env_keys::FIREWALL_MODE, mode_str);
            }
        }

        let audit_log = env_optional(
            env_keys::observability::FIREWALL_AUDIT_LOG,
            env_keys::observability::AUDIT_LOG_ALIASES,
        );
        if let Some(path) = audit_log {
            cfg.audit_log_path = Some(path);
        }
        if cfg.audit_log_path.is_none() {
            cfg.audit_log_path = Some("firewall-audit.jsonl".to_string());
        }
        if let Some(ref path) = cfg.audit_log_path {
            if !cfg.filesystem.output_files.iter().any(|p| p == path) {
                cfg.filesystem.output_files.push(path.clone());
            }
        }

        cfg
    }

    /// Whether `mode` is one of the alert-only/silent demotion modes.
    pub fn demotes_block_to_warn(&self) -> bool {
        matches!(self.mode, Mode::AlertOnly)
    }

    pub fn promotes_warn_to_block(&self) -> bool {
        matches!(self.mode, Mode::Strict)
    }

    pub fn is_silent(&self) -> bool {
        matches!(self.mode, Mode::Silent)
    }
}

/// Observability knobs: console verbosity/format, independent of policy.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
}

impl ObservabilityConfig {
    pub fn from_env() -> Self {
        use env_keys::observability as keys;
        Self {
            quiet: env_bool(keys::FIREWALL_QUIET, keys::QUIET_ALIASES, false),
            log_level: env_or(keys::FIREWALL_LOG_LEVEL, keys::LOG_LEVEL_ALIASES, || {
                "scfw=info".to_string()
            }),
            log_json: env_bool(keys::FIREWALL_LOG_JSON, keys::LOG_JSON_ALIASES, false),
        }
    }
}
