//! Compiled-in tables: the mandatory critical-deny floor and the offline
//! malicious/typosquat package name database. These are never overridden
//! by config — they are the engine's non-bypassable deny set.

use scfw_core::config::Severity;

/// A critical-deny rule that cannot be relaxed by exceptions, install mode,
/// or `allowed_paths`.
#[derive(Debug, Clone, Copy)]
pub struct MandatoryDenyRule {
    pub path_suffix: &'static str,
    pub description: &'static str,
}

/// Shell/profile configs whose contents can hijack a future interactive
/// shell if overwritten.
pub const MANDATORY_DENY_SHELL_CONFIGS: &[&str] = &[
    ".bashrc",
    ".zshrc",
    ".profile",
    ".bash_profile",
    ".zprofile",
];

pub const MANDATORY_DENY_GIT_CONFIGS: &[&str] = &[".gitconfig", ".git-credentials"];

pub const MANDATORY_DENY_IDE_CONFIGS: &[&str] = &[".vscode/settings.json", ".idea/workspace.xml"];

pub const MANDATORY_DENY_PACKAGE_CONFIGS: &[&str] = &[".npmrc", ".yarnrc", ".pypirc", "pip.conf"];

pub const MANDATORY_DENY_SECURITY_FILES: &[&str] = &[
    ".ssh/id_rsa",
    ".ssh/id_ed25519",
    ".ssh/authorized_keys",
    ".aws/credentials",
    ".gnupg/secring.gpg",
];

pub const MANDATORY_DENY_AGENT_CONFIGS: &[&str] = &[".claude/settings.json", ".codeium/config.json"];

/// Persistence vectors named in the threat model's purpose statement:
/// git hooks (repo-local code that runs on every future commit/push/merge)
/// and macOS launch agents/daemons (code that survives reboot).
pub const MANDATORY_DENY_GIT_HOOKS: &[&str] = &[
    ".git/hooks/pre-commit",
    ".git/hooks/post-commit",
    ".git/hooks/pre-push",
    ".git/hooks/post-checkout",
    ".git/hooks/pre-receive",
];

pub const MANDATORY_DENY_DIRECTORIES: &[&str] = &[".ssh", ".gnupg", ".aws", ".git/hooks", "Library/LaunchAgents"];

/// Build the full rule set, one entry per protected leaf path.
pub fn get_mandatory_deny_rules() -> Vec<MandatoryDenyRule> {
    let groups: &[(&[&str], &str)] = &[
        (MANDATORY_DENY_SHELL_CONFIGS, "shell profile tampering"),
        (MANDATORY_DENY_GIT_CONFIGS, "git credential tampering"),
        (MANDATORY_DENY_IDE_CONFIGS, "IDE config tampering"),
        (MANDATORY_DENY_PACKAGE_CONFIGS, "package manager config tampering"),
        (MANDATORY_DENY_SECURITY_FILES, "key material access"),
        (MANDATORY_DENY_AGENT_CONFIGS, "agent config tampering"),
        (MANDATORY_DENY_GIT_HOOKS, "git hook persistence"),
    ];
    groups
        .iter()
        .flat_map(|(paths, desc)| paths.iter().map(move |p| MandatoryDenyRule {
            path_suffix: p,
            description: desc,
        }))
        .collect()
}

/// Whether `path` (already canonicalized/home-expanded by the caller)
/// matches a mandatory critical-deny rule. Returns the matching
/// description for the audit reason.
pub fn mandatory_deny_match(path: &str) -> Option<&'static str> {
    let normalized = path.replace('\\', "/");
    for rule in get_mandatory_deny_rules() {
        if normalized.ends_with(rule.path_suffix) {
            return Some(rule.description);
        }
    }
    for dir in MANDATORY_DENY_DIRECTORIES {
        let needle = format!("/{}/", dir);
        if normalized.contains(&needle) || normalized.ends_with(&format!("/{}", dir)) {
            return Some("protected directory access");
        }
    }
    None
}

/// A hit against the offline malicious/typosquat package database.
#[derive(Debug, Clone, Copy)]
pub struct MaliciousPackageHit {
    pub name: &'static str,
    pub ecosystem: &'static str,
    pub severity: Severity,
    pub reason: &'static str,
}

/// Sorted (by name) so lookups use binary search. Sort order is verified by
/// `pypi_table_is_sorted` below — keep additions in lexical order.
const MALICIOUS_PYPI: &[(&str, &str)] = &[
    ("colorama2", "typosquat of colorama"),
    ("crypt0", "credential-stealing clone"),
    ("django-south-utils", "abandoned-name malware drop"),
    ("pythonkafka", "typosquat of python-kafka, exfiltrates env"),
    ("reqeusts", "typosquat of requests"),
    ("reqiests", "typosquat of requests"),
    ("setup-tools", "typosquat of setuptools, postinstall dropper"),
    ("urllib", "namespace collision malware"),
];

const MALICIOUS_NPM: &[(&str, &str)] = &[
    ("cross-env.js", "typosquat of cross-env"),
    ("discord.js-selfbot-v14-fix", "credential harvester"),
    ("electorn", "typosquat of electron"),
    ("event-stream", "compromised maintainer release, wallet stealer"),
    ("fabric-js", "typosquat of fabric"),
    ("node-sqlite", "typosquat of node-sqlite3, postinstall exfil"),
    ("noblox.js-proxy", "credential harvester"),
    ("ua-parser-jss", "typosquat of ua-parser-js"),
];

fn lookup(table: &'static [(&'static str, &'static str)], ecosystem: &'static str, name: &str) -> Option<MaliciousPackageHit> {
    table
        .binary_search_by_key(&name, |(n, _)| n)
        .ok()
        .map(|idx| {
            let (n, reason) = table[idx];
            MaliciousPackageHit {
                name: n,
                ecosystem,
                severity: Severity::Critical,
                reason,
            }
        })
}

pub fn check_malicious_pypi(name: &str) -> Option<MaliciousPackageHit> {
    lookup(MALICIOUS_PYPI, "pypi", name)
}

pub fn check_malicious_npm(name: &str) -> Option<MaliciousPackageHit> {
    lookup(MALICIOUS_NPM, "npm", name)
}

/// Checked against both tables; used by the process interceptor when a
/// spawn resolves to a package-manager install subcommand.
pub fn check_malicious_package(name: &str) -> Option<MaliciousPackageHit> {
    check_malicious_pypi(name).or_else(|| check_malicious_npm(name))
}
