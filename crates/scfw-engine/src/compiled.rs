//! `CompiledPolicy`: every regex and glob the evaluator consults, compiled
//! exactly once from `Config` at engine initialize. Precompiling here keeps
//! the evaluator itself allocation-light and regex-free per call, and
//! matches the "compile from config once, drop bad entries with a warning"
//! idiom already established by `ModuleScanner` (scanner.rs).

use std::path::Path;

use regex::Regex;

use scfw_core::config::{Config, Severity};

use crate::path_rules::{self, PathRule};
use crate::scanner::ModuleScanner;

/// A compiled command/module pattern with its configured severity and tag.
pub struct SeverePatternRule {
    pub regex: Regex,
    pub severity: Severity,
    pub tag: String,
}

pub struct CompiledPolicy {
    pub allowed_read_paths: Vec<PathRule>,
    pub allowed_write_paths: Vec<PathRule>,
    pub blocked_read_paths: Vec<PathRule>,
    pub blocked_write_paths: Vec<PathRule>,
    pub command_patterns: Vec<SeverePatternRule>,
    pub credential_patterns: Vec<Regex>,
    pub workflow_patterns: Vec<Regex>,
    pub module_scanner: ModuleScanner,
}

fn compile_severe_patterns(raw: &[scfw_core::config::SeverePattern]) -> Vec<SeverePatternRule> {
    raw.iter()
        .filter_map(|p| match Regex::new(&p.pattern) {
            Ok(regex) => Some(SeverePatternRule {
                regex,
                severity: p.severity,
                tag: p.tag.clone(),
            }),
            Err(e) => {
                tracing::warn!("pattern {:?} failed to compile: {}", p.pattern, e);
                None
            }
        })
        .collect()
}

fn compile_plain_patterns(raw: &[String]) -> Vec<Regex> {
    raw.iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(regex) => Some(regex),
            Err(e) => {
                tracing::warn!("pattern {:?} failed to compile: {}", p, e);
                None
            }
        })
        .collect()
}

impl CompiledPolicy {
    pub fn from_config(config: &Config, cwd: &Path) -> Self {
        Self {
            allowed_read_paths: path_rules::compile_rules(&config.filesystem.allowed_paths, cwd),
            allowed_write_paths: path_rules::compile_rules(&config.filesystem.allowed_paths, cwd),
            blocked_read_paths: path_rules::compile_rules(&config.filesystem.blocked_read_paths, cwd),
            blocked_write_paths: path_rules::compile_rules(&config.filesystem.blocked_write_paths, cwd),
            command_patterns: compile_severe_patterns(&config.commands.blocked_patterns),
            credential_patterns: compile_plain_patterns(&config.network.credential_patterns),
            workflow_patterns: compile_plain_patterns(&config.github_api.blocked_workflow_patterns),
            module_scanner: ModuleScanner::from_config(config),
        }
    }
}
