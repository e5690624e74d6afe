//! Module-load hook: scans module source against `module_scan.malicious_patterns`
//! plus a supplemental, broader rule table before any module executes.

use regex::Regex;
use scfw_core::config::{Config, Severity};

/// Cap on scanned source length — anything beyond this is truncated
/// before the regex pass, never fed whole into the regex engine.
const MAX_SCAN_BYTES: usize = 512 * 1024;

#[derive(Debug, Clone)]
pub struct ScanFinding {
    pub tag: String,
    pub severity: Severity,
    pub description: String,
}

/// Compiled pattern table. Rebuilt from `Config` once at engine init;
/// compilation failures are dropped with a warning rather than panicking —
/// a malformed user-supplied pattern must not crash the host.
pub struct ModuleScanner {
    rules: Vec<(Regex, String, Severity)>,
}

impl ModuleScanner {
    pub fn from_config(config: &Config) -> Self {
        let mut rules = Vec::new();
        for rule in &config.module_scan.malicious_patterns {
            match Regex::new(&rule.pattern) {
                Ok(re) => rules.push((re, rule.tag.clone(), rule.severity)),
                Err(e) => {
                    tracing::warn!("module_scan pattern {:?} failed to compile: {}", rule.pattern, e);
                }
            }
        }
        rules.extend(supplemental_rules());
        Self { rules }
    }

    /// Scan `source` and return every matching finding, most severe first.
    /// Empty result means the module is clean to execute.
    pub fn scan(&self, source: &str) -> Vec<ScanFinding> {
        let scoped = if source.len() > MAX_SCAN_BYTES {
            &source[..MAX_SCAN_BYTES]
        } else {
            source
        };
        let mut findings: Vec<ScanFinding> = self
            .rules
            .iter()
            .filter(|(re, ..)| re.is_match(scoped))
            .map(|(_, tag, severity)| ScanFinding {
                tag: tag.clone(),
                severity: *severity,
                description: format!("module_scan:{}", tag),
            })
            .collect();
        findings.sort_by(|a, b| b.severity.cmp(&a.severity));
        findings
    }
}

/// Additive detections beyond the five baseline patterns, in the same
/// rule-table idiom: dynamic import, subprocess spawn, and the broader
/// VM-escape family.
fn supplemental_rules() -> Vec<(Regex, String, Severity)> {
    let raw: &[(&str, &str, Severity)] = &[
        (r"__import__\s*\(\s*[\x27\x22]os[\x27\x22]\s*\)", "dynamic-os-import", Severity::Medium),
        (r"require\s*\(\s*[\x27\x22]child_process[\x27\x22]\s*\)", "child-process-require", Severity::Medium),
        (r"subprocess\.(?:Popen|call|run)\s*\(", "subprocess-spawn", Severity::Medium),
        (r"process\.mainModule\s*\.\s*require", "vm-escape", Severity::Critical),
    ];
    raw.iter()
        .filter_map(|(pattern, tag, severity)| {
            Regex::new(pattern)
                .map(|re| (re, tag.to_string(), *severity))
                .ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> ModuleScanner {
        ModuleScanner::from_config(&Config::baseline())
    }

    #[test]
    fn detects_base64_eval() {
        let s = scanner();
        let findings = s.scan("eval(atob(\"Y29uc29sZS5sb2coMSk=\"))");
        assert!(findings.iter().any(|f| f.tag == "base64-eval"));
    }

    #[test]
    fn detects_vm_escape_via_constructor_constructor() {
        let s = scanner();
        let findings = s.scan("x.constructor.constructor('return process')().exit()");
        assert!(findings.iter().any(|f| f.tag == "vm-escape"));
    }

    #[test]
    fn clean_source_has_no_findings() {
        let s = scanner();
        let findings = s.scan("export function add(a, b) { return a + b; }");
        assert!(findings.is_empty());
    }

    #[test]
    fn detects_supplemental_subprocess_spawn() {
        let s = scanner();
        let findings = s.scan("import subprocess\nsubprocess.Popen(['ls'])");
        assert!(findings.iter().any(|f| f.tag == "subprocess-spawn"));
    }

    #[test]
    fn malformed_user_pattern_is_dropped_not_fatal() {
        let mut cfg = Config::baseline();
        cfg.module_scan.malicious_patterns.push(scfw_core::config::SeverePattern {
            pattern: "(unclosed".to_string(),
            severity: Severity::High,
            tag: "broken".to_string(),
        });
        let s = ModuleScanner::from_config(&cfg);
        assert!(s.scan("anything").is_empty());
    }
}
