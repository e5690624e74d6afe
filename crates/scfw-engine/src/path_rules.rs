//! Compiled path-deny rules: plain path-prefixes are compared by component,
//! glob patterns (containing `*`/`?`/`**`) are translated to an anchored
//! regex once at compile time, mirroring `ModuleScanner`'s "compile from
//! config once, drop bad entries with a warning" idiom (scanner.rs).

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::matching::{canonicalize_lexical, path_under};

/// One compiled filesystem deny/allow rule, retaining the original string
/// for audit reasons.
pub enum PathRule {
    Prefix { raw: String, prefix: PathBuf },
    Glob { raw: String, regex: Regex },
}

impl PathRule {
    pub fn raw(&self) -> &str {
        match self {
            PathRule::Prefix { raw, .. } => raw,
            PathRule::Glob { raw, .. } => raw,
        }
    }

    /// `path` must already be lexically canonicalized by the caller for
    /// `Prefix` rules; `Glob` rules match against the raw string form since
    /// a glob like `**/.env` is not a filesystem prefix.
    pub fn matches(&self, path: &Path, raw_target: &str) -> bool {
        match self {
            PathRule::Prefix { prefix, .. } => path_under(path, prefix.to_string_lossy().as_ref()),
            PathRule::Glob { regex, .. } => regex.is_match(raw_target),
        }
    }

    /// Specificity used for longest-match tie-breaking: component count for
    /// prefixes, pattern length (minus wildcards) for globs.
    pub fn specificity(&self) -> usize {
        match self {
            PathRule::Prefix { prefix, .. } => prefix.components().count(),
            PathRule::Glob { raw, .. } => raw.chars().filter(|c| *c != '*' && *c != '?').count(),
        }
    }
}

fn is_glob_pattern(raw: &str) -> bool {
    raw.contains('*') || raw.contains('?')
}

/// Translate a shell-style glob (`*`, `?`, `**`) into an anchored regex.
/// `**` matches across path separators, a single `*` does not.
fn glob_to_regex(raw: &str) -> Option<Regex> {
    let mut pattern = String::from("(?s)^");
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    pattern.push_str(".*");
                } else {
                    pattern.push_str("[^/]*");
                }
            }
            '?' => pattern.push('.'),
            _ => pattern.push_str(&regex::escape(&c.to_string())),
        }
    }
    pattern.push('$');
    Regex::new(&pattern).ok()
}

/// Compile one rule list from `Config`, dropping malformed glob patterns
/// with a warning rather than failing the whole policy load.
pub fn compile_rules(raw_patterns: &[String], cwd: &Path) -> Vec<PathRule> {
    raw_patterns
        .iter()
        .filter_map(|raw| {
            if is_glob_pattern(raw) {
                match glob_to_regex(raw) {
                    Some(regex) => Some(PathRule::Glob { raw: raw.clone(), regex }),
                    None => {
                        tracing::warn!("filesystem glob pattern {:?} failed to compile, dropping", raw);
                        None
                    }
                }
            } else {
                Some(PathRule::Prefix {
                    raw: raw.clone(),
                    prefix: canonicalize_lexical(raw, cwd),
                })
            }
        })
        .collect()
}

/// Find the most specific matching rule in `rules` for `canonical_path`
/// (used for deny lists) or `None` if nothing matches.
pub fn best_match<'a>(rules: &'a [PathRule], canonical_path: &Path, raw_target: &str) -> Option<&'a PathRule> {
    rules
        .iter()
        .filter(|r| r.matches(canonical_path, raw_target))
        .max_by_key(|r| r.specificity())
}
