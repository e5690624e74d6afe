//! Path and domain matching helpers shared by the evaluator and the
//! network interceptor. Domain precedence (exact > suffix > regex) and the
//! loopback/RFC1918 checks follow the same specificity rule as proxy
//! domain matching; path precedence (longest prefix wins) is the
//! filesystem analogue.

use std::path::{Path, PathBuf};

/// Expand a leading `~` against `$HOME`, then absolutize against `cwd` and
/// lexically resolve `.`/`..` components. Does not touch the filesystem —
/// symlink resolution is a separate, later check.
pub fn canonicalize_lexical(raw: &str, cwd: &Path) -> PathBuf {
    let expanded = if let Some(rest) = raw.strip_prefix("~/") {
        dirs::home_dir()
            .map(|h| h.join(rest))
            .unwrap_or_else(|| PathBuf::from(raw))
    } else if raw == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(raw))
    } else {
        PathBuf::from(raw)
    };

    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };

    let mut out = PathBuf::new();
    for comp in absolute.components() {
        use std::path::Component;
        match comp {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// True if `path` lies under `prefix`, measured in path components so
/// `/etc/foo-bar` is not a false match for prefix `/etc/foo`.
pub fn path_under(path: &Path, prefix: &str) -> bool {
    let prefix_path = PathBuf::from(prefix);
    let prefix_components: Vec<_> = prefix_path.components().collect();
    let path_components: Vec<_> = path.components().collect();
    if prefix_components.len() > path_components.len() {
        return false;
    }
    path_components
        .iter()
        .zip(prefix_components.iter())
        .all(|(a, b)| a == b)
}

/// Longest-prefix match across a rule list. Returns the index of the rule
/// with the most path components, or `None` if nothing matches.
pub fn longest_prefix_match<'a>(path: &Path, prefixes: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    prefixes
        .filter(|p| path_under(path, p))
        .max_by_key(|p| Path::new(p).components().count())
}

/// Hostname match precedence: exact beats suffix (`api.github.com` before
/// `*.github.com`), both case-insensitive.
pub fn domain_matches(host: &str, pattern: &str) -> bool {
    let host = host.to_lowercase();
    let pattern = pattern.to_lowercase();
    if let Some(suffix) = pattern.strip_prefix("*.") {
        host == suffix || host.ends_with(&format!(".{}", suffix))
    } else {
        host == pattern
    }
}

pub fn domain_match_specificity(host: &str, pattern: &str) -> Option<u32> {
    if !domain_matches(host, pattern) {
        return None;
    }
    Some(if pattern.starts_with("*.") { 1 } else { 2 })
}

pub fn best_domain_match<'a>(host: &str, patterns: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    patterns
        .filter_map(|p| domain_match_specificity(host, p).map(|score| (score, p)))
        .max_by_key(|(score, _)| *score)
        .map(|(_, p)| p)
}

pub fn is_loopback_host(host: &str) -> bool {
    host == "localhost" || host == "::1" || host.parse::<std::net::Ipv4Addr>().map(|ip| ip.is_loopback()).unwrap_or(false)
}

pub fn is_private_net_host(host: &str) -> bool {
    host
        .parse::<std::net::Ipv4Addr>()
        .map(|ip| ip.is_private())
        .unwrap_or(false)
}
