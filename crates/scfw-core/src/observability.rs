//! Tracing bootstrap: one global subscriber, installed once, driven by
//! `ObservabilityConfig`. Suppressing console output in `quiet` mode never
//! suppresses the audit record — that is a property of the audit sink, not
//! of this subscriber.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

use crate::config::ObservabilityConfig;

static INIT: OnceLock<()> = OnceLock::new();

/// Install the global `tracing` subscriber. Idempotent: later calls are
/// no-ops so library consumers that initialize more than once don't panic
/// on a double `set_global_default`.
pub fn init(cfg: &ObservabilityConfig) {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_new(&cfg.log_level)
            .unwrap_or_else(|_| EnvFilter::new("scfw=info"));

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false);

        if cfg.quiet {
            let builder = builder.with_writer(std::io::sink);
            if cfg.log_json {
                let _ = builder.json().try_init();
            } else {
                let _ = builder.try_init();
            }
        } else if cfg.log_json {
            let _ = builder.json().try_init();
        } else {
            let _ = builder.try_init();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let cfg = ObservabilityConfig {
            quiet: true,
            log_level: "scfw=warn".to_string(),
            log_json: false,
        };
        init(&cfg);
        init(&cfg);
    }
}
