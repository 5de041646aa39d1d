//! `tracing` setup for the `phelc` binary.
//!
//! Every event the compiler records sits under the `phelc` target
//! (`phelc::analyzer`, `phelc::codegen`, ...). A requested level only opens
//! up those targets; dependencies stay at `warn`.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Root target shared by all compiler events.
pub const TARGET: &str = "phelc";

const BASE_LEVEL: &str = "warn";

/// Maps a `-v` count to a level for the compiler's targets.
pub fn verbosity_level(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}

/// Builds the filter directive. An explicit `level` is scoped to the
/// compiler's targets; without one `RUST_LOG` is taken verbatim.
pub fn directive(level: Option<&str>, rust_log: Option<&str>) -> String {
    match (level, rust_log) {
        (Some(level), _) if !level.is_empty() => format!("{},{}={}", BASE_LEVEL, TARGET, level),
        (_, Some(env)) if !env.trim().is_empty() => env.to_string(),
        _ => BASE_LEVEL.to_string(),
    }
}

/// Installs the global subscriber once. Logs go to stderr so generated code
/// on stdout stays clean.
pub fn init(level: Option<&str>) {
    INIT.call_once(|| {
        if tracing::dispatcher::has_been_set() {
            return;
        }

        let rust_log = std::env::var("RUST_LOG").ok();
        let directive = directive(level, rust_log.as_deref());
        let filter = EnvFilter::try_new(&directive).unwrap_or_else(|e| {
            eprintln!("warning: ignoring log filter '{}': {}", directive, e);
            EnvFilter::new(BASE_LEVEL)
        });

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .without_time()
            .compact()
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_is_scoped_to_compiler_targets() {
        assert_eq!(directive(Some("debug"), None), "warn,phelc=debug");
        assert_eq!(directive(Some("trace"), Some("info")), "warn,phelc=trace");
    }

    #[test]
    fn rust_log_applies_without_a_level() {
        assert_eq!(directive(None, Some("phelc::codegen=trace")), "phelc::codegen=trace");
        assert_eq!(directive(Some(""), Some("info")), "info");
        assert_eq!(directive(None, Some("  ")), "warn");
        assert_eq!(directive(None, None), "warn");
    }

    #[test]
    fn verbosity_counts() {
        assert_eq!(verbosity_level(0), None);
        assert_eq!(verbosity_level(1), Some("info"));
        assert_eq!(verbosity_level(2), Some("debug"));
        assert_eq!(verbosity_level(5), Some("trace"));
    }
}
