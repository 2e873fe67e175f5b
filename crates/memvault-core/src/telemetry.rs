//! Tracing initialisation for memvault binaries.
//!
//! Call [`init_tracing`] once at program start. The library itself only
//! emits through `tracing` macros and never installs a subscriber.
//!
//! Filter precedence: `MEMVAULT_LOG`, then `RUST_LOG`, then the `level`
//! passed in. The fallback applies `level` to memvault's own crates and keeps
//! dependencies at `warn`.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding a memvault-specific filter directive.
pub const LOG_ENV: &str = "MEMVAULT_LOG";

const OWN_TARGETS: [&str; 3] = ["memvault_core", "memvault_state", "memvault"];

/// Directive string used when neither `MEMVAULT_LOG` nor `RUST_LOG` is set.
pub fn default_directives(level: Level) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(
        OWN_TARGETS
            .iter()
            .map(|target| format!("{target}={}", level.as_str().to_lowercase())),
    );
    directives.join(",")
}

fn build_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// Install the global subscriber, writing to stderr so command output on
/// stdout stays machine-readable. `json` switches to newline-delimited JSON.
///
/// Only the first call in a process takes effect.
pub fn init_tracing(json: bool, level: Level) {
    let stderr = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(build_filter(level));

    let installed = if json {
        registry.with(stderr.json()).try_init()
    } else {
        registry.with(stderr).try_init()
    };
    if installed.is_ok() {
        tracing::debug!(json, level = %level, "tracing initialised");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_scope_level_to_own_crates() {
        assert_eq!(
            default_directives(Level::DEBUG),
            "warn,memvault_core=debug,memvault_state=debug,memvault=debug"
        );
        assert!(EnvFilter::try_new(default_directives(Level::TRACE)).is_ok());
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing(false, Level::WARN);
        init_tracing(true, Level::DEBUG);
        tracing::info!("still logging");
    }
}
