//! Tracing setup shared by LazyGym front-ends.
//!
//! Command output goes to stdout, so log lines always go to stderr. The
//! default filter applies the requested level to the lazygym crates only and
//! keeps dependencies at `warn`; `RUST_LOG` replaces it entirely.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crates whose events follow the requested level
const OWN_CRATES: [&str; 2] = ["lazygym_core", "lazygym"];

/// Install the stderr subscriber at `warn`
pub fn init() {
    init_with_level("warn")
}

/// Install the stderr subscriber with `default_level` for the lazygym crates
///
/// Calling this a second time, or after another subscriber was installed,
/// leaves the existing one in place.
pub fn init_with_level(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(default_level)));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .try_init();
    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

/// Filter directives used when `RUST_LOG` is unset
fn default_directives(level: &str) -> String {
    std::iter::once("warn".to_string())
        .chain(OWN_CRATES.iter().map(|krate| format!("{}={}", krate, level)))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new(default_directives("debug")))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_scope_level_to_own_crates() {
        assert_eq!(
            default_directives("debug"),
            "warn,lazygym_core=debug,lazygym=debug"
        );
    }

    #[test]
    fn test_init_twice_does_not_panic() {
        init_test();
        init_with_level("info");
        init();
    }
}
