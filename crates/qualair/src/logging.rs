//! Logging configuration for qualair.
//!
//! Sets up the tracing subscriber shared by the dashboard server and the
//! command-line tools. Dependencies (hyper, axum) stay at `warn` unless
//! `RUST_LOG` says otherwise.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Startup, shutdown and degraded queries.
    #[default]
    Normal,
    /// Also request parameters and row counts.
    Verbose,
    /// Everything, including skipped measurement values.
    Trace,
}

impl Verbosity {
    /// The filter directive used when `RUST_LOG` is not set.
    #[must_use]
    pub fn default_directive(self) -> String {
        let (deps, own) = match self {
            Self::Quiet => ("error", "error"),
            Self::Normal => ("warn", "info"),
            Self::Verbose => ("warn", "debug"),
            Self::Trace => ("warn", "trace"),
        };
        format!("{deps},qualair={own}")
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG`, when set and valid, replaces the directive derived from
/// `verbosity`. Calling this twice leaves the first subscriber in place.
///
/// # Examples
///
/// ```no_run
/// use qualair::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.default_directive()));

    // Module targets only help once debug output is on
    let detailed = matches!(verbosity, Verbosity::Verbose | Verbosity::Trace);
    let layer = fmt::layer()
        .with_target(detailed)
        .with_line_number(verbosity == Verbosity::Trace);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_default() {
        assert_eq!(Verbosity::default(), Verbosity::Normal);
    }

    #[test]
    fn test_default_directive() {
        assert_eq!(Verbosity::Normal.default_directive(), "warn,qualair=info");
        assert_eq!(Verbosity::Verbose.default_directive(), "warn,qualair=debug");
        assert_eq!(Verbosity::Quiet.default_directive(), "error,qualair=error");
        assert_eq!(Verbosity::Trace.default_directive(), "warn,qualair=trace");
    }

    #[test]
    fn test_default_directive_parses() {
        for verbosity in [
            Verbosity::Quiet,
            Verbosity::Normal,
            Verbosity::Verbose,
            Verbosity::Trace,
        ] {
            assert!(EnvFilter::try_new(verbosity.default_directive()).is_ok());
        }
    }

    #[test]
    fn test_init_logging_twice_does_not_panic() {
        init_logging(Verbosity::Quiet);
        init_logging(Verbosity::Trace);
    }
}
