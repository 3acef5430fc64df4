//! Diagnostic logging to stderr.
//!
//! Progress lines go to stdout through [`crate::report::Reporter`]; tracing
//! output stays on stderr so the two never interleave on one stream.

use tracing_subscriber::EnvFilter;

/// How chatty the diagnostic log should be when `RUST_LOG` is unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (true, _) => Self::Verbose,
            (false, true) => Self::Quiet,
            (false, false) => Self::Normal,
        }
    }

    fn default_directives(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "warn,tripdata_scraper=debug,tripdata=debug",
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the flags.
pub fn init(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.default_directives()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
