use tracing_subscriber::EnvFilter;

/// Workspace crates whose events pass the default filter.
const CRATE_TARGETS: &[&str] = &[
    "qhx",
    "qhx_detect",
    "qhx_hybrid",
    "qhx_io",
    "qhx_stats",
    "qhx_wavelet",
    "qhx_wwz",
];

/// Level for `-v` repeated `verbosity` times; warnings only by default.
fn level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Filter directive enabling `level(verbosity)` for every workspace crate.
fn default_filter(verbosity: u8) -> String {
    let level = level(verbosity);
    CRATE_TARGETS
        .iter()
        .map(|t| format!("{t}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Installs the global subscriber.
///
/// Events go to stderr: `detect` and `superlet` may write their tables to
/// `/dev/stdout`. `RUST_LOG` replaces the verbosity-derived filter.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(level(0), "warn");
        assert_eq!(level(2), "debug");
        assert_eq!(level(9), "trace");
    }

    #[test]
    fn filter_covers_every_crate() {
        let filter = default_filter(1);
        assert_eq!(filter.split(',').count(), CRATE_TARGETS.len());
        assert!(filter.starts_with("qhx=info,"));
        assert!(filter.contains("qhx_wwz=info"));
        assert!(filter.parse::<EnvFilter>().is_ok());
    }
}
