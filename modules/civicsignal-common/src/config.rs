use std::env;

/// Engine tuning knobs loaded from environment variables. Every knob has a
/// sensible default, so `Config::default()` is enough for tests and
/// embedded use.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bounded retry count for optimistic commits before a conflict
    /// surfaces to the caller.
    pub commit_retries: u32,

    /// Radius applied to a near-query that doesn't specify one, in km.
    pub default_radius_km: f64,

    /// Upper bound on a caller-supplied page size.
    pub max_page_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            commit_retries: 8,
            default_radius_km: 10.0,
            max_page_size: 100,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to the
    /// defaults. Panics with a clear message on malformed values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            commit_retries: parsed_env("CIVICSIGNAL_COMMIT_RETRIES", defaults.commit_retries),
            default_radius_km: parsed_env(
                "CIVICSIGNAL_DEFAULT_RADIUS_KM",
                defaults.default_radius_km,
            ),
            max_page_size: parsed_env("CIVICSIGNAL_MAX_PAGE_SIZE", defaults.max_page_size),
        }
    }
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a number, got {raw:?}")),
        Err(_) => default,
    }
}
