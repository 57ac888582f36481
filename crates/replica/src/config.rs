use std::time::Duration;

pub const RESYNC_TIMEOUT_ENV: &str = "DOM_MIRROR_RESYNC_TIMEOUT_MS";

const DEFAULT_RESYNC_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplicaConfig {
    /// How long a resync waits for the primary to answer.
    pub resync_timeout: Duration,
}

impl Default for ReplicaConfig {
    fn default() -> Self {
        Self {
            resync_timeout: DEFAULT_RESYNC_TIMEOUT,
        }
    }
}

impl ReplicaConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup(RESYNC_TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => config.resync_timeout = Duration::from_millis(ms),
                _ => log::warn!(
                    target: "mirror.resync",
                    "ignoring {RESYNC_TIMEOUT_ENV}={raw:?}: expected a positive number of milliseconds"
                ),
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_comes_from_lookup() {
        let config = ReplicaConfig::from_lookup(|key| {
            (key == RESYNC_TIMEOUT_ENV).then(|| "250".to_string())
        });
        assert_eq!(config.resync_timeout, Duration::from_millis(250));
    }

    #[test]
    fn invalid_values_keep_the_default() {
        for raw in ["", "soon", "0"] {
            let config = ReplicaConfig::from_lookup(|_| Some(raw.to_string()));
            assert_eq!(config, ReplicaConfig::default());
        }
    }
}
