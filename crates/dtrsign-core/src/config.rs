/// Engine configuration, built once at startup and passed by reference.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on invocations signing at the same time.
    pub max_concurrent_signings: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_signings: 4,
        }
    }
}

impl EngineConfig {
    /// Read configuration from the environment, falling back to the
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let max_concurrent_signings = std::env::var("DTRSIGN_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&n| n > 0)
            .unwrap_or(defaults.max_concurrent_signings);
        Self {
            max_concurrent_signings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_allows_a_small_pool() {
        assert_eq!(EngineConfig::default().max_concurrent_signings, 4);
    }
}
