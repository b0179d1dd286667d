use std::time::Duration;

/// Client-side timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    /// Inactivity window before an edit is saved.
    pub autosave_delay: Duration,
    /// Minimum gap between successful forks.
    pub fork_cooldown: Duration,
    /// How long a success status stays before it fades.
    pub status_fade: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            autosave_delay: Duration::from_secs(1),
            fork_cooldown: Duration::from_secs(10),
            status_fade: Duration::from_secs(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = SyncConfig::default();
        assert_eq!(c.autosave_delay, Duration::from_secs(1));
        assert_eq!(c.fork_cooldown, Duration::from_secs(10));
        assert_eq!(c.status_fade, Duration::from_secs(2));
    }
}
