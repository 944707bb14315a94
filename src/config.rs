use std::time::Duration;

/// Tunables for the engine's ambient policies.
///
/// The only policy with a knob today is the day-end pruner (§4.6): the
/// cutoff is a local civil time, defaulting to 16:00:00, that the spec
/// calls out as "should be configurable even if the spec fixes 16:00 local
/// as the default."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Hour of day (0-23, local time) at which GoodForDay orders are pruned.
    pub cutoff_hour: u32,
    /// Minute of hour (0-59) at which GoodForDay orders are pruned.
    pub cutoff_minute: u32,
    /// Extra wait added past the cutoff so the pruner never wakes an
    /// instant early due to clock rounding.
    pub cutoff_slack: Duration,
    /// Whether the background pruner thread should run at all. Disabling
    /// this is mainly useful for tests that want full control over when
    /// GoodForDay orders get cancelled.
    pub prune_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cutoff_hour: 16,
            cutoff_minute: 0,
            cutoff_slack: Duration::from_millis(100),
            prune_enabled: true,
        }
    }
}
