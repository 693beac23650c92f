//! Engine configuration loaded from environment variables.

use std::time::Duration;

/// Hours assumed for a hanger with no estimate.
pub const DEFAULT_HANGER_HOURS: f64 = 2.0;
/// Crew size assumed when a team declares fewer members than this.
pub const DEFAULT_CREW_SIZE: usize = 3;
/// Labor-hours one member contributes per day.
pub const HOURS_PER_MEMBER: f64 = 8.0;
/// Upper bound on a single inventory shortage lookup.
pub const DEFAULT_SHORTAGE_TIMEOUT: Duration = Duration::from_millis(250);

/// Tunables shared by the capacity calculator and the assignment engine.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Estimate used for hangers without `est_hours` (from CREWCAP_DEFAULT_HANGER_HOURS)
    pub default_hanger_hours: f64,
    /// Minimum headcount used for capacity (from CREWCAP_DEFAULT_CREW_SIZE)
    pub default_crew_size: usize,
    /// Hours per member per day (from CREWCAP_HOURS_PER_MEMBER)
    pub hours_per_member: f64,
    /// Shortage lookup timeout (from CREWCAP_SHORTAGE_TIMEOUT_MS)
    pub shortage_timeout: Duration,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Missing or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let default_hanger_hours = lookup("CREWCAP_DEFAULT_HANGER_HOURS")
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|h| h.is_finite() && *h >= 0.0)
            .unwrap_or(defaults.default_hanger_hours);

        let default_crew_size = lookup("CREWCAP_DEFAULT_CREW_SIZE")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(defaults.default_crew_size);

        let hours_per_member = lookup("CREWCAP_HOURS_PER_MEMBER")
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|h| h.is_finite() && *h >= 0.0)
            .unwrap_or(defaults.hours_per_member);

        let shortage_timeout = lookup("CREWCAP_SHORTAGE_TIMEOUT_MS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.shortage_timeout);

        Self {
            default_hanger_hours,
            default_crew_size,
            hours_per_member,
            shortage_timeout,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_hanger_hours: DEFAULT_HANGER_HOURS,
            default_crew_size: DEFAULT_CREW_SIZE,
            hours_per_member: HOURS_PER_MEMBER,
            shortage_timeout: DEFAULT_SHORTAGE_TIMEOUT,
        }
    }
}
