//! Resolved engine settings shared across crates.
//!
//! These types represent fully-validated, resolved configuration state.
//! Raw TOML deserialization structs (with `Option` fields) stay private in
//! `fairkeep-config`. The config loader resolves them into these types at
//! the parse boundary.
//!
//! Existence of a value is the proof of its validity.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("handoff.stale_after_ms ({stale_ms}) must not be shorter than handoff.timeout_ms ({timeout_ms})")]
    StaleBeforeTimeout { stale_ms: u64, timeout_ms: u64 },
}

fn non_zero<T: PartialEq + Default>(value: T, field: &'static str) -> Result<T, SettingsError> {
    if value == T::default() {
        Err(SettingsError::Zero { field })
    } else {
        Ok(value)
    }
}

/// Periodic claim aging.
///
/// Invariant: `interval_ticks > 0`. Zero seconds disable the respective pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSettings {
    interval_ticks: u64,
    player_seconds: u32,
    ender_seconds: u32,
}

impl TickSettings {
    pub fn new(
        interval_ticks: u64,
        player_seconds: u32,
        ender_seconds: u32,
    ) -> Result<Self, SettingsError> {
        Ok(Self {
            interval_ticks: non_zero(interval_ticks, "ticking.interval_ticks")?,
            player_seconds,
            ender_seconds,
        })
    }

    /// Simulation ticks between aging passes.
    #[must_use]
    pub const fn interval_ticks(&self) -> u64 {
        self.interval_ticks
    }

    /// Seconds added to claims in online players' main containers per pass.
    #[must_use]
    pub const fn player_seconds(&self) -> u32 {
        self.player_seconds
    }

    /// Seconds added to claims in ender storage per pass.
    #[must_use]
    pub const fn ender_seconds(&self) -> u32 {
        self.ender_seconds
    }
}

impl Default for TickSettings {
    fn default() -> Self {
        Self {
            interval_ticks: 20,
            player_seconds: 1,
            ender_seconds: 10,
        }
    }
}

/// Drop-provenance handoff between the click handler and the spawn handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandoffSettings {
    timeout: Duration,
    fallback_delay_ticks: u64,
    stale_after: Duration,
}

impl HandoffSettings {
    pub fn new(
        timeout_ms: u64,
        fallback_delay_ticks: u64,
        stale_after_ms: u64,
    ) -> Result<Self, SettingsError> {
        let timeout_ms = non_zero(timeout_ms, "handoff.timeout_ms")?;
        let stale_after_ms = non_zero(stale_after_ms, "handoff.stale_after_ms")?;
        if stale_after_ms < timeout_ms {
            return Err(SettingsError::StaleBeforeTimeout {
                stale_ms: stale_after_ms,
                timeout_ms,
            });
        }
        Ok(Self {
            timeout: Duration::from_millis(timeout_ms),
            fallback_delay_ticks,
            stale_after: Duration::from_millis(stale_after_ms),
        })
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub const fn fallback_delay_ticks(&self) -> u64 {
        self.fallback_delay_ticks
    }

    /// Published partitions older than this are discarded by the waiter.
    #[must_use]
    pub const fn stale_after(&self) -> Duration {
        self.stale_after
    }
}

impl Default for HandoffSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(100),
            fallback_delay_ticks: 2,
            stale_after: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineSettings {
    pub ticking: TickSettings,
    pub handoff: HandoffSettings,
}
