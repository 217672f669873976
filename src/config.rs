//! Wheel configuration.
//!
//! Out-of-range values are never rejected: each field falls back to its
//! default when it is below the enforced minimum.

use std::time::Duration;

/// Smallest accepted tick interval.
pub const MIN_TICK_INTERVAL: Duration = Duration::from_secs(1);
/// Smallest accepted slot count.
pub const MIN_SLOT_COUNT: usize = 10;
/// Slot count used when none (or too few) is configured.
pub const DEFAULT_SLOT_COUNT: usize = 3600;
/// Depth of the add and remove request queues.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Time wheel configuration
///
/// ```
/// use timewheel::WheelConfig;
/// use std::time::Duration;
///
/// let config = WheelConfig::builder()
///     .name("leases")
///     .tick_interval(Duration::from_secs(2))
///     .slot_count(60)
///     .build();
/// assert_eq!(config.slot_count, 60);
///
/// // Below the minimums: clamped, not rejected.
/// let config = WheelConfig::builder().slot_count(4).build();
/// assert_eq!(config.slot_count, 3600);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelConfig {
    /// Instance name for logging
    pub name: String,
    /// How far the pointer moves per slot
    pub tick_interval: Duration,
    /// Number of slots in the ring
    pub slot_count: usize,
    /// Bound of each request queue; full queues block the caller
    pub queue_capacity: usize,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            name: "timewheel".to_string(),
            tick_interval: MIN_TICK_INTERVAL,
            slot_count: DEFAULT_SLOT_COUNT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl WheelConfig {
    pub fn builder() -> WheelConfigBuilder {
        WheelConfigBuilder::default()
    }

    /// Apply the minimums, replacing any value below them with its default.
    pub(crate) fn clamped(mut self) -> Self {
        if self.tick_interval < MIN_TICK_INTERVAL {
            self.tick_interval = MIN_TICK_INTERVAL;
        }
        if self.slot_count < MIN_SLOT_COUNT {
            self.slot_count = DEFAULT_SLOT_COUNT;
        }
        if self.queue_capacity == 0 {
            self.queue_capacity = DEFAULT_QUEUE_CAPACITY;
        }
        self
    }
}

/// Builder for [`WheelConfig`]
#[derive(Debug, Clone, Default)]
pub struct WheelConfigBuilder {
    config: WheelConfig,
}

impl WheelConfigBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.config.tick_interval = interval;
        self
    }

    pub fn slot_count(mut self, count: usize) -> Self {
        self.config.slot_count = count;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Build the configuration, clamping every field to its minimum.
    pub fn build(self) -> WheelConfig {
        self.config.clamped()
    }
}
