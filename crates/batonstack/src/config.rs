use crate::ConfigError;

/// Largest stack capacity a supervised run can use.
///
/// The shared region reserves this many slots; [`Config::stack_capacity`]
/// limits how many of them the stack accepts.
pub const MAX_STACK_CAPACITY: usize = 4096;

/// Inclusive range a batch size is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRange {
    /// Smallest batch size.
    pub min: usize,
    /// Largest batch size.
    pub max: usize,
}

impl BatchRange {
    /// Creates a range covering `min..=max`.
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    /// Returns true if `n` lies inside the range.
    #[inline]
    pub const fn contains(&self, n: usize) -> bool {
        self.min <= n && n <= self.max
    }
}

impl Default for BatchRange {
    fn default() -> Self {
        Self::new(0, 9)
    }
}

/// Configuration for a supervised producer/consumer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Number of consumer participants (default: 2)
    pub consumer_count: usize,
    /// Number of producer cycles (default: 512)
    pub cycle_limit: usize,
    /// Stack capacity, at most [`MAX_STACK_CAPACITY`] (default: 256)
    pub stack_capacity: usize,
    /// Per-turn batch size range for both roles (default: 0..=9)
    pub batch_range: BatchRange,
}

impl Config {
    /// Creates a new configuration with custom settings.
    pub const fn new(
        consumer_count: usize,
        cycle_limit: usize,
        stack_capacity: usize,
        batch_range: BatchRange,
    ) -> Self {
        Self {
            consumer_count,
            cycle_limit,
            stack_capacity,
            batch_range,
        }
    }

    /// Sets the number of consumers.
    pub fn with_consumer_count(mut self, consumer_count: usize) -> Self {
        self.consumer_count = consumer_count;
        self
    }

    /// Sets the number of producer cycles.
    pub fn with_cycle_limit(mut self, cycle_limit: usize) -> Self {
        self.cycle_limit = cycle_limit;
        self
    }

    /// Sets the stack capacity.
    pub fn with_stack_capacity(mut self, stack_capacity: usize) -> Self {
        self.stack_capacity = stack_capacity;
        self
    }

    /// Sets the batch size range.
    pub fn with_batch_range(mut self, min: usize, max: usize) -> Self {
        self.batch_range = BatchRange::new(min, max);
        self
    }

    /// Checks the settings before any participant is started.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.consumer_count == 0 {
            return Err(ConfigError::NoConsumers);
        }
        if self.stack_capacity == 0 || self.stack_capacity > MAX_STACK_CAPACITY {
            return Err(ConfigError::StackCapacity {
                requested: self.stack_capacity,
                max: MAX_STACK_CAPACITY,
            });
        }
        if self.batch_range.min > self.batch_range.max {
            return Err(ConfigError::BatchRange {
                min: self.batch_range.min,
                max: self.batch_range.max,
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        REFERENCE_CONFIG
    }
}

/// Reference run: 2 consumers, 512 cycles, 256 slots, batches of 0..=9.
pub const REFERENCE_CONFIG: Config = Config::new(2, 512, 256, BatchRange::new(0, 9));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_reference() {
        let config = Config::default();
        assert_eq!(config.consumer_count, 2);
        assert_eq!(config.cycle_limit, 512);
        assert_eq!(config.stack_capacity, 256);
        assert_eq!(config.batch_range, BatchRange::new(0, 9));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let base = Config::default();

        assert_eq!(
            base.with_consumer_count(0).validate(),
            Err(ConfigError::NoConsumers)
        );
        assert_eq!(
            base.with_stack_capacity(0).validate(),
            Err(ConfigError::StackCapacity {
                requested: 0,
                max: MAX_STACK_CAPACITY
            })
        );
        assert!(base
            .with_stack_capacity(MAX_STACK_CAPACITY + 1)
            .validate()
            .is_err());
        assert_eq!(
            base.with_batch_range(5, 2).validate(),
            Err(ConfigError::BatchRange { min: 5, max: 2 })
        );
    }

    #[test]
    fn test_zero_cycles_is_valid() {
        assert!(Config::default().with_cycle_limit(0).validate().is_ok());
    }

    #[test]
    fn test_batch_range_contains() {
        let range = BatchRange::new(2, 4);
        assert!(!range.contains(1));
        assert!(range.contains(2));
        assert!(range.contains(4));
        assert!(!range.contains(5));
    }
}
