//! Construction configuration for the engine

use super::error::EngineError;
use super::types::{DEFAULT_LIGHT_SWITCH_INTERVAL, DEFAULT_TRAFFIC_LIGHT_FRACTION};

/// Options recognised when building an engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Seed for every construction-time random choice
    pub random_seed: u64,
    /// Fraction of eligible intersections that receive a light (0.0..=1.0)
    pub traffic_light_fraction: f64,
    /// Ticks between light advances, used by the session driver
    pub light_switch_interval: u32,
    pub vehicle_count: usize,
    pub points_per_vehicle: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            random_seed: 0,
            traffic_light_fraction: DEFAULT_TRAFFIC_LIGHT_FRACTION,
            light_switch_interval: DEFAULT_LIGHT_SWITCH_INTERVAL,
            vehicle_count: 0,
            points_per_vehicle: 0,
        }
    }
}

impl EngineConfig {
    /// Default configuration with the given seed
    pub fn with_seed(random_seed: u64) -> Self {
        Self {
            random_seed,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !(0.0..=1.0).contains(&self.traffic_light_fraction) {
            return Err(EngineError::InvalidConfig(format!(
                "traffic_light_fraction must be within 0.0..=1.0, got {}",
                self.traffic_light_fraction
            )));
        }
        if self.light_switch_interval == 0 {
            return Err(EngineError::InvalidConfig(
                "light_switch_interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
