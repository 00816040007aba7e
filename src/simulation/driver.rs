//! Per-vehicle decision policies
//!
//! The engine never calls a driver. A session (or any other external loop)
//! asks each driver for an action with a read-only view of the engine and
//! hands the whole batch to [`TrafficEngine::move_cars`].

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use super::engine::TrafficEngine;
use super::types::{Action, VehicleId, VehiclePosition};

/// Probability that a random driver keeps going forward mid-road
const FORWARD_PROBABILITY: f64 = 0.95;

/// Produces one action per tick for a vehicle
pub trait Driver {
    fn next_action(&mut self, engine: &TrafficEngine, vehicle: VehicleId) -> Action;
}

/// Always requests `Forward`
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardDriver;

impl Driver for ForwardDriver {
    fn next_action(&mut self, _engine: &TrafficEngine, _vehicle: VehicleId) -> Action {
        Action::Forward
    }
}

/// Seeded random policy
///
/// Mid-road it mostly drives forward and occasionally turns back. At an
/// exit slot it picks a random available turn, and keeps requesting the
/// same turn while it has not moved.
#[derive(Debug, Clone)]
pub struct RandomDriver {
    rng: StdRng,
    last: Option<(VehiclePosition, Action)>,
}

impl RandomDriver {
    pub fn new(seed: u64, vehicle: VehicleId) -> Self {
        let mixed = seed
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(vehicle.0 as u64);
        Self {
            rng: StdRng::seed_from_u64(mixed),
            last: None,
        }
    }
}

impl Driver for RandomDriver {
    fn next_action(&mut self, engine: &TrafficEngine, vehicle: VehicleId) -> Action {
        let Some(position) = engine.vehicle_position(vehicle) else {
            return Action::Forward;
        };

        let at_exit = matches!(engine.is_exit_slot(position.road, position.slot), Ok(Some(true)));
        let action = if at_exit {
            match self.last {
                Some((last_position, last_action)) if last_position == position => last_action,
                _ => engine
                    .available_turns(position.road)
                    .choose(&mut self.rng)
                    .copied()
                    .unwrap_or(Action::Back),
            }
        } else if self.rng.random_bool(FORWARD_PROBABILITY) {
            Action::Forward
        } else {
            Action::Back
        };

        self.last = Some((position, action));
        action
    }
}
