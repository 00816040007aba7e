//! Session driver for running the simulation tick by tick
//!
//! Collects one action per vehicle from its driver, resolves the batch on
//! the engine, switches traffic lights on schedule and keeps running
//! statistics.

use log::info;
use std::collections::BTreeMap;

use super::driver::{Driver, RandomDriver};
use super::engine::TrafficEngine;
use super::registry::Point;
use super::types::{Action, VehicleId, VehicleMove};

/// When a session counts as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopMode {
    /// Every point-collecting vehicle has collected all its points
    #[default]
    AllFinished,
    /// At least one point-collecting vehicle has collected all its points
    OneFinished,
}

/// Running totals for a session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimStats {
    pub ticks: u64,
    pub moves: usize,
    /// Vehicle-ticks without movement
    pub stalls: usize,
    pub points_collected: usize,
    pub light_switches: u64,
}

impl SimStats {
    /// Share of vehicle-ticks that resulted in a move, in percent
    pub fn move_rate(&self) -> f64 {
        let total = self.moves + self.stalls;
        if total == 0 {
            return 0.0;
        }
        self.moves as f64 / total as f64 * 100.0
    }

    pub fn summary(&self) -> String {
        format!(
            "Ticks: {} | Moves: {} | Stalls: {} | Points: {} | Light switches: {}",
            self.ticks, self.moves, self.stalls, self.points_collected, self.light_switches
        )
    }
}

/// Outcome of one session step
#[derive(Debug, Clone)]
pub struct StepReport {
    pub tick: u64,
    pub moves: Vec<VehicleMove>,
    /// Vehicles that requested an action but did not move
    pub stalled: Vec<VehicleId>,
    pub points_collected: Vec<(VehicleId, Point)>,
    pub lights_advanced: bool,
}

/// An engine plus the drivers of its vehicles
pub struct Simulation {
    engine: TrafficEngine,
    drivers: BTreeMap<VehicleId, Box<dyn Driver>>,
    stop_mode: StopMode,
    stats: SimStats,
}

impl Simulation {
    pub fn new(engine: TrafficEngine, stop_mode: StopMode) -> Self {
        Self {
            engine,
            drivers: BTreeMap::new(),
            stop_mode,
            stats: SimStats::default(),
        }
    }

    /// Session where every vehicle gets a seeded random driver
    pub fn with_random_drivers(engine: TrafficEngine, stop_mode: StopMode) -> Self {
        let seed = engine.config().random_seed;
        let vehicles: Vec<VehicleId> = engine.vehicles().map(|(id, _)| id).collect();
        let mut simulation = Self::new(engine, stop_mode);
        for vehicle in vehicles {
            simulation.set_driver(vehicle, Box::new(RandomDriver::new(seed, vehicle)));
        }
        simulation
    }

    pub fn set_driver(&mut self, vehicle: VehicleId, driver: Box<dyn Driver>) {
        self.drivers.insert(vehicle, driver);
    }

    pub fn engine(&self) -> &TrafficEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut TrafficEngine {
        &mut self.engine
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    pub fn tick(&self) -> u64 {
        self.stats.ticks
    }

    /// Run one tick: gather every driver's action, then resolve the batch
    pub fn step(&mut self) -> StepReport {
        let mut actions: Vec<(VehicleId, Action)> = Vec::with_capacity(self.drivers.len());
        for (vehicle, driver) in self.drivers.iter_mut() {
            if self.engine.vehicle_position(*vehicle).is_none() {
                continue;
            }
            actions.push((*vehicle, driver.next_action(&self.engine, *vehicle)));
        }

        let collected_before = self.engine.collected_points().len();
        let moves = self.engine.move_cars(&actions);
        let points_collected = self.engine.collected_points()[collected_before..].to_vec();

        let stalled: Vec<VehicleId> = actions
            .iter()
            .map(|(vehicle, _)| *vehicle)
            .filter(|vehicle| !moves.iter().any(|m| m.vehicle == *vehicle))
            .collect();

        self.stats.ticks += 1;
        self.stats.moves += moves.len();
        self.stats.stalls += stalled.len();
        self.stats.points_collected += points_collected.len();

        let interval = u64::from(self.engine.config().light_switch_interval.max(1));
        let lights_advanced = self.stats.ticks % interval == 0;
        if lights_advanced {
            self.engine.advance_lights();
            self.stats.light_switches += 1;
        }

        StepReport {
            tick: self.stats.ticks,
            moves,
            stalled,
            points_collected,
            lights_advanced,
        }
    }

    /// Step until finished or `max_ticks` ticks have run. Returns the number
    /// of ticks executed by this call.
    pub fn run(&mut self, max_ticks: u64) -> u64 {
        let mut executed = 0;
        while executed < max_ticks && !self.is_finished() {
            self.step();
            executed += 1;
        }
        info!("Session stopped after {} ticks: {}", executed, self.stats.summary());
        executed
    }

    /// Whether the stop mode is satisfied. Never true when no vehicle
    /// collects points.
    pub fn is_finished(&self) -> bool {
        let finished = self.engine.finished_vehicles();
        if finished.is_empty() {
            return false;
        }
        match self.stop_mode {
            StopMode::AllFinished => finished.values().all(|done| *done),
            StopMode::OneFinished => finished.values().any(|done| *done),
        }
    }
}
