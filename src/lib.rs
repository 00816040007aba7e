//! Grid Traffic Simulation Library
//!
//! Vehicles move slot by slot along capacity-limited roads of a fixed grid
//! map. Every tick the engine resolves one proposed action per vehicle under
//! traffic lights and right-of-way rules.

pub mod simulation;
