//! Grid traffic simulation
//!
//! This module contains the road topology model and the per-tick conflict
//! resolution engine. It has no rendering or I/O dependencies beyond
//! reading a map file, so it can be driven from tests or a console loop.

mod config;
mod driver;
mod engine;
mod error;
mod map;
mod registry;
mod road;
mod session;
mod topology;
mod traffic_light;
mod types;

// Re-export public types for external use
pub use config::EngineConfig;
pub use driver::{Driver, ForwardDriver, RandomDriver};
pub use engine::TrafficEngine;
pub use error::{EngineError, MapError};
pub use map::{MapGrid, Tile, EMPTY_GLYPH, H_ROAD_GLYPH, NODE_GLYPH, V_ROAD_GLYPH};
pub use registry::{Point, PointAnchor, PositionRegistry};
pub use road::RoadSegment;
pub use session::{SimStats, Simulation, StepReport, StopMode};
pub use topology::{Node, RoadLink, Topology, TurnTable};
pub use traffic_light::TrafficLight;
pub use types::{
    Action, Direction, EdgeKey, GridPos, NodeId, VehicleId, VehicleMove, VehiclePosition,
    CARS_PER_CELL, DEFAULT_LIGHT_SWITCH_INTERVAL, DEFAULT_TRAFFIC_LIGHT_FRACTION,
};
