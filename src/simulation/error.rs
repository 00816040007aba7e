//! Error types for map loading and engine construction

use thiserror::Error;

use super::types::{EdgeKey, GridPos, VehicleId};

/// Problems with a map description
#[derive(Error, Debug)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Map has no rows")]
    Empty,

    #[error("Row {row} has width {found}, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("Unknown glyph {glyph:?} at {pos:?}")]
    UnknownGlyph { glyph: char, pos: GridPos },

    #[error("Nodes at {from:?} and {to:?} touch without a road between them")]
    ZeroLengthRoad { from: GridPos, to: GridPos },
}

/// Errors raised by the engine
///
/// Construction errors are fatal: no engine is returned. The remaining
/// variants report caller bugs on explicit placement or positional queries.
/// Contested or impossible moves are never errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Map error: {0}")]
    Map(#[from] MapError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Requested {requested} vehicles but the network only has {capacity} slots")]
    TooManyVehicles { requested: usize, capacity: usize },

    #[error("Requested {requested} points per vehicle but only {available} cells can hold one")]
    TooManyPoints { requested: usize, available: usize },

    #[error("Slot {slot} is out of range for road {road} of length {length}")]
    SlotOutOfRange {
        road: EdgeKey,
        slot: usize,
        length: usize,
    },

    #[error("Slot {slot} of road {road} is already occupied by {occupant}")]
    SlotOccupied {
        road: EdgeKey,
        slot: usize,
        occupant: VehicleId,
    },

    #[error("Road {0} does not exist")]
    UnknownRoad(EdgeKey),

    #[error("Vehicle {0} does not exist")]
    UnknownVehicle(VehicleId),

    #[error("Vehicle {0} is already placed")]
    DuplicateVehicle(VehicleId),
}

impl EngineError {
    /// True for errors that indicate a bug in the caller rather than an
    /// unsatisfiable construction request.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            EngineError::SlotOutOfRange { .. }
                | EngineError::SlotOccupied { .. }
                | EngineError::UnknownRoad(_)
                | EngineError::UnknownVehicle(_)
                | EngineError::DuplicateVehicle(_)
        )
    }
}
