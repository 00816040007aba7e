//! Road segment: a directed road discretized into occupancy slots
//!
//! Slot 0 is the entry slot used by vehicles arriving from another road.
//! Slot `length - 1` is the exit slot next to the front node, where
//! node-crossing decisions are made.

use super::error::EngineError;
use super::topology::TurnTable;
use super::types::{Action, EdgeKey, GridPos, VehicleId, CARS_PER_CELL};

/// Occupancy state of one directed road
#[derive(Debug, Clone)]
pub struct RoadSegment {
    key: EdgeKey,
    slots: Vec<Option<VehicleId>>,
    /// Map cells covered by the road, back to front
    cells: Vec<GridPos>,
    turns: TurnTable,
}

impl RoadSegment {
    pub fn new(key: EdgeKey, cells: Vec<GridPos>, turns: TurnTable) -> Self {
        Self {
            key,
            slots: vec![None; cells.len() * CARS_PER_CELL],
            cells,
            turns,
        }
    }

    pub fn key(&self) -> EdgeKey {
        self.key
    }

    pub fn length(&self) -> usize {
        self.slots.len()
    }

    pub fn turns(&self) -> &TurnTable {
        &self.turns
    }

    pub fn exit_slot(&self) -> usize {
        self.slots.len().saturating_sub(1)
    }

    fn check_slot(&self, slot: usize) -> Result<(), EngineError> {
        if slot < self.slots.len() {
            Ok(())
        } else {
            Err(EngineError::SlotOutOfRange {
                road: self.key,
                slot,
                length: self.slots.len(),
            })
        }
    }

    /// Vehicle occupying a slot, if any
    pub fn occupant(&self, slot: usize) -> Result<Option<VehicleId>, EngineError> {
        self.check_slot(slot)?;
        Ok(self.slots[slot])
    }

    pub(crate) fn set_occupant(
        &mut self,
        slot: usize,
        vehicle: Option<VehicleId>,
    ) -> Result<(), EngineError> {
        self.check_slot(slot)?;
        self.slots[slot] = vehicle;
        Ok(())
    }

    /// Number of vehicles on the road
    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_entry_free(&self) -> bool {
        matches!(self.slots.first(), Some(None))
    }

    pub fn is_exit_slot(&self, slot: usize) -> Result<bool, EngineError> {
        self.check_slot(slot)?;
        Ok(slot == self.exit_slot())
    }

    /// Map cell a slot is drawn on. Consecutive slots share a cell.
    pub fn cell_at(&self, slot: usize) -> Result<GridPos, EngineError> {
        self.check_slot(slot)?;
        Ok(self.cells[slot / CARS_PER_CELL])
    }

    /// Slot on the mirror road that sits beside `slot`
    pub fn inverted_slot(&self, slot: usize) -> Result<usize, EngineError> {
        self.check_slot(slot)?;
        Ok(self.slots.len() - 1 - slot)
    }

    /// Destination road for a turn at the front node
    pub fn next_road_key(&self, action: Action) -> Option<EdgeKey> {
        self.turns.get(action)
    }

    /// Turns that can be requested at the exit slot. Back is always valid.
    pub fn available_turns(&self) -> Vec<Action> {
        self.turns.available()
    }

    /// Occupied slots with their vehicles, entry to exit
    pub fn vehicles(&self) -> impl Iterator<Item = (usize, VehicleId)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, vehicle)| vehicle.map(|v| (slot, v)))
    }
}
