//! Vehicle positions and point ownership
//!
//! The registry is owned by the engine and only mutated by it.

use std::collections::BTreeMap;

use log::debug;

use super::error::EngineError;
use super::types::{GridPos, NodeId, VehicleId, VehiclePosition};

/// What a point is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointAnchor {
    /// Collected by crossing the node
    Node(NodeId),
    /// Collected by occupying a slot drawn on the cell
    Road,
}

/// A collectible point on the map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub position: GridPos,
    pub anchor: PointAnchor,
}

impl Point {
    pub fn at_node(node: NodeId, position: GridPos) -> Self {
        Self {
            position,
            anchor: PointAnchor::Node(node),
        }
    }

    pub fn on_road(position: GridPos) -> Self {
        Self {
            position,
            anchor: PointAnchor::Road,
        }
    }

    fn is_collected_by(&self, crossed: Option<NodeId>, cell: GridPos) -> bool {
        match self.anchor {
            PointAnchor::Node(node) => crossed == Some(node),
            PointAnchor::Road => self.position == cell,
        }
    }
}

/// Vehicle id -> position and point bookkeeping
#[derive(Debug, Clone, Default)]
pub struct PositionRegistry {
    positions: BTreeMap<VehicleId, VehiclePosition>,
    points: BTreeMap<VehicleId, Vec<Point>>,
    /// Every removed point, in removal order
    collected: Vec<(VehicleId, Point)>,
}

impl PositionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(
        &mut self,
        vehicle: VehicleId,
        position: VehiclePosition,
    ) -> Result<(), EngineError> {
        if self.positions.contains_key(&vehicle) {
            return Err(EngineError::DuplicateVehicle(vehicle));
        }
        self.positions.insert(vehicle, position);
        Ok(())
    }

    pub(crate) fn set_position(&mut self, vehicle: VehicleId, position: VehiclePosition) {
        self.positions.insert(vehicle, position);
    }

    pub fn position(&self, vehicle: VehicleId) -> Option<VehiclePosition> {
        self.positions.get(&vehicle).copied()
    }

    pub fn contains(&self, vehicle: VehicleId) -> bool {
        self.positions.contains_key(&vehicle)
    }

    pub fn vehicles(&self) -> impl Iterator<Item = (VehicleId, VehiclePosition)> + '_ {
        self.positions.iter().map(|(id, pos)| (*id, *pos))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub(crate) fn assign_points(&mut self, vehicle: VehicleId, points: Vec<Point>) {
        self.points.insert(vehicle, points);
    }

    /// Outstanding points of a vehicle, `None` if it does not collect points
    pub fn points_for(&self, vehicle: VehicleId) -> Option<&[Point]> {
        self.points.get(&vehicle).map(Vec::as_slice)
    }

    pub fn points(&self) -> &BTreeMap<VehicleId, Vec<Point>> {
        &self.points
    }

    pub fn collected(&self) -> &[(VehicleId, Point)] {
        &self.collected
    }

    /// Remove at most one point after a committed move. `crossed` is the
    /// node passed when the move left an exit slot.
    pub(crate) fn collect_point(
        &mut self,
        vehicle: VehicleId,
        crossed: Option<NodeId>,
        cell: GridPos,
    ) -> Option<Point> {
        let points = self.points.get_mut(&vehicle)?;
        let index = points
            .iter()
            .position(|point| point.is_collected_by(crossed, cell))?;
        let point = points.remove(index);
        debug!(
            "Vehicle {} collected point at {:?} ({} left)",
            vehicle,
            point.position,
            points.len()
        );
        self.collected.push((vehicle, point));
        Some(point)
    }
}
