//! Traffic light logic for the traffic simulation
//!
//! A light blocks one axis of its intersection at a time. The blocked side
//! rotates a quarter turn on every advance (up, right, down, left), so the
//! blocked axis alternates between vertical and horizontal.

use super::topology::Topology;
use super::types::{Direction, EdgeKey, NodeId};

/// A traffic light at an intersection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficLight {
    pub node: NodeId,
    pub up: Option<NodeId>,
    pub down: Option<NodeId>,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    /// Current step of the 4-step cycle
    blocked: Direction,
}

impl TrafficLight {
    pub fn new(node: NodeId, topology: &Topology, blocked: Direction) -> Self {
        Self {
            node,
            up: topology.neighbor_towards(node, Direction::Up),
            down: topology.neighbor_towards(node, Direction::Down),
            left: topology.neighbor_towards(node, Direction::Left),
            right: topology.neighbor_towards(node, Direction::Right),
            blocked,
        }
    }

    pub fn blocked_side(&self) -> Direction {
        self.blocked
    }

    pub fn is_vertical_blocked(&self) -> bool {
        self.blocked.is_vertical()
    }

    /// Roads entering the node along the blocked axis
    pub fn get_blocked_edges(&self) -> Vec<EdgeKey> {
        let (a, b) = if self.blocked.is_vertical() {
            (self.up, self.down)
        } else {
            (self.left, self.right)
        };
        [a, b]
            .into_iter()
            .flatten()
            .map(|neighbor| EdgeKey::new(neighbor, self.node))
            .collect()
    }

    pub fn is_blocked(&self, road: &EdgeKey) -> bool {
        road.front == self.node && self.get_blocked_edges().contains(road)
    }

    /// Rotate the blocked side by a quarter turn
    pub fn advance(&mut self) {
        self.blocked = self.blocked.turned_right();
    }
}
