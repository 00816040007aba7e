//! Core types for the traffic simulation
//!
//! Identifiers, grid coordinates, compass directions and the per-tick
//! action vocabulary shared by every other module.

use std::fmt;

/// Number of occupancy slots per map cell of road
pub const CARS_PER_CELL: usize = 2;

/// Default fraction of eligible intersections that receive a traffic light
pub const DEFAULT_TRAFFIC_LIGHT_FRACTION: f64 = 0.4;

/// Default number of ticks between traffic light phase changes
pub const DEFAULT_LIGHT_SWITCH_INTERVAL: u32 = 10;

/// A wrapper type for node (intersection) IDs
///
/// Node ids are assigned in row-major scan order of the map grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

/// A wrapper type for vehicle IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VehicleId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Key of a directed road: (back node, front node)
///
/// Vehicles on the road travel from `back` towards `front`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeKey {
    pub back: NodeId,
    pub front: NodeId,
}

impl EdgeKey {
    pub fn new(back: NodeId, front: NodeId) -> Self {
        Self { back, front }
    }

    /// The opposite-direction road between the same two nodes
    pub fn mirror(&self) -> EdgeKey {
        EdgeKey {
            back: self.front,
            front: self.back,
        }
    }
}

impl From<(usize, usize)> for EdgeKey {
    fn from((back, front): (usize, usize)) -> Self {
        EdgeKey::new(NodeId(back), NodeId(front))
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.back, self.front)
    }
}

/// A cell of the map grid. `y` grows downwards (row index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GridPos {
    pub x: usize,
    pub y: usize,
}

impl GridPos {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Move `steps` cells in `direction`, or `None` when leaving the
    /// non-negative quadrant.
    pub fn step(&self, direction: Direction, steps: usize) -> Option<GridPos> {
        let (dx, dy) = direction.offset();
        let x = self.x as isize + dx * steps as isize;
        let y = self.y as isize + dy * steps as isize;
        if x < 0 || y < 0 {
            return None;
        }
        Some(GridPos::new(x as usize, y as usize))
    }
}

/// Compass direction on the map grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// Unit (dx, dy) offset on the grid
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
        }
    }

    /// Quarter turn clockwise
    pub fn turned_right(self) -> Direction {
        match self {
            Direction::Up => Direction::Right,
            Direction::Right => Direction::Down,
            Direction::Down => Direction::Left,
            Direction::Left => Direction::Up,
        }
    }

    /// Quarter turn counter-clockwise
    pub fn turned_left(self) -> Direction {
        match self {
            Direction::Up => Direction::Left,
            Direction::Left => Direction::Down,
            Direction::Down => Direction::Right,
            Direction::Right => Direction::Up,
        }
    }

    pub fn opposite(self) -> Direction {
        self.turned_right().turned_right()
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }
}

/// Action a vehicle can request for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    Right,
    Forward,
    Left,
    Back,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Right, Action::Forward, Action::Left, Action::Back];

    /// Classify an outgoing heading relative to the incoming heading.
    /// The mirror (U-turn) is never derived this way, so the opposite
    /// heading yields `None`.
    pub fn from_headings(incoming: Direction, outgoing: Direction) -> Option<Action> {
        if outgoing == incoming {
            Some(Action::Forward)
        } else if outgoing == incoming.turned_right() {
            Some(Action::Right)
        } else if outgoing == incoming.turned_left() {
            Some(Action::Left)
        } else {
            None
        }
    }
}

/// Current location of a vehicle: road and slot index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VehiclePosition {
    pub road: EdgeKey,
    pub slot: usize,
}

impl VehiclePosition {
    pub fn new(road: EdgeKey, slot: usize) -> Self {
        Self { road, slot }
    }
}

/// A successful move reported by one tick of resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VehicleMove {
    pub vehicle: VehicleId,
    pub road: EdgeKey,
    pub slot: usize,
}
