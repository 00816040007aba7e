//! Road topology built from a static map
//!
//! Nodes are found by scanning the grid, directed roads by casting a ray
//! from every node along each compass direction. The resulting graph is
//! immutable for the lifetime of an engine.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::BTreeMap;

use super::error::MapError;
use super::map::{MapGrid, Tile};
use super::types::{Action, Direction, EdgeKey, GridPos, NodeId};

/// An intersection point of the road graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub position: GridPos,
    /// Number of roads leaving this node
    pub degree: usize,
}

/// Edge data for the road graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoadLink {
    /// Heading of a vehicle travelling along the road
    pub heading: Direction,
    /// Road cells between the two nodes, ordered from back to front
    pub cells: Vec<GridPos>,
}

impl RoadLink {
    /// Geometric length in map cells
    pub fn length_on_map(&self) -> usize {
        self.cells.len()
    }
}

/// Destination roads reachable from the front node of a road
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnTable {
    pub forward: Option<EdgeKey>,
    pub left: Option<EdgeKey>,
    pub right: Option<EdgeKey>,
    /// The mirror road, always present
    pub back: EdgeKey,
}

impl TurnTable {
    fn for_road(key: EdgeKey) -> Self {
        Self {
            forward: None,
            left: None,
            right: None,
            back: key.mirror(),
        }
    }

    /// Destination road for an action, `None` if the turn does not exist
    pub fn get(&self, action: Action) -> Option<EdgeKey> {
        match action {
            Action::Forward => self.forward,
            Action::Left => self.left,
            Action::Right => self.right,
            Action::Back => Some(self.back),
        }
    }

    fn slot_mut(&mut self, action: Action) -> Option<&mut Option<EdgeKey>> {
        match action {
            Action::Forward => Some(&mut self.forward),
            Action::Left => Some(&mut self.left),
            Action::Right => Some(&mut self.right),
            Action::Back => None,
        }
    }

    /// Actions with an existing destination, in `Action::ALL` order
    pub fn available(&self) -> Vec<Action> {
        Action::ALL
            .into_iter()
            .filter(|action| self.get(*action).is_some())
            .collect()
    }
}

/// Static road graph: nodes, directed roads and turn classification
#[derive(Debug, Clone)]
pub struct Topology {
    /// The underlying petgraph directed graph
    graph: DiGraph<NodeId, RoadLink>,

    /// Maps node IDs to their indices in the graph
    node_to_index: BTreeMap<NodeId, NodeIndex>,

    nodes: BTreeMap<NodeId, Node>,

    /// Reverse lookup from grid cell to node
    node_cells: BTreeMap<GridPos, NodeId>,

    /// Precomputed (road, action) -> destination road table
    turns: BTreeMap<EdgeKey, TurnTable>,

    width: usize,
    height: usize,
}

impl Topology {
    /// Build the topology from a parsed map
    pub fn build(grid: &MapGrid) -> Result<Self, MapError> {
        let mut graph = DiGraph::new();
        let mut node_to_index = BTreeMap::new();
        let mut node_cells = BTreeMap::new();

        for (position, tile) in grid.cells() {
            if tile == Tile::Node {
                let id = NodeId(node_to_index.len());
                node_to_index.insert(id, graph.add_node(id));
                node_cells.insert(position, id);
            }
        }

        for (&position, &id) in &node_cells {
            for direction in Direction::ALL {
                let Some((front, cells)) = cast_ray(grid, position, direction)? else {
                    continue;
                };
                if let Some(front_id) = node_cells.get(&front) {
                    graph.add_edge(
                        node_to_index[&id],
                        node_to_index[front_id],
                        RoadLink {
                            heading: direction,
                            cells,
                        },
                    );
                }
            }
        }

        let nodes = node_cells
            .iter()
            .map(|(&position, &id)| {
                let degree = graph.edges(node_to_index[&id]).count();
                (
                    id,
                    Node {
                        id,
                        position,
                        degree,
                    },
                )
            })
            .collect();

        let mut topology = Self {
            graph,
            node_to_index,
            nodes,
            node_cells,
            turns: BTreeMap::new(),
            width: grid.width(),
            height: grid.height(),
        };
        topology.turns = topology.classify_turns();
        Ok(topology)
    }

    /// For every road, rotate each outgoing road of its front node relative
    /// to the incoming heading.
    fn classify_turns(&self) -> BTreeMap<EdgeKey, TurnTable> {
        let mut turns = BTreeMap::new();
        for (key, link) in self.edges() {
            let mut table = TurnTable::for_road(key);
            for (next, next_link) in self.outgoing(key.front) {
                if next.front == key.back {
                    continue;
                }
                let Some(action) = Action::from_headings(link.heading, next_link.heading) else {
                    continue;
                };
                if let Some(slot) = table.slot_mut(action) {
                    *slot = Some(next);
                }
            }
            turns.insert(key, table);
        }
        turns
    }

    fn outgoing(&self, node: NodeId) -> Vec<(EdgeKey, &RoadLink)> {
        let Some(index) = self.node_to_index.get(&node) else {
            return Vec::new();
        };
        let mut roads: Vec<_> = self
            .graph
            .edges(*index)
            .map(|edge| (EdgeKey::new(node, self.graph[edge.target()]), edge.weight()))
            .collect();
        roads.sort_by_key(|(key, _)| *key);
        roads
    }

    /// All directed roads, sorted by key
    pub fn edges(&self) -> Vec<(EdgeKey, &RoadLink)> {
        let mut edges: Vec<_> = self
            .graph
            .edge_references()
            .map(|edge| {
                (
                    EdgeKey::new(self.graph[edge.source()], self.graph[edge.target()]),
                    edge.weight(),
                )
            })
            .collect();
        edges.sort_by_key(|(key, _)| *key);
        edges
    }

    /// Road data for a directed road
    pub fn road(&self, key: EdgeKey) -> Option<&RoadLink> {
        let back = self.node_to_index.get(&key.back)?;
        let front = self.node_to_index.get(&key.front)?;
        self.graph
            .edges(*back)
            .find(|edge| edge.target() == *front)
            .map(|edge| edge.weight())
    }

    pub fn turns(&self, key: EdgeKey) -> Option<&TurnTable> {
        self.turns.get(&key)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_at(&self, position: GridPos) -> Option<NodeId> {
        self.node_cells.get(&position).copied()
    }

    /// Number of roads leaving a node, 0 for unknown nodes
    pub fn degree(&self, id: NodeId) -> usize {
        self.nodes.get(&id).map_or(0, |node| node.degree)
    }

    /// Nodes reachable by one road from `id`
    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        self.outgoing(id).into_iter().map(|(key, _)| key.front).collect()
    }

    /// Neighbour of `id` in a compass direction
    pub fn neighbor_towards(&self, id: NodeId, direction: Direction) -> Option<NodeId> {
        self.outgoing(id)
            .into_iter()
            .find(|(_, link)| link.heading == direction)
            .map(|(key, _)| key.front)
    }

    /// Nodes that may receive a traffic light
    pub fn light_eligible_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|node| node.degree > 2)
            .map(|node| node.id)
            .collect()
    }

    /// Every cell covered by a road, row-major
    pub fn road_cells(&self) -> Vec<GridPos> {
        let mut cells: Vec<GridPos> = self
            .graph
            .edge_weights()
            .flat_map(|link| link.cells.iter().copied())
            .collect();
        cells.sort_by_key(|pos| (pos.y, pos.x));
        cells.dedup();
        cells
    }

    /// Cells that can hold a point: nodes and road cells, row-major
    pub fn placement_cells(&self) -> Vec<GridPos> {
        let mut cells = self.road_cells();
        cells.extend(self.node_cells.keys().copied());
        cells.sort_by_key(|pos| (pos.y, pos.x));
        cells
    }

    /// Road weights (cells traversed) between every pair of nodes
    pub fn adjacency_matrix(&self) -> Vec<Vec<Option<usize>>> {
        let size = self.nodes.len();
        let mut matrix = vec![vec![None; size]; size];
        for (key, link) in self.edges() {
            matrix[key.back.0][key.front.0] = Some(link.length_on_map());
        }
        matrix
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn road_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }
}

/// Walk from a node until the first node or empty cell. Returns the node
/// reached and the road cells crossed on the way.
fn cast_ray(
    grid: &MapGrid,
    from: GridPos,
    direction: Direction,
) -> Result<Option<(GridPos, Vec<GridPos>)>, MapError> {
    let mut cells = Vec::new();
    let mut steps = 1;
    loop {
        let Some(position) = from.step(direction, steps) else {
            return Ok(None);
        };
        match grid.tile(position) {
            None | Some(Tile::Empty) => return Ok(None),
            Some(Tile::Node) if cells.is_empty() => {
                return Err(MapError::ZeroLengthRoad { from, to: position });
            }
            Some(Tile::Node) => return Ok(Some((position, cells))),
            Some(tile) if tile.is_road() => {
                cells.push(position);
                steps += 1;
            }
            Some(_) => return Ok(None),
        }
    }
}
