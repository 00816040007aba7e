//! Conflict resolution engine that ties everything together
//!
//! The engine owns the static topology, the occupancy of every road, the
//! traffic lights and the vehicle registry. Each tick it receives one action
//! per vehicle and decides which moves succeed.

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet};

use super::config::EngineConfig;
use super::error::EngineError;
use super::map::MapGrid;
use super::registry::{Point, PositionRegistry};
use super::road::RoadSegment;
use super::topology::Topology;
use super::traffic_light::TrafficLight;
use super::types::{
    Action, Direction, EdgeKey, GridPos, NodeId, VehicleId, VehicleMove, VehiclePosition,
};

/// A vehicle waiting at the exit slot of a road
#[derive(Debug, Clone, Copy)]
struct NodeRequest {
    vehicle: VehicleId,
    action: Action,
}

/// A move accepted during resolution, applied at commit time
#[derive(Debug, Clone, Copy)]
struct PlannedMove {
    vehicle: VehicleId,
    from: VehiclePosition,
    to: VehiclePosition,
    /// Node passed when leaving an exit slot
    crossed: Option<NodeId>,
}

/// The simulation map state
pub struct TrafficEngine {
    topology: Topology,
    roads: BTreeMap<EdgeKey, RoadSegment>,
    lights: BTreeMap<NodeId, TrafficLight>,
    registry: PositionRegistry,
    config: EngineConfig,
}

impl TrafficEngine {
    /// Build an engine from a map. All construction randomness comes from a
    /// single generator seeded with `config.random_seed`.
    pub fn new(grid: &MapGrid, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let topology = Topology::build(grid)?;
        let mut rng = StdRng::seed_from_u64(config.random_seed);

        let roads: BTreeMap<EdgeKey, RoadSegment> = topology
            .edges()
            .into_iter()
            .filter_map(|(key, link)| {
                let turns = *topology.turns(key)?;
                Some((key, RoadSegment::new(key, link.cells.clone(), turns)))
            })
            .collect();

        let mut engine = Self {
            topology,
            roads,
            lights: BTreeMap::new(),
            registry: PositionRegistry::new(),
            config,
        };

        engine.place_traffic_lights(&mut rng);
        engine.spawn_vehicles(&mut rng)?;
        engine.spawn_points(&mut rng)?;

        info!(
            "Engine ready: {} nodes, {} roads, {} lights, {} vehicles",
            engine.topology.node_count(),
            engine.roads.len(),
            engine.lights.len(),
            engine.registry.len()
        );
        Ok(engine)
    }

    /// Build an engine from the bundled sample map
    pub fn with_sample_map(config: EngineConfig) -> Result<Self, EngineError> {
        Self::new(&MapGrid::sample()?, config)
    }

    fn place_traffic_lights(&mut self, rng: &mut StdRng) {
        let eligible = self.topology.light_eligible_nodes();
        let count = (eligible.len() as f64 * self.config.traffic_light_fraction).floor() as usize;

        let mut chosen: Vec<NodeId> = eligible.choose_multiple(rng, count).copied().collect();
        chosen.sort();

        for node in chosen {
            let blocked = Direction::ALL[rng.random_range(0..Direction::ALL.len())];
            self.lights
                .insert(node, TrafficLight::new(node, &self.topology, blocked));
        }
    }

    fn spawn_vehicles(&mut self, rng: &mut StdRng) -> Result<(), EngineError> {
        let requested = self.config.vehicle_count;
        let capacity: usize = self.roads.values().map(RoadSegment::length).sum();
        if requested > capacity {
            return Err(EngineError::TooManyVehicles {
                requested,
                capacity,
            });
        }

        let mut free: Vec<VehiclePosition> = self.free_slots();
        free.shuffle(rng);

        for (index, position) in free.into_iter().take(requested).enumerate() {
            self.place_vehicle(VehicleId(index + 1), position.road, position.slot)?;
        }
        Ok(())
    }

    fn spawn_points(&mut self, rng: &mut StdRng) -> Result<(), EngineError> {
        let requested = self.config.points_per_vehicle;
        if requested == 0 {
            return Ok(());
        }

        let cells = self.topology.placement_cells();
        if requested > cells.len() {
            return Err(EngineError::TooManyPoints {
                requested,
                available: cells.len(),
            });
        }

        if self.registry.is_empty() {
            return Ok(());
        }

        let vehicles: Vec<VehicleId> = self.registry.vehicles().map(|(id, _)| id).collect();
        for vehicle in vehicles {
            let points = cells
                .choose_multiple(rng, requested)
                .map(|cell| self.point_at(*cell))
                .collect();
            self.registry.assign_points(vehicle, points);
        }
        Ok(())
    }

    fn point_at(&self, cell: GridPos) -> Point {
        match self.topology.node_at(cell) {
            Some(node) => Point::at_node(node, cell),
            None => Point::on_road(cell),
        }
    }

    fn free_slots(&self) -> Vec<VehiclePosition> {
        self.roads
            .values()
            .flat_map(|road| {
                (0..road.length())
                    .filter(|slot| matches!(road.occupant(*slot), Ok(None)))
                    .map(|slot| VehiclePosition::new(road.key(), slot))
            })
            .collect()
    }

    /// Put a vehicle on a specific slot
    pub fn place_vehicle(
        &mut self,
        vehicle: VehicleId,
        road: EdgeKey,
        slot: usize,
    ) -> Result<(), EngineError> {
        if self.registry.contains(vehicle) {
            return Err(EngineError::DuplicateVehicle(vehicle));
        }
        let segment = self
            .roads
            .get_mut(&road)
            .ok_or(EngineError::UnknownRoad(road))?;
        if let Some(occupant) = segment.occupant(slot)? {
            return Err(EngineError::SlotOccupied {
                road,
                slot,
                occupant,
            });
        }
        segment.set_occupant(slot, Some(vehicle))?;
        self.registry
            .insert(vehicle, VehiclePosition::new(road, slot))
    }

    /// Give a placed vehicle its list of points to collect
    pub fn assign_points(
        &mut self,
        vehicle: VehicleId,
        points: Vec<Point>,
    ) -> Result<(), EngineError> {
        if !self.registry.contains(vehicle) {
            return Err(EngineError::UnknownVehicle(vehicle));
        }
        self.registry.assign_points(vehicle, points);
        Ok(())
    }

    /// Resolve one tick. Returns the vehicles that moved with their new
    /// positions, sorted by vehicle id. Vehicles absent from the result did
    /// not move.
    pub fn move_cars(&mut self, actions: &[(VehicleId, Action)]) -> Vec<VehicleMove> {
        let mut requested: BTreeMap<VehicleId, Action> = BTreeMap::new();
        for &(vehicle, action) in actions {
            if !self.registry.contains(vehicle) {
                warn!("Ignoring action for unknown vehicle {}", vehicle);
                continue;
            }
            if requested.contains_key(&vehicle) {
                warn!("Ignoring duplicate action for vehicle {}", vehicle);
                continue;
            }
            requested.insert(vehicle, action);
        }

        // Split against the pre-tick snapshot
        let mut road_requests = Vec::new();
        let mut node_requests: BTreeMap<EdgeKey, NodeRequest> = BTreeMap::new();
        for (&vehicle, &action) in &requested {
            let Some(position) = self.registry.position(vehicle) else {
                continue;
            };
            let Some(road) = self.roads.get(&position.road) else {
                continue;
            };
            if position.slot == road.exit_slot() {
                node_requests.insert(position.road, NodeRequest { vehicle, action });
            } else {
                road_requests.push((vehicle, action, position));
            }
        }

        let road_moves = self.resolve_road_moves(&road_requests);
        let node_moves = self.resolve_node_moves(&node_requests, &road_moves);

        let mut moves = road_moves;
        moves.extend(node_moves);
        self.commit(moves)
    }

    /// Mid-road vehicles: forward to the next slot or back onto the mirror
    /// road. Forward requests are considered before back requests.
    fn resolve_road_moves(
        &self,
        requests: &[(VehicleId, Action, VehiclePosition)],
    ) -> Vec<PlannedMove> {
        let mut ordered: Vec<_> = requests.to_vec();
        ordered.sort_by_key(|(vehicle, action, _)| (*action != Action::Forward, *vehicle));

        let mut claimed = BTreeSet::new();
        let mut moves = Vec::new();
        for (vehicle, action, from) in ordered {
            let Some(road) = self.roads.get(&from.road) else {
                continue;
            };
            let to = match action {
                Action::Forward => VehiclePosition::new(from.road, from.slot + 1),
                Action::Back => {
                    let Ok(slot) = road.inverted_slot(from.slot) else {
                        continue;
                    };
                    VehiclePosition::new(from.road.mirror(), slot)
                }
                Action::Left | Action::Right => {
                    debug!("Vehicle {} cannot turn mid-road", vehicle);
                    continue;
                }
            };

            if !self.is_free(to) || !claimed.insert(to) {
                debug!("Vehicle {} blocked at {:?}", vehicle, to);
                continue;
            }
            moves.push(PlannedMove {
                vehicle,
                from,
                to,
                crossed: None,
            });
        }
        moves
    }

    /// Vehicles at exit slots: light gate, yield rules, then entry slot
    /// availability. Priority checks see the whole batch of node requests.
    fn resolve_node_moves(
        &self,
        requests: &BTreeMap<EdgeKey, NodeRequest>,
        road_moves: &[PlannedMove],
    ) -> Vec<PlannedMove> {
        let vacated: BTreeSet<VehiclePosition> = road_moves.iter().map(|m| m.from).collect();
        let mut claimed: BTreeSet<VehiclePosition> = road_moves.iter().map(|m| m.to).collect();

        let mut ordered: Vec<(EdgeKey, NodeRequest)> =
            requests.iter().map(|(key, req)| (*key, *req)).collect();
        ordered.sort_by_key(|(_, req)| req.vehicle);

        let mut moves = Vec::new();
        for (inbound, request) in ordered {
            let Some(destination) = self.node_destination(inbound, request, requests) else {
                continue;
            };
            let Some(road) = self.roads.get(&inbound) else {
                continue;
            };

            let entry = VehiclePosition::new(destination, 0);
            let free =
                (self.is_free(entry) || vacated.contains(&entry)) && !claimed.contains(&entry);
            if !free {
                debug!(
                    "Vehicle {} waits: entry of {} is taken",
                    request.vehicle, destination
                );
                continue;
            }
            claimed.insert(entry);
            moves.push(PlannedMove {
                vehicle: request.vehicle,
                from: VehiclePosition::new(inbound, road.exit_slot()),
                to: entry,
                crossed: Some(inbound.front),
            });
        }
        moves
    }

    /// Destination road for a node request, or `None` when the light or a
    /// right-of-way rule holds the vehicle back.
    fn node_destination(
        &self,
        inbound: EdgeKey,
        request: NodeRequest,
        requests: &BTreeMap<EdgeKey, NodeRequest>,
    ) -> Option<EdgeKey> {
        let road = self.roads.get(&inbound)?;
        let Some(destination) = road.next_road_key(request.action) else {
            debug!(
                "Vehicle {} requested missing turn {:?} from {}",
                request.vehicle, request.action, inbound
            );
            return None;
        };

        let light = self.lights.get(&inbound.front);
        let blocked = |key: &EdgeKey| light.is_some_and(|l| l.is_blocked(key));

        if blocked(&inbound) {
            debug!("Vehicle {} stopped by light at {}", request.vehicle, inbound.front);
            return None;
        }

        let turns = road.turns();
        if matches!(request.action, Action::Forward | Action::Left | Action::Back) {
            if let Some(from_right) = turns.right.map(|key| key.mirror()) {
                if !blocked(&from_right) && requests.contains_key(&from_right) {
                    debug!("Vehicle {} yields to traffic from the right", request.vehicle);
                    return None;
                }
            }
        }

        if matches!(request.action, Action::Left | Action::Back) {
            if let Some(oncoming) = turns.forward.map(|key| key.mirror()) {
                if !blocked(&oncoming) {
                    if let Some(other) = requests.get(&oncoming) {
                        let must_yield = other.action == Action::Forward
                            || (other.action == Action::Right && request.action == Action::Left);
                        if must_yield {
                            debug!("Vehicle {} yields to oncoming traffic", request.vehicle);
                            return None;
                        }
                    }
                }
            }
        }

        Some(destination)
    }

    fn is_free(&self, position: VehiclePosition) -> bool {
        self.roads
            .get(&position.road)
            .is_some_and(|road| matches!(road.occupant(position.slot), Ok(None)))
    }

    /// Apply every accepted move, then collect points
    fn commit(&mut self, mut moves: Vec<PlannedMove>) -> Vec<VehicleMove> {
        moves.sort_by_key(|m| m.vehicle);

        for planned in &moves {
            if let Some(road) = self.roads.get_mut(&planned.from.road) {
                if let Err(e) = road.set_occupant(planned.from.slot, None) {
                    warn!("Failed to clear slot for vehicle {}: {}", planned.vehicle, e);
                }
            }
        }
        for planned in &moves {
            if let Some(road) = self.roads.get_mut(&planned.to.road) {
                if let Err(e) = road.set_occupant(planned.to.slot, Some(planned.vehicle)) {
                    warn!("Failed to occupy slot for vehicle {}: {}", planned.vehicle, e);
                }
            }
            self.registry.set_position(planned.vehicle, planned.to);
        }

        for planned in &moves {
            let Some(cell) = self
                .roads
                .get(&planned.to.road)
                .and_then(|road| road.cell_at(planned.to.slot).ok())
            else {
                continue;
            };
            self.registry
                .collect_point(planned.vehicle, planned.crossed, cell);
        }

        moves
            .into_iter()
            .map(|m| VehicleMove {
                vehicle: m.vehicle,
                road: m.to.road,
                slot: m.to.slot,
            })
            .collect()
    }

    /// Rotate every light by a quarter turn
    pub fn advance_lights(&mut self) {
        for light in self.lights.values_mut() {
            light.advance();
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn road(&self, key: EdgeKey) -> Option<&RoadSegment> {
        self.roads.get(&key)
    }

    pub fn roads(&self) -> impl Iterator<Item = &RoadSegment> {
        self.roads.values()
    }

    pub fn road_length(&self, key: EdgeKey) -> Option<usize> {
        self.roads.get(&key).map(RoadSegment::length)
    }

    /// Number of vehicles on a road
    pub fn road_traffic(&self, key: EdgeKey) -> Option<usize> {
        self.roads.get(&key).map(RoadSegment::occupied_count)
    }

    /// Vehicle count on every road, indexed `[back][front]` like
    /// [`Topology::adjacency_matrix`]. `None` where no road exists.
    pub fn traffic_matrix(&self) -> Vec<Vec<Option<usize>>> {
        let size = self.topology.node_count();
        let mut matrix = vec![vec![None; size]; size];
        for (key, road) in &self.roads {
            matrix[key.back.0][key.front.0] = Some(road.occupied_count());
        }
        matrix
    }

    pub fn next_road(&self, key: EdgeKey, action: Action) -> Option<&RoadSegment> {
        let next = self.roads.get(&key)?.next_road_key(action)?;
        self.roads.get(&next)
    }

    /// Turns available at the exit of a road, empty for unknown roads
    pub fn available_turns(&self, key: EdgeKey) -> Vec<Action> {
        self.roads
            .get(&key)
            .map(RoadSegment::available_turns)
            .unwrap_or_default()
    }

    /// `Ok(None)` for an unknown road, an error for a slot out of range
    pub fn is_exit_slot(&self, key: EdgeKey, slot: usize) -> Result<Option<bool>, EngineError> {
        self.roads
            .get(&key)
            .map(|road| road.is_exit_slot(slot))
            .transpose()
    }

    /// Map cell a slot is drawn on
    pub fn slot_position(&self, key: EdgeKey, slot: usize) -> Result<Option<GridPos>, EngineError> {
        self.roads
            .get(&key)
            .map(|road| road.cell_at(slot))
            .transpose()
    }

    pub fn node_position(&self, node: NodeId) -> Option<GridPos> {
        self.topology.node(node).map(|n| n.position)
    }

    pub fn traffic_light(&self, node: NodeId) -> Option<&TrafficLight> {
        self.lights.get(&node)
    }

    pub fn traffic_lights(&self) -> impl Iterator<Item = &TrafficLight> {
        self.lights.values()
    }

    /// True when the road's front node has a light currently blocking it
    pub fn is_road_blocked(&self, key: EdgeKey) -> bool {
        self.lights
            .get(&key.front)
            .is_some_and(|light| light.is_blocked(&key))
    }

    pub fn vehicle_position(&self, vehicle: VehicleId) -> Option<VehiclePosition> {
        self.registry.position(vehicle)
    }

    pub fn vehicles(&self) -> impl Iterator<Item = (VehicleId, VehiclePosition)> + '_ {
        self.registry.vehicles()
    }

    pub fn vehicle_count(&self) -> usize {
        self.registry.len()
    }

    /// Positions of every other vehicle
    pub fn vehicle_positions_except(&self, vehicle: VehicleId) -> Vec<VehiclePosition> {
        self.registry
            .vehicles()
            .filter(|(id, _)| *id != vehicle)
            .map(|(_, pos)| pos)
            .collect()
    }

    /// Map cell a vehicle is drawn on
    pub fn vehicle_cell(&self, vehicle: VehicleId) -> Option<GridPos> {
        let position = self.registry.position(vehicle)?;
        self.roads.get(&position.road)?.cell_at(position.slot).ok()
    }

    pub fn points_for(&self, vehicle: VehicleId) -> Option<&[Point]> {
        self.registry.points_for(vehicle)
    }

    pub fn points(&self) -> &BTreeMap<VehicleId, Vec<Point>> {
        self.registry.points()
    }

    /// Outstanding point count, `None` if the vehicle does not collect points
    pub fn points_remaining(&self, vehicle: VehicleId) -> Option<usize> {
        self.registry.points_for(vehicle).map(<[Point]>::len)
    }

    /// Finished flag for every point-collecting vehicle
    pub fn finished_vehicles(&self) -> BTreeMap<VehicleId, bool> {
        self.registry
            .points()
            .iter()
            .map(|(id, points)| (*id, points.is_empty()))
            .collect()
    }

    pub fn is_vehicle_finished(&self, vehicle: VehicleId) -> Option<bool> {
        self.points_remaining(vehicle).map(|left| left == 0)
    }

    /// Every point removed so far, in removal order
    pub fn collected_points(&self) -> &[(VehicleId, Point)] {
        self.registry.collected()
    }
}
