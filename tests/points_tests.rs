//! Point assignment and collection tests

use std::collections::BTreeSet;

use traffic_grid::simulation::{
    Action, EdgeKey, EngineConfig, GridPos, NodeId, Point, PointAnchor, TrafficEngine, VehicleId,
};

fn edge(back: usize, front: usize) -> EdgeKey {
    EdgeKey::from((back, front))
}

fn engine_with_vehicle(road: EdgeKey, slot: usize, points: Vec<Point>) -> TrafficEngine {
    let mut engine = TrafficEngine::with_sample_map(EngineConfig {
        traffic_light_fraction: 0.0,
        ..EngineConfig::with_seed(0)
    })
    .expect("engine should build");
    engine
        .place_vehicle(VehicleId(1), road, slot)
        .expect("placement should succeed");
    engine
        .assign_points(VehicleId(1), points)
        .expect("vehicle should exist");
    engine
}

fn forward(engine: &mut TrafficEngine) {
    engine.move_cars(&[(VehicleId(1), Action::Forward)]);
}

fn remaining(engine: &TrafficEngine) -> Vec<Point> {
    engine
        .points_for(VehicleId(1))
        .expect("vehicle collects points")
        .to_vec()
}

#[test]
fn test_node_point_then_road_point() {
    let node_point = Point::at_node(NodeId(7), GridPos::new(4, 3));
    let road_point = Point::on_road(GridPos::new(5, 3));
    let mut engine = engine_with_vehicle(edge(6, 7), 5, vec![node_point, road_point]);

    // Crossing node 7 lands on (5, 3) as well, but only one point per move
    forward(&mut engine);
    assert_eq!(engine.vehicle_cell(VehicleId(1)), Some(GridPos::new(5, 3)));
    assert_eq!(remaining(&engine), vec![road_point]);

    // Slot 1 is drawn on the same cell
    forward(&mut engine);
    assert!(remaining(&engine).is_empty());
    assert_eq!(
        engine.collected_points(),
        &[(VehicleId(1), node_point), (VehicleId(1), road_point)]
    );
}

#[test]
fn test_first_matching_point_is_taken() {
    let road_point = Point::on_road(GridPos::new(5, 3));
    let node_point = Point::at_node(NodeId(7), GridPos::new(4, 3));
    let mut engine = engine_with_vehicle(edge(6, 7), 5, vec![road_point, node_point]);

    forward(&mut engine);
    assert_eq!(remaining(&engine), vec![node_point]);
}

#[test]
fn test_road_point_collected_from_either_direction() {
    let point = Point::on_road(GridPos::new(5, 3));

    let mut eastbound = engine_with_vehicle(edge(7, 8), 0, vec![point]);
    forward(&mut eastbound);
    assert_eq!(eastbound.vehicle_cell(VehicleId(1)), Some(GridPos::new(5, 3)));
    assert!(remaining(&eastbound).is_empty());

    let mut westbound = engine_with_vehicle(edge(8, 7), 3, vec![point]);
    assert_eq!(westbound.vehicle_cell(VehicleId(1)), Some(GridPos::new(6, 3)));
    forward(&mut westbound);
    assert_eq!(westbound.vehicle_cell(VehicleId(1)), Some(GridPos::new(5, 3)));
    assert!(remaining(&westbound).is_empty());
}

#[test]
fn test_node_point_needs_a_crossing() {
    let point = Point::at_node(NodeId(7), GridPos::new(4, 3));
    let mut engine = engine_with_vehicle(edge(6, 7), 1, vec![point]);

    for _ in 0..4 {
        forward(&mut engine);
        assert_eq!(remaining(&engine), vec![point]);
    }
    assert_eq!(
        engine.vehicle_position(VehicleId(1)).map(|p| p.slot),
        Some(5)
    );

    engine.move_cars(&[(VehicleId(1), Action::Right)]);
    assert_eq!(
        engine.vehicle_position(VehicleId(1)).map(|p| p.road),
        Some(edge(7, 13))
    );
    assert!(remaining(&engine).is_empty());
}

#[test]
fn test_other_node_is_not_collected() {
    let point = Point::at_node(NodeId(8), GridPos::new(8, 3));
    let mut engine = engine_with_vehicle(edge(6, 7), 5, vec![point]);

    forward(&mut engine);
    assert_eq!(remaining(&engine), vec![point]);
}

#[test]
fn test_blocked_vehicle_collects_nothing() {
    let point = Point::on_road(GridPos::new(2, 3));
    let mut engine = engine_with_vehicle(edge(6, 7), 1, vec![point]);
    engine
        .place_vehicle(VehicleId(2), edge(6, 7), 2)
        .expect("placement should succeed");

    // Vehicle 2 leaves slot 2 this tick, vehicle 1 cannot follow yet
    engine.move_cars(&[(VehicleId(1), Action::Forward), (VehicleId(2), Action::Forward)]);
    assert_eq!(remaining(&engine), vec![point]);

    forward(&mut engine);
    assert!(remaining(&engine).is_empty());
}

#[test]
fn test_vehicle_without_points() {
    let mut engine = TrafficEngine::with_sample_map(EngineConfig {
        traffic_light_fraction: 0.0,
        ..EngineConfig::with_seed(0)
    })
    .expect("engine should build");
    engine
        .place_vehicle(VehicleId(1), edge(6, 7), 5)
        .expect("placement should succeed");

    forward(&mut engine);
    assert!(engine.points_for(VehicleId(1)).is_none());
    assert!(engine.collected_points().is_empty());
}

#[test]
fn test_spawned_points() {
    let engine = TrafficEngine::with_sample_map(EngineConfig {
        vehicle_count: 12,
        points_per_vehicle: 10,
        ..EngineConfig::with_seed(5)
    })
    .expect("engine should build");
    let placement: BTreeSet<GridPos> = engine.topology().placement_cells().into_iter().collect();

    assert_eq!(engine.points().len(), 12);
    for (vehicle, points) in engine.points() {
        assert_eq!(points.len(), 10, "vehicle {vehicle}");

        let unique: BTreeSet<GridPos> = points.iter().map(|p| p.position).collect();
        assert_eq!(unique.len(), 10, "vehicle {vehicle} has duplicate points");

        for point in points {
            assert!(placement.contains(&point.position));
            match point.anchor {
                PointAnchor::Node(node) => {
                    assert_eq!(engine.node_position(node), Some(point.position));
                }
                PointAnchor::Road => {
                    assert!(engine.topology().node_at(point.position).is_none());
                }
            }
        }
    }
}

#[test]
fn test_remaining_and_finished_queries() {
    let road_point = Point::on_road(GridPos::new(5, 3));
    let mut engine = engine_with_vehicle(edge(7, 8), 0, vec![road_point]);
    engine
        .place_vehicle(VehicleId(2), edge(1, 7), 0)
        .expect("placement should succeed");

    assert_eq!(engine.points_remaining(VehicleId(1)), Some(1));
    assert_eq!(engine.is_vehicle_finished(VehicleId(1)), Some(false));
    // Vehicle 2 has no point list, vehicle 3 does not exist
    assert_eq!(engine.points_remaining(VehicleId(2)), None);
    assert_eq!(engine.is_vehicle_finished(VehicleId(2)), None);
    assert_eq!(engine.is_vehicle_finished(VehicleId(3)), None);

    forward(&mut engine);
    assert_eq!(engine.points_remaining(VehicleId(1)), Some(0));
    assert_eq!(engine.is_vehicle_finished(VehicleId(1)), Some(true));
    let finished: Vec<(VehicleId, bool)> = engine.finished_vehicles().into_iter().collect();
    assert_eq!(finished, vec![(VehicleId(1), true)]);
}

#[test]
fn test_finished_vehicles_after_spawn() {
    let engine = TrafficEngine::with_sample_map(EngineConfig {
        vehicle_count: 5,
        points_per_vehicle: 4,
        ..EngineConfig::with_seed(8)
    })
    .expect("engine should build");

    let finished = engine.finished_vehicles();
    assert_eq!(finished.len(), 5);
    assert!(finished.values().all(|done| !done));
    assert!((1..=5).all(|id| engine.points_remaining(VehicleId(id)) == Some(4)));

    // Points need vehicles to own them
    let empty = TrafficEngine::with_sample_map(EngineConfig {
        points_per_vehicle: 4,
        ..EngineConfig::with_seed(8)
    })
    .expect("engine should build");
    assert!(empty.points().is_empty());
    assert!(empty.finished_vehicles().is_empty());
}

#[test]
fn test_traffic_matrix() {
    let mut engine = engine_with_vehicle(edge(6, 7), 1, Vec::new());
    engine
        .place_vehicle(VehicleId(2), edge(6, 7), 4)
        .expect("placement should succeed");
    engine
        .place_vehicle(VehicleId(3), edge(7, 6), 0)
        .expect("placement should succeed");

    let matrix = engine.traffic_matrix();
    assert_eq!(matrix.len(), engine.topology().node_count());
    assert_eq!(matrix[6][7], Some(2));
    assert_eq!(matrix[7][6], Some(1));
    assert_eq!(matrix[7][8], Some(0));
    assert_eq!(matrix[0][7], None);

    // Same shape as the adjacency matrix
    let adjacency = engine.topology().adjacency_matrix();
    for (traffic_row, road_row) in matrix.iter().zip(&adjacency) {
        for (traffic, road) in traffic_row.iter().zip(road_row) {
            assert_eq!(traffic.is_some(), road.is_some());
        }
    }
    assert_eq!(engine.road_traffic(edge(6, 7)), matrix[6][7]);
}
