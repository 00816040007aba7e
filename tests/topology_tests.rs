//! Topology construction and road segment validation tests

use traffic_grid::simulation::{
    Action, Direction, EdgeKey, EngineConfig, GridPos, MapError, MapGrid, NodeId, Tile, Topology,
    TrafficEngine, CARS_PER_CELL,
};

fn edge(back: usize, front: usize) -> EdgeKey {
    EdgeKey::from((back, front))
}

fn sample_topology() -> Topology {
    Topology::build(&MapGrid::sample().expect("sample map should parse"))
        .expect("sample map should build")
}

#[test]
fn test_sample_map_dimensions() {
    let grid = MapGrid::sample().expect("sample map should parse");
    assert_eq!(grid.width(), 21);
    assert_eq!(grid.height(), 10);
    assert_eq!(grid.tile(GridPos::new(0, 0)), Some(Tile::Node));
    assert_eq!(grid.tile(GridPos::new(1, 0)), Some(Tile::HorizontalRoad));
    assert_eq!(grid.tile(GridPos::new(0, 1)), Some(Tile::VerticalRoad));
    assert_eq!(grid.tile(GridPos::new(1, 1)), Some(Tile::Empty));
    assert_eq!(grid.tile(GridPos::new(21, 0)), None);
}

#[test]
fn test_nodes_are_numbered_row_major() {
    let topology = sample_topology();
    assert_eq!(topology.node_count(), 24);
    assert_eq!((topology.width(), topology.height()), (21, 10));

    let expected = [
        (1, GridPos::new(4, 0)),
        (6, GridPos::new(0, 3)),
        (7, GridPos::new(4, 3)),
        (8, GridPos::new(8, 3)),
        (13, GridPos::new(4, 6)),
        (23, GridPos::new(20, 9)),
    ];
    for (id, position) in expected {
        let node = topology.node(NodeId(id)).expect("node should exist");
        assert_eq!(node.position, position, "node {id}");
        assert_eq!(topology.node_at(position), Some(NodeId(id)));
    }
}

#[test]
fn test_node_degrees() {
    let topology = sample_topology();
    assert_eq!(topology.degree(NodeId(7)), 4);
    assert_eq!(topology.degree(NodeId(8)), 3); // blocked above
    assert_eq!(topology.degree(NodeId(2)), 2);
    assert_eq!(topology.degree(NodeId(23)), 1); // dead end
    assert_eq!(topology.degree(NodeId(99)), 0);

    let mut neighbors = topology.neighbors(NodeId(7));
    neighbors.sort();
    assert_eq!(neighbors, vec![NodeId(1), NodeId(6), NodeId(8), NodeId(13)]);
}

#[test]
fn test_road_lengths_and_count() {
    let topology = sample_topology();
    assert_eq!(topology.road_count(), 70);

    let horizontal = topology.road(edge(6, 7)).expect("road should exist");
    assert_eq!(horizontal.length_on_map(), 3);
    assert_eq!(horizontal.heading, Direction::Right);
    assert_eq!(
        horizontal.cells,
        vec![GridPos::new(1, 3), GridPos::new(2, 3), GridPos::new(3, 3)]
    );

    let vertical = topology.road(edge(1, 7)).expect("road should exist");
    assert_eq!(vertical.length_on_map(), 2);
    assert_eq!(vertical.heading, Direction::Down);

    assert!(topology.road(edge(2, 8)).is_none());
    assert!(topology.road(edge(0, 7)).is_none());
}

#[test]
fn test_every_road_has_mirror_of_equal_length() {
    let topology = sample_topology();
    for (key, link) in topology.edges() {
        let mirror = topology
            .road(key.mirror())
            .unwrap_or_else(|| panic!("mirror of {key} missing"));
        assert_eq!(mirror.length_on_map(), link.length_on_map());
        assert_eq!(mirror.heading, link.heading.opposite());
    }
}

#[test]
fn test_turn_classification_at_four_way_node() {
    let topology = sample_topology();

    let from_west = topology.turns(edge(6, 7)).expect("turns should exist");
    assert_eq!(from_west.forward, Some(edge(7, 8)));
    assert_eq!(from_west.left, Some(edge(7, 1)));
    assert_eq!(from_west.right, Some(edge(7, 13)));
    assert_eq!(from_west.back, edge(7, 6));

    let from_north = topology.turns(edge(1, 7)).expect("turns should exist");
    assert_eq!(from_north.get(Action::Forward), Some(edge(7, 13)));
    assert_eq!(from_north.get(Action::Left), Some(edge(7, 8)));
    assert_eq!(from_north.get(Action::Right), Some(edge(7, 6)));
    assert_eq!(from_north.get(Action::Back), Some(edge(7, 1)));

    let from_east = topology.turns(edge(8, 7)).expect("turns should exist");
    assert_eq!(from_east.right, Some(edge(7, 1)));
    assert_eq!(from_east.left, Some(edge(7, 13)));
}

#[test]
fn test_turn_classification_at_t_junction() {
    let topology = sample_topology();

    // Node 8 has nothing above it
    let towards_eight = topology.turns(edge(7, 8)).expect("turns should exist");
    assert_eq!(towards_eight.forward, Some(edge(8, 9)));
    assert_eq!(towards_eight.right, Some(edge(8, 14)));
    assert_eq!(towards_eight.left, None);
    assert_eq!(
        towards_eight.available(),
        vec![Action::Right, Action::Forward, Action::Back]
    );

    // Node 23 is a dead end: only a U-turn is possible
    let dead_end = topology.turns(edge(17, 23)).expect("turns should exist");
    assert_eq!(dead_end.available(), vec![Action::Back]);
}

#[test]
fn test_light_eligible_nodes() {
    let topology = sample_topology();
    let eligible: Vec<usize> = topology
        .light_eligible_nodes()
        .into_iter()
        .map(|n| n.0)
        .collect();
    assert_eq!(
        eligible,
        vec![1, 3, 4, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 21]
    );
}

#[test]
fn test_adjacency_matrix_and_cells() {
    let topology = sample_topology();
    let matrix = topology.adjacency_matrix();
    assert_eq!(matrix.len(), 24);
    assert_eq!(matrix[6][7], Some(3));
    assert_eq!(matrix[7][6], Some(3));
    assert_eq!(matrix[1][7], Some(2));
    assert_eq!(matrix[0][7], None);

    assert_eq!(topology.road_cells().len(), 88);
    assert_eq!(topology.placement_cells().len(), 112);
}

#[test]
fn test_parse_rejects_bad_maps() {
    assert!(matches!(
        MapGrid::parse("x=x\nx="),
        Err(MapError::RaggedRow {
            row: 1,
            found: 2,
            expected: 3
        })
    ));
    assert!(matches!(
        MapGrid::parse("x=?"),
        Err(MapError::UnknownGlyph { glyph: '?', .. })
    ));
    assert!(matches!(MapGrid::parse("   \n"), Err(MapError::Empty)));

    let touching = MapGrid::parse("xx").expect("glyphs are valid");
    assert!(matches!(
        Topology::build(&touching),
        Err(MapError::ZeroLengthRoad { .. })
    ));
}

#[test]
fn test_small_custom_map() {
    let grid = MapGrid::parse("x==x\n|##|\nx==x").expect("map should parse");
    assert_eq!(grid.render(), "x==x\n|##|\nx==x");

    let topology = Topology::build(&grid).expect("map should build");
    assert_eq!(topology.node_count(), 4);
    assert_eq!(topology.road_count(), 8);
    assert!(topology.light_eligible_nodes().is_empty());
    assert_eq!(topology.road(edge(0, 1)).map(|r| r.length_on_map()), Some(2));
    assert_eq!(topology.road(edge(0, 2)).map(|r| r.length_on_map()), Some(1));
}

#[test]
fn test_road_segment_slots() {
    let engine = TrafficEngine::with_sample_map(EngineConfig {
        traffic_light_fraction: 0.0,
        ..EngineConfig::with_seed(0)
    })
    .expect("engine should build");

    let road = engine.road(edge(6, 7)).expect("road should exist");
    assert_eq!(road.length(), 3 * CARS_PER_CELL);
    assert_eq!(road.exit_slot(), 5);
    assert!(road.is_entry_free());
    assert_eq!(road.occupied_count(), 0);
    assert!(road.is_exit_slot(5).expect("slot is in range"));
    assert!(!road.is_exit_slot(0).expect("slot is in range"));

    assert_eq!(road.cell_at(0).ok(), Some(GridPos::new(1, 3)));
    assert_eq!(road.cell_at(1).ok(), Some(GridPos::new(1, 3)));
    assert_eq!(road.cell_at(5).ok(), Some(GridPos::new(3, 3)));
    assert_eq!(road.inverted_slot(0).ok(), Some(5));
    assert_eq!(road.inverted_slot(4).ok(), Some(1));

    // A slot and its inverted slot on the mirror share the same cell
    let mirror = engine.road(edge(7, 6)).expect("mirror should exist");
    for slot in 0..road.length() {
        let inverted = road.inverted_slot(slot).expect("slot is in range");
        assert_eq!(road.cell_at(slot).ok(), mirror.cell_at(inverted).ok());
    }
}

#[test]
fn test_out_of_range_slot_is_invalid_argument() {
    let engine = TrafficEngine::with_sample_map(EngineConfig::with_seed(0))
        .expect("engine should build");
    let road = engine.road(edge(1, 7)).expect("road should exist");

    let err = road.cell_at(4).expect_err("slot 4 is past the end");
    assert!(err.is_invalid_argument());
    assert!(road.occupant(4).is_err());
    assert!(road.is_exit_slot(10).is_err());
    assert!(road.inverted_slot(4).is_err());

    assert!(engine.slot_position(edge(1, 7), 9).is_err());
    assert_eq!(
        engine.slot_position(edge(1, 7), 0).ok().flatten(),
        Some(GridPos::new(4, 1))
    );
    // Unknown roads are soft misses, not errors
    assert!(matches!(engine.slot_position(edge(0, 7), 0), Ok(None)));
    assert!(matches!(engine.is_exit_slot(edge(0, 7), 0), Ok(None)));
}
