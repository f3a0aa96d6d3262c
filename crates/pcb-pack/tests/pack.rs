use glam::DVec2;
use pcb_pack::geometry::rotate_degrees;
use pcb_pack::{
    does_component_violate_bounds, does_component_violate_bounds_outline, find_overlaps, pack,
    pack_component, InputComponent, InputPad, Obstacle, PackEngine, PackError, PackInput,
    PackOrderStrategy, PackOutput, PackPlacementStrategy, Rect, Size, Solver, SolverStatus,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn pad(id: &str, net: &str, w: f64, h: f64, x: f64, y: f64) -> InputPad {
    InputPad {
        pad_id: id.to_string(),
        network_id: net.to_string(),
        shape: Default::default(),
        size: Size::new(w, h),
        offset: DVec2::new(x, y),
    }
}

fn square(id: &str, net: &str, size: f64) -> InputComponent {
    InputComponent {
        component_id: id.to_string(),
        pads: vec![pad(&format!("{id}.1"), net, size, size, 0.0, 0.0)],
        available_rotation_degrees: Vec::new(),
    }
}

/// Two-terminal part with pads along x.
fn two_pin(id: &str, a: &str, b: &str, rotations: &[f64]) -> InputComponent {
    InputComponent {
        component_id: id.to_string(),
        pads: vec![
            pad(&format!("{id}.1"), a, 0.6, 0.8, -0.75, 0.0),
            pad(&format!("{id}.2"), b, 0.6, 0.8, 0.75, 0.0),
        ],
        available_rotation_degrees: rotations.to_vec(),
    }
}

/// Small IC with pins on two sides.
fn ic(id: &str, nets: &[&str]) -> InputComponent {
    let per_side = nets.len().div_ceil(2);
    let pads = nets
        .iter()
        .enumerate()
        .map(|(i, net)| {
            let (x, row) = if i < per_side { (-2.0, i) } else { (2.0, i - per_side) };
            pad(&format!("{id}.{}", i + 1), net, 1.0, 0.5, x, row as f64 - 1.5)
        })
        .collect();
    InputComponent {
        component_id: id.to_string(),
        pads,
        available_rotation_degrees: vec![0.0, 90.0, 180.0, 270.0],
    }
}

fn board() -> Vec<InputComponent> {
    vec![
        ic("U1", &["VCC", "SDA", "SCL", "GND", "OUT", "EN", "NC1", "VCC"]),
        two_pin("C1", "VCC", "GND", &[0.0, 90.0]),
        two_pin("C2", "VCC", "GND", &[0.0, 90.0]),
        two_pin("R1", "SDA", "VCC", &[]),
        two_pin("R2", "SCL", "VCC", &[]),
        two_pin("R3", "EN", "GND", &[90.0]),
        square("TP1", "OUT", 1.0),
        square("MH1", "", 2.5),
    ]
}

fn assert_pad_invariant(input: &PackInput, output: &PackOutput) {
    for packed in &output.components {
        let original = input
            .components
            .iter()
            .find(|c| c.component_id == packed.component_id)
            .unwrap();
        assert!(
            original
                .allowed_rotations()
                .contains(&packed.ccw_rotation_offset_degrees),
            "{} has rotation {}",
            packed.component_id,
            packed.ccw_rotation_offset_degrees
        );
        for pad in &packed.pads {
            let expected =
                packed.center + rotate_degrees(pad.offset, packed.ccw_rotation_offset_degrees);
            assert!(
                pad.absolute_center.distance(expected) < 1e-9,
                "{} is at {:?}, expected {:?}",
                pad.pad_id,
                pad.absolute_center,
                expected
            );
        }
    }
}

#[test]
fn test_board_packs_without_overlaps() {
    init_logging();
    let input = PackInput::new(board()).with_min_gap(0.2);
    let output = pack(input.clone()).unwrap();

    assert_eq!(output.components.len(), input.components.len());
    let overlaps = find_overlaps(&output.components, &[], input.min_gap);
    assert!(overlaps.is_empty(), "{overlaps:?}");
    assert_pad_invariant(&input, &output);

    // Largest first: the IC is pinned at the origin
    assert_eq!(output.components[0].component_id, "U1");
    assert_eq!(output.components[0].center, DVec2::ZERO);
}

#[test]
fn test_every_objective_and_order_produces_valid_packs() {
    init_logging();
    let objectives = [
        PackPlacementStrategy::MinimumSumDistanceToNetwork,
        PackPlacementStrategy::MinimumSumSquaredDistanceToNetwork,
        PackPlacementStrategy::ShortestConnectionAlongOutline,
    ];
    let orders = [
        PackOrderStrategy::LargestToSmallest,
        PackOrderStrategy::SmallestToLargest,
        PackOrderStrategy::InputOrder,
    ];
    for objective in objectives {
        for order in orders {
            let input = PackInput::new(board())
                .with_min_gap(0.25)
                .with_placement_strategy(objective)
                .with_order_strategy(order);
            let output = pack(input.clone())
                .unwrap_or_else(|e| panic!("{objective:?} / {order:?}: {e}"));
            assert!(find_overlaps(&output.components, &[], input.min_gap).is_empty());
            assert_pad_invariant(&input, &output);
        }
    }
}

#[test]
fn test_second_component_sits_one_gap_from_its_network() {
    let input =
        PackInput::new(vec![square("A", "N", 1.0), square("B", "N", 1.0)]).with_min_gap(0.5);
    let output = pack(input).unwrap();

    let a = &output.components[0];
    let b = &output.components[1];
    assert_eq!(a.center, DVec2::ZERO);
    assert_ne!(b.center, DVec2::ZERO);

    // Any placement clear of A needs its pad at least size + gap away, so
    // landing exactly there beats every other point on the outline.
    let distance = a.pads[0].absolute_center.distance(b.pads[0].absolute_center);
    assert!((distance - 1.5).abs() < 1e-6, "distance = {distance}");
}

#[test]
fn test_connected_parts_cluster_closer_than_unconnected_ones() {
    let input = PackInput::new(vec![
        square("HUB", "X", 2.0),
        square("NEAR", "X", 1.0),
        square("FAR", "Y", 1.0),
    ])
    .with_min_gap(0.5)
    .with_order_strategy(PackOrderStrategy::InputOrder);
    let output = pack(input).unwrap();

    let center = |id: &str| {
        output
            .components
            .iter()
            .find(|c| c.component_id == id)
            .unwrap()
            .center
    };
    assert!(center("NEAR").length() <= center("FAR").length() + 1e-9);
    // Unconnected parts go in the default direction
    assert!(center("FAR").x > 0.0);
}

#[test]
fn test_component_at_origin_fits_square_bounds_outline() {
    let outline = Rect::new(-5.0, -5.0, 5.0, 5.0).corners().to_vec();
    let component = square("U1", "", 2.0);
    let at_origin = pack_component(&component, DVec2::ZERO, 0.0);
    assert!(!does_component_violate_bounds_outline(&at_origin, &outline, 1.0));

    let input = PackInput::new(vec![component])
        .with_min_gap(1.0)
        .with_bounds_outline(outline);
    let output = pack(input).unwrap();
    assert_eq!(output.components[0].center, DVec2::ZERO);
}

#[test]
fn test_components_stay_inside_concave_bounds_outline() {
    // L-shaped board around the origin
    let outline = vec![
        DVec2::new(-3.0, -3.0),
        DVec2::new(6.0, -3.0),
        DVec2::new(6.0, 1.0),
        DVec2::new(1.0, 1.0),
        DVec2::new(1.0, 6.0),
        DVec2::new(-3.0, 6.0),
    ];
    let components = vec![
        square("A", "N", 1.0),
        square("B", "N", 1.0),
        square("C", "M", 1.0),
        square("D", "N", 1.0),
    ];
    let input = PackInput::new(components)
        .with_min_gap(0.2)
        .with_bounds_outline(outline.clone());
    let output = pack(input).unwrap();

    for component in &output.components {
        assert!(
            !does_component_violate_bounds_outline(component, &outline, 0.2),
            "{} at {:?}",
            component.component_id,
            component.center
        );
    }
    assert!(find_overlaps(&output.components, &[], 0.2).is_empty());
}

#[test]
fn test_components_stay_inside_rect_bounds() {
    let bounds = Rect::new(-4.0, -4.0, 4.0, 4.0);
    let input = PackInput::new(vec![
        two_pin("R1", "A", "B", &[0.0, 90.0]),
        two_pin("R2", "B", "C", &[0.0, 90.0]),
        two_pin("R3", "C", "D", &[0.0, 90.0]),
        two_pin("R4", "D", "A", &[0.0, 90.0]),
    ])
    .with_min_gap(0.3)
    .with_bounds(bounds);
    let output = pack(input.clone()).unwrap();

    for component in &output.components {
        assert!(!does_component_violate_bounds(component, &bounds, 0.3));
    }
    assert!(find_overlaps(&output.components, &[], 0.3).is_empty());
    assert_pad_invariant(&input, &output);
}

#[test]
fn test_only_rotation_is_used() {
    let input = PackInput::new(vec![
        two_pin("R1", "A", "B", &[90.0]),
        two_pin("R2", "B", "C", &[90.0]),
    ])
    .with_min_gap(0.2);
    let output = pack(input).unwrap();

    for component in &output.components {
        assert_eq!(component.ccw_rotation_offset_degrees, 90.0);
        let d = component.pads[1].absolute_center - component.pads[0].absolute_center;
        assert!(d.y.abs() > d.x.abs(), "{}: {d:?}", component.component_id);
    }
}

#[test]
fn test_obstacles_are_avoided() {
    let obstacles = vec![
        Obstacle {
            obstacle_id: "KEEPOUT1".to_string(),
            absolute_center: DVec2::new(2.5, 0.0),
            width: 2.0,
            height: 6.0,
        },
        Obstacle {
            obstacle_id: "KEEPOUT2".to_string(),
            absolute_center: DVec2::new(-2.5, 0.0),
            width: 2.0,
            height: 2.0,
        },
    ];
    let input = PackInput::new(vec![
        square("A", "N", 1.0),
        square("B", "N", 1.0),
        square("C", "N", 1.0),
        square("D", "M", 1.0),
    ])
    .with_min_gap(0.4)
    .with_obstacles(obstacles.clone());
    let output = pack(input).unwrap();

    let overlaps = find_overlaps(&output.components, &obstacles, 0.4);
    assert!(overlaps.is_empty(), "{overlaps:?}");
}

#[test]
fn test_failure_names_the_component_and_keeps_no_partial_result() {
    let input = PackInput::new(vec![square("BIG", "N", 2.0), square("SMALL", "N", 1.0)])
        .with_bounds(Rect::new(-1.0, -1.0, 1.0, 1.0));

    assert_eq!(
        pack(input.clone()),
        Err(PackError::NoValidPlacement {
            component_id: "SMALL".to_string()
        })
    );

    let mut engine = PackEngine::new(input);
    let err = engine.solve(100_000).unwrap_err();
    assert_eq!(err.component_id(), Some("SMALL"));
    assert_eq!(engine.status(), SolverStatus::Failed);
    assert!(engine.output().is_none());
}

#[test]
fn test_stepping_matches_solve() {
    let input = PackInput::new(board()).with_min_gap(0.2);
    let solved = pack(input.clone()).unwrap();

    let mut engine = PackEngine::new(input);
    let mut steps = 0;
    while engine.status() == SolverStatus::Running {
        engine.step();
        steps += 1;
        assert!(steps < 1_000_000);
    }
    assert_eq!(engine.output(), Some(solved));
}

#[test]
fn test_packing_is_deterministic() {
    let input = PackInput::new(board()).with_min_gap(0.15);
    assert_eq!(pack(input.clone()), pack(input));
}

#[test]
fn test_json_input_and_output() {
    let json = r#"{
        "components": [
            {
                "component_id": "R1",
                "pads": [
                    { "pad_id": "R1.1", "network_id": "A", "size": { "x": 0.6, "y": 0.8 }, "offset": { "x": -0.75, "y": 0.0 } },
                    { "pad_id": "R1.2", "network_id": "B", "size": { "x": 0.6, "y": 0.8 }, "offset": { "x": 0.75, "y": 0.0 } }
                ]
            },
            {
                "component_id": "R2",
                "pads": [
                    { "pad_id": "R2.1", "network_id": "B", "shape": "rect", "size": { "x": 0.6, "y": 0.8 }, "offset": { "x": -0.75, "y": 0.0 } }
                ],
                "available_rotation_degrees": [0, 180]
            }
        ],
        "min_gap": 0.2,
        "pack_order_strategy": "input_order",
        "pack_placement_strategy": "minimum_sum_distance_to_network"
    }"#;
    let input: PackInput = serde_json::from_str(json).unwrap();
    let output = pack(input).unwrap();

    let value = serde_json::to_value(&output).unwrap();
    let components = value["components"].as_array().unwrap();
    assert_eq!(components.len(), 2);
    assert_eq!(components[0]["component_id"], "R1");
    assert!(components[1]["pads"][0]["absolute_center"]["x"].is_number());

    let back: PackOutput = serde_json::from_value(value).unwrap();
    assert_eq!(back, output);
}
