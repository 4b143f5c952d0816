//! End-to-end pipeline tests: program graph -> commands -> scene mutation.

use std::cell::RefCell;
use std::rc::Rc;

use blockstage::catalog::Catalog;
use blockstage::command::Value;
use blockstage::dispatch::{self, Dispatcher, SessionStatus};
use blockstage::generate::{generate, DiagnosticKind};
use blockstage::program::{Block, ProgramGraph};
use blockstage::scene::{SceneCommands, SceneState};
use blockstage::script::ScriptRunner;

fn catalog() -> Catalog {
    Catalog::builtin().expect("builtin catalog must register")
}

#[test]
fn test_three_block_scenario() {
    // move forward 2, turn left, set light intensity 0.5 -- in that order.
    let mut graph = ProgramGraph::new();
    let a = graph.insert_root(Block::new("move_forward").literal("distance", Value::Number(2.0)));
    let b = graph.insert(Block::new("turn_left"));
    let c = graph.insert(Block::new("set_light_intensity").literal("intensity", Value::Number(0.5)));
    graph.chain(a, b);
    graph.chain(b, c);

    let generated = generate(&graph, &catalog()).unwrap();
    let rendered: Vec<String> = generated.commands.iter().map(|c| c.to_string()).collect();
    assert_eq!(
        rendered,
        vec!["moveForward(2.0)", "turnLeft()", "setLightIntensity(0.5)"]
    );

    let mut scene = SceneState::new();
    let outcome = dispatch::execute(&generated.commands, &mut scene);
    assert!(outcome.clean());
    assert_eq!(outcome.executed, 3);
    assert_eq!(scene.object_position.z, -2.0);
    assert!(scene.object_rotation.y > 1.5);
    assert_eq!(scene.light_intensity, 0.5);
}

#[test]
fn test_empty_workspace_runs_to_nothing() {
    let generated = generate(&ProgramGraph::new(), &catalog()).unwrap();
    assert!(generated.commands.is_empty());
    assert!(generated
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::EmptyProgram));

    let mut scene = SceneState::new();
    let outcome = dispatch::execute(&generated.commands, &mut scene);
    assert_eq!(outcome.executed, 0);
    assert_eq!(scene, SceneState::default());
}

#[test]
fn test_empty_distance_slot_falls_back_to_one() {
    let mut graph = ProgramGraph::new();
    graph.insert_root(Block::new("move_distance"));

    let generated = generate(&graph, &catalog()).unwrap();
    assert_eq!(generated.commands.len(), 1);
    assert_eq!(generated.commands[0].to_string(), "moveForward(1.0)");

    let mut scene = SceneState::new();
    dispatch::execute(&generated.commands, &mut scene);
    assert_eq!(scene.object_position.z, -1.0);
}

#[test]
fn test_cycle_executes_nothing() {
    let mut graph = ProgramGraph::new();
    let root = graph.insert(Block::new("set_light_color"));
    let picker = graph.insert(Block::new("color_picker").nested("colour", root));
    graph
        .get_mut(root)
        .unwrap()
        .inputs
        .insert("color".to_string(), blockstage::program::SlotInput::Block { block: picker });
    graph.push_root(root);

    // Generation fails closed: there is no command list to dispatch at all.
    assert!(generate(&graph, &catalog()).is_err());
}

#[test]
fn test_program_json_round_trip_executes() {
    let json = r##"{
        "blocks": {
            "1": { "kind": "set_background", "inputs": { "color": { "block": 4 } }, "next": 2 },
            "2": { "kind": "turn_degrees", "inputs": { "degrees": 45 }, "next": 3 },
            "3": { "kind": "set_ground_size", "inputs": { "size": 2.5 } },
            "4": { "kind": "color_picker", "inputs": { "colour": "#112233" } }
        },
        "roots": [1]
    }"##;

    let graph = ProgramGraph::from_json(json).unwrap();
    let generated = generate(&graph, &catalog()).unwrap();
    assert_eq!(generated.commands.len(), 3);

    let mut scene = SceneState::new();
    let outcome = dispatch::execute(&generated.commands, &mut scene);
    assert!(outcome.clean());
    assert_eq!(scene.background, "#112233".parse().unwrap());
    assert!((scene.object_rotation.y - 45f32.to_radians()).abs() < 1e-6);
    assert_eq!(scene.ground_size, 2.5);
}

#[test]
fn test_cooperative_run_defers_continuation() {
    let mut graph = ProgramGraph::new();
    let a = graph.insert_root(Block::new("move_forward"));
    let b = graph.insert(Block::new("wait_seconds").literal("seconds", Value::Number(0.5)));
    let c = graph.insert(Block::new("turn_left"));
    graph.chain(a, b);
    graph.chain(b, c);

    let generated = generate(&graph, &catalog()).unwrap();

    let mut scene = SceneState::new();
    let mut dispatcher = Dispatcher::new();
    dispatcher.start(generated.commands);

    // Frame 1: the move lands, the wait suspends the rest.
    assert!(matches!(
        dispatcher.tick(&mut scene, 0.016),
        Some(SessionStatus::Waiting { .. })
    ));
    assert_eq!(scene.object_position.z, -1.0);
    assert_eq!(scene.object_rotation.y, 0.0);

    // Simulated frames at 60fps until the delay elapses.
    let mut frames = 0;
    while dispatcher.is_running() {
        dispatcher.tick(&mut scene, 0.016);
        frames += 1;
        assert!(frames < 100, "session never finished");
    }
    assert!(scene.object_rotation.y > 0.0);

    let outcome = dispatcher.take_outcome().unwrap();
    assert_eq!(outcome.executed, 3);
    assert!(outcome.clean());
}

#[test]
fn test_reset_restores_fixed_point() {
    let mut graph = ProgramGraph::new();
    let a = graph.insert_root(Block::new("move_forward").literal("distance", Value::Number(7.0)));
    let b = graph.insert(Block::new("set_ground_color").literal("color", Value::Color("#ff00ff".parse().unwrap())));
    let c = graph.insert(Block::new("reset_scene"));
    graph.chain(a, b);
    graph.chain(b, c);

    let generated = generate(&graph, &catalog()).unwrap();
    let mut scene = SceneState::new();
    dispatch::execute(&generated.commands, &mut scene);
    assert_eq!(scene, SceneState::default());

    // reset -> reset lands in the same place.
    let mut scene2 = scene.clone();
    scene2.reset().unwrap();
    assert_eq!(scene2, scene);
}

#[test]
fn test_script_backend_matches_dispatcher() {
    let mut graph = ProgramGraph::new();
    let a = graph.insert_root(Block::new("move_backward").literal("distance", Value::Number(3.0)));
    let b = graph.insert(Block::new("set_light_color").literal("color", Value::Color("#abcdef".parse().unwrap())));
    let c = graph.insert(Block::new("turn_degrees").literal("degrees", Value::Number(30.0)));
    graph.chain(a, b);
    graph.chain(b, c);

    let generated = generate(&graph, &catalog()).unwrap();

    let mut via_dispatch = SceneState::new();
    assert!(dispatch::execute(&generated.commands, &mut via_dispatch).clean());

    let shared = Rc::new(RefCell::new(SceneState::new()));
    ScriptRunner::new(shared.clone())
        .run_commands(&generated.commands)
        .unwrap();
    let via_script = shared.borrow();

    assert_eq!(*via_script, via_dispatch);
}
