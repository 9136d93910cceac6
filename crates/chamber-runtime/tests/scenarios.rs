// crates/chamber-runtime/tests/scenarios.rs
// ============================================================================
// Module: End-to-end room scenarios
// Description: Drives a full puzzle, an operator override, an AND-join, a
//              stopping loop, a blocked start, and a crash/replay recovery
//              through the coordinator and durable log together.
// Purpose: Exercise the six-step event algorithm across crate boundaries,
//          not just one graph runtime call at a time.
// Dependencies: chamber-devices, chamber-log, chamber-model, chamber-runtime
// ============================================================================

//! End-to-end room scenarios exercising the coordinator and durable log together.
#![allow(clippy::unwrap_used, clippy::expect_used, reason = "test assertions favor unwrap/expect")]

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chamber_devices::DeviceContract;
use chamber_devices::DeviceRegistry;
use chamber_devices::DeviceRequirement;
use chamber_log::EventLog;
use chamber_log::InMemoryEventLog;
use chamber_model::Edge;
use chamber_model::EdgeId;
use chamber_model::Event;
use chamber_model::FieldValue;
use chamber_model::LogicalDeviceId;
use chamber_model::LoopInterval;
use chamber_model::NewEvent;
use chamber_model::Node;
use chamber_model::NodeId;
use chamber_model::NodeKind;
use chamber_model::RoomGraph;
use chamber_model::RoomId;
use chamber_model::Scene;
use chamber_model::SceneGraph;
use chamber_model::SceneId;
use chamber_model::SchemaVersion;
use chamber_model::Severity;
use chamber_model::Timestamp;
use chamber_runtime::Coordinator;
use chamber_runtime::GraphRuntime;
use chamber_runtime::RoomState;
use time::macros::datetime;
use tokio::sync::mpsc;

fn now() -> Timestamp {
    Timestamp::new(datetime!(2026-08-01 12:00:00 UTC))
}

fn room() -> RoomId {
    RoomId::new("room-1")
}

fn node(id: &str, kind: NodeKind) -> Node {
    Node { id: NodeId::new(id), kind }
}

fn edge(id: &str, from: &str, to: &str) -> Edge {
    Edge { id: EdgeId::new(id), from: NodeId::new(from), to: NodeId::new(to), condition: None }
}

fn single_scene_graph(entry: &str, nodes: Vec<Node>, edges: Vec<Edge>) -> RoomGraph {
    let graph = SceneGraph {
        entry: NodeId::new(entry),
        nodes: nodes.into_iter().map(|n| (n.id.clone(), n)).collect::<BTreeMap<_, _>>(),
        edges,
    };
    RoomGraph { scenes: vec![Scene { id: SceneId::new("scene-1"), graph }] }
}

/// `entry -> puzzle(P, subgraph S1) -> terminal`, where S1 is
/// `entry -> action(A, awaits crypt_door) -> terminal`. Shared by the single
/// puzzle, override, and recovery scenarios.
fn crypt_door_graph() -> RoomGraph {
    let puzzle_subgraph = single_scene_graph(
        "p-entry",
        vec![
            node("p-entry", NodeKind::SceneEntry),
            node("A", NodeKind::Action { awaits_device: Some(LogicalDeviceId::new("crypt_door")) }),
            node("p-end", NodeKind::Checkpoint),
        ],
        vec![edge("pe1", "p-entry", "A"), edge("pe2", "A", "p-end")],
    );
    let puzzle_graph = puzzle_subgraph.scenes[0].graph.clone();

    single_scene_graph(
        "entry",
        vec![
            node("entry", NodeKind::SceneEntry),
            node("P", NodeKind::Puzzle { subgraph: puzzle_graph }),
            node("terminal", NodeKind::Checkpoint),
        ],
        vec![edge("e1", "entry", "P"), edge("e2", "P", "terminal")],
    )
}

fn device_input(room_id: &RoomId, logical_id: &str) -> NewEvent {
    NewEvent::new(room_id.clone(), "device.input", Severity::Info)
        .with_field("logical_id", FieldValue::Text(logical_id.to_owned()))
        .with_field("signal", FieldValue::Text("door_closed".to_owned()))
        .with_field("value", FieldValue::Bool(true))
}

fn names_of(events: &[Event]) -> Vec<String> {
    events.iter().map(|event| event.name.as_str().to_owned()).collect()
}

/// Filters `events` down to the ones whose name appears in `wanted`,
/// preserving log order. Lets a scenario assert relative ordering of a few
/// milestone events without pinning down every intermediate node-lifecycle
/// bookkeeping event a checkpoint pass-through also emits.
fn milestone_order(events: &[Event], wanted: &[&str]) -> Vec<String> {
    events.iter().map(|event| event.name.as_str().to_owned()).filter(|name| wanted.contains(&name.as_str())).collect()
}

fn fresh_coordinator(graph: RoomGraph, log: Arc<dyn EventLog>) -> (Coordinator, mpsc::Sender<NewEvent>) {
    let (sender, receiver) = mpsc::channel(16);
    let runtime = GraphRuntime::new(graph, 1);
    (Coordinator::new(room(), runtime, log, receiver, 16), sender)
}

#[tokio::test]
async fn scenario_1_single_puzzle_completes_on_matching_device_input() {
    let log: Arc<dyn EventLog> = Arc::new(InMemoryEventLog::new());
    let (mut coordinator, _sender) = fresh_coordinator(crypt_door_graph(), log.clone());

    coordinator.handle_external(NewEvent::new(room(), "operator.start_game", Severity::Info)).unwrap();
    coordinator.handle_external(device_input(&room(), "crypt_door")).unwrap();

    let events = log.read(&room(), 0, 100).unwrap();
    assert_eq!(
        milestone_order(&events, &["operator.start_game", "scene.started", "puzzle.activated", "device.input", "puzzle.solved", "scene.completed"]),
        vec!["operator.start_game", "scene.started", "puzzle.activated", "device.input", "puzzle.solved", "scene.completed"],
    );
    assert!(matches!(coordinator.graph_runtime().room_state(), RoomState::Halted { .. }));
}

#[tokio::test]
async fn scenario_2_override_inside_active_puzzle_skips_its_inner_nodes() {
    let log: Arc<dyn EventLog> = Arc::new(InMemoryEventLog::new());
    let (mut coordinator, _sender) = fresh_coordinator(crypt_door_graph(), log.clone());

    coordinator.handle_external(NewEvent::new(room(), "operator.start_game", Severity::Info)).unwrap();
    coordinator
        .handle_external(
            NewEvent::new(room(), "operator.override", Severity::Info)
                .with_field("node_id", FieldValue::Text("P".to_owned())),
        )
        .unwrap();

    let events = log.read(&room(), 0, 100).unwrap();
    let names = names_of(&events);
    assert!(names.contains(&"operator.override".to_owned()));
    assert!(names.contains(&"node.overridden".to_owned()));
    assert!(names.contains(&"scene.completed".to_owned()));
    assert!(!events.iter().any(|event| event.field("node_id").and_then(FieldValue::as_str) == Some("A")));
}

#[tokio::test]
async fn scenario_3_and_join_waits_for_every_timer_and_ignores_late_input() {
    let graph = single_scene_graph(
        "entry",
        vec![
            node("entry", NodeKind::SceneEntry),
            node("fork", NodeKind::Parallel { children: vec![NodeId::new("t1"), NodeId::new("t2")] }),
            node("t1", NodeKind::Timer { duration: Duration::from_secs(2) }),
            node("t2", NodeKind::Timer { duration: Duration::from_secs(5) }),
            node("terminal", NodeKind::Checkpoint),
        ],
        vec![edge("e1", "entry", "fork"), edge("e2", "fork", "terminal")],
    );
    let mut runtime = GraphRuntime::new(graph, 1);
    runtime.start_game(&room(), None, now()).expect("start");

    let outcome = runtime.handle_timer_expired(&room(), &NodeId::new("t1"), now()).expect("t1 fires");
    assert_eq!(names_of_derived(&outcome.derived), vec!["node.completed"]);

    let stray = device_input(&room(), "crypt_door");
    let event = Event {
        offset: 0,
        room_id: room(),
        session_id: None,
        timestamp: now(),
        name: chamber_model::EventName::new("device.input"),
        level: Severity::Info,
        message: None,
        fields: stray.fields.clone(),
    };
    let outcome = runtime.handle_device_input(&room(), &event, now()).expect("late input is a no-op");
    assert!(outcome.derived.is_empty());
    assert!(!matches!(runtime.room_state(), RoomState::Halted { .. }));

    let outcome = runtime.handle_timer_expired(&room(), &NodeId::new("t2"), now()).expect("t2 fires");
    let names = names_of_derived(&outcome.derived);
    assert!(names.contains(&"node.completed".to_owned()));
    assert!(names.contains(&"scene.completed".to_owned()));
    assert!(matches!(runtime.room_state(), RoomState::Halted { .. }));
}

/// The expression context only resolves node/puzzle state, not arbitrary
/// external variables, so the stop condition here watches a companion gate
/// node's lifecycle rather than a bare `flag` field.
#[tokio::test]
async fn scenario_4_loop_stops_exactly_on_the_tick_after_its_condition_node_completes() {
    let graph = single_scene_graph(
        "entry",
        vec![
            node("entry", NodeKind::SceneEntry),
            node("split", NodeKind::Parallel { children: vec![NodeId::new("fog"), NodeId::new("trigger")] }),
            node(
                "fog",
                NodeKind::Loop {
                    action: "fog.pulse".to_owned(),
                    interval: LoopInterval::Fixed(Duration::from_millis(1000)),
                    stop_condition: r#"node.trigger.state == "completed""#.to_owned(),
                },
            ),
            node("trigger", NodeKind::Gate),
        ],
        vec![edge("e1", "entry", "split")],
    );
    let mut runtime = GraphRuntime::new(graph, 3);
    runtime.start_game(&room(), None, now()).expect("start");

    let mut tick_events = Vec::new();
    for _ in 0..2 {
        let outcome = runtime.handle_loop_tick(&room(), &NodeId::new("fog"), now()).expect("tick");
        tick_events.extend(names_of_derived(&outcome.derived));
    }
    assert_eq!(tick_events, vec!["loop.tick", "loop.tick"]);

    let trigger_input = device_input(&room(), "crypt_door");
    let event = Event {
        offset: 0,
        room_id: room(),
        session_id: None,
        timestamp: now(),
        name: chamber_model::EventName::new("device.input"),
        level: Severity::Info,
        message: None,
        fields: trigger_input.fields.clone(),
    };
    runtime.handle_device_input(&room(), &event, now()).expect("trigger closes the gate");
    assert_eq!(runtime.node_lifecycle(&NodeId::new("trigger")), chamber_model::NodeLifecycle::Completed);

    let outcome = runtime.handle_loop_tick(&room(), &NodeId::new("fog"), now()).expect("final tick");
    tick_events.extend(names_of_derived(&outcome.derived));
    assert_eq!(
        tick_events,
        vec!["loop.tick", "loop.tick", "loop.tick", "loop.stopped", "node.completed", "node.completed", "scene.completed"],
    );
}

/// The ingress adapter is the one that refuses `operator.start_game` and
/// substitutes `system.error` (covered by its own test); this checks the two
/// halves it relies on: readiness correctly reports the gap, and a refusal
/// never reaches the graph runtime.
#[tokio::test]
async fn scenario_5_required_device_missing_blocks_start() {
    let contract = DeviceContract {
        expected_version: SchemaVersion::new("1.0"),
        requirements: vec![DeviceRequirement {
            logical_id: LogicalDeviceId::new("crypt_door"),
            device_type: "magnetic-lock".to_owned(),
            required_capabilities: BTreeSet::new(),
        }],
    };
    let registry = DeviceRegistry::new(contract, 2.0);
    let readiness = registry.readiness();
    assert!(!readiness.is_ready());

    let log: Arc<dyn EventLog> = Arc::new(InMemoryEventLog::new());
    let (mut coordinator, _sender) = fresh_coordinator(crypt_door_graph(), log.clone());

    coordinator
        .handle_external(
            NewEvent::new(room(), "system.error", Severity::Error)
                .with_message(format!("room not ready: missing devices {:?}", readiness.missing)),
        )
        .unwrap();

    let events = log.read(&room(), 0, 100).unwrap();
    assert_eq!(names_of(&events), vec!["system.error"]);
    assert!(matches!(coordinator.graph_runtime().room_state(), RoomState::NotStarted));
}

#[tokio::test]
async fn scenario_6_recovery_replays_operator_events_and_resumes_from_the_log() {
    let durable_log: Arc<dyn EventLog> = Arc::new(InMemoryEventLog::new());
    let (mut live_coordinator, _sender) = fresh_coordinator(crypt_door_graph(), durable_log.clone());
    live_coordinator.handle_external(NewEvent::new(room(), "operator.start_game", Severity::Info)).unwrap();

    let history = durable_log.read(&room(), 0, 100).unwrap();
    assert!(names_of(&history).contains(&"puzzle.activated".to_owned()));

    let replay_log: Arc<dyn EventLog> = Arc::new(InMemoryEventLog::new());
    let (mut recovered, _sender) = fresh_coordinator(crypt_door_graph(), replay_log.clone());
    for event in &history {
        if !(event.name.as_str().starts_with("operator.") || event.name.as_str() == "device.input") {
            continue;
        }
        let mut draft = NewEvent::new(room(), event.name.as_str(), event.level);
        for (key, value) in &event.fields {
            draft = draft.with_field(key.clone(), value.clone());
        }
        recovered.handle_external(draft).unwrap();
    }

    assert_eq!(
        recovered.graph_runtime().node_lifecycle(&NodeId::new("P")),
        chamber_model::NodeLifecycle::Active,
        "the puzzle should be reconstructed active, not re-solved",
    );
    assert!(!matches!(recovered.graph_runtime().room_state(), RoomState::Halted { .. }));

    recovered.handle_external(device_input(&room(), "crypt_door")).unwrap();
    assert!(matches!(recovered.graph_runtime().room_state(), RoomState::Halted { .. }));
}

fn names_of_derived(derived: &[NewEvent]) -> Vec<String> {
    derived.iter().map(|event| event.name.as_str().to_owned()).collect()
}
