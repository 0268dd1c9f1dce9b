use std::cell::Cell;
use std::rc::Rc;

use overworld::{
    Curve, Map, MapDefinition, MapEvent, MapTraversal, NodeKind, NodePolicy, NodeTemplate,
    TravelDirection, TraversalSettings, TraversalState,
};

fn meadow(name: &str, exit_message: Option<&str>) -> MapDefinition {
    MapDefinition {
        name: name.to_string(),
        min_path_length: 2,
        max_path_length: 4,
        total_paths: 2,
        split_chance: Curve::constant(0.4),
        nodes_to_generate: vec![
            NodePolicy::new(3, NodeTemplate::new("Grass", NodeKind::Movement)),
            NodePolicy::new(1, NodeTemplate::new("Slimes", NodeKind::Battle {
                scene: "Meadow".to_string(),
            })),
        ],
        hidden_nodes_to_generate: vec![NodePolicy::new(
            1,
            NodeTemplate::new("Pit", NodeKind::Movement),
        )],
        hidden_node_chance: Curve::constant(0.5),
        ending_nodes: vec![NodeTemplate::new("Gate", NodeKind::Win {
            message: exit_message.map(str::to_string),
        })],
        ..MapDefinition::default()
    }
}

fn is_battle_request(event: &MapEvent) -> bool {
    matches!(event, MapEvent::BattleRequested { .. })
}

/// A segment that leads into another one on the same map.
fn trail(name: &str) -> MapDefinition {
    MapDefinition {
        ending_nodes: vec![NodeTemplate::new("Fork", NodeKind::Movement)],
        ..meadow(name, None)
    }
}

/// Walks the first successor of every node, resolving battles as they come up.
fn play_to_the_end(traversal: &mut MapTraversal, completions: &Rc<Cell<u32>>) -> Vec<MapEvent> {
    let mut events = Vec::new();
    for _ in 0..200 {
        if completions.get() > 0 {
            return events;
        }
        let current = traversal.current_node().expect("player is placed");
        let graph = traversal.current_map().expect("active map").graph();
        let next = graph.successors(current).next().expect("only final exits are dead ends");
        assert!(traversal.request_move(next));

        let mut ticks = 0;
        while traversal.advance(0.05) == TraversalState::Moving {
            if traversal.events().iter().any(is_battle_request) {
                traversal.set_battle_mode(true);
                traversal.set_waiting_to_start(true);
            }
            ticks += 1;
            assert!(ticks < 1_000, "movement stalled");
        }
        traversal.set_battle_mode(false);
        traversal.set_waiting_to_start(false);
        events.extend(traversal.drain_events());
    }
    panic!("run never completed");
}

#[test]
fn test_full_run_across_two_maps() {
    let maps = vec![
        Map::new("Meadow", vec![meadow("Meadow", Some("Onward!"))]).expect("valid definition"),
        Map::new("Hills", vec![trail("Foothills"), meadow("Peak", None)])
            .expect("valid definitions"),
    ];
    let settings = TraversalSettings { message_seed: Some(4), ..TraversalSettings::default() };
    let mut traversal = MapTraversal::new(maps, 1_234, settings).expect("two maps");
    let completions = Rc::new(Cell::new(0));
    let counter = Rc::clone(&completions);
    traversal.on_run_complete(move || counter.set(counter.get() + 1));

    traversal.start().expect("start failed");
    assert_eq!(traversal.advance(0.0), TraversalState::Idle);
    let events = play_to_the_end(&mut traversal, &completions);

    assert_eq!(completions.get(), 1);
    assert_eq!(traversal.current_map_index(), Some(1));
    assert!(events.contains(&MapEvent::MapHidden { map: 0 }));
    assert!(events.contains(&MapEvent::MapEntered { map: 1 }));
    assert!(events.contains(&MapEvent::Say { message: "Onward!".to_string(), duration: 2.0 }));
    assert_eq!(events.last(), Some(&MapEvent::RunCompleted));
    assert!(traversal.maps()[1].final_ends().contains(&traversal.current_node().expect("placed")));
    assert!(
        events.iter().all(|event| !matches!(
            event,
            MapEvent::MoveAccepted { direction: TravelDirection::Backtrack, .. }
        )),
        "forward play never backtracks"
    );

    let battles = events.iter().filter(|event| is_battle_request(event)).count();
    let finished = events.iter().filter(|e| matches!(e, MapEvent::BattleFinished { .. })).count();
    assert_eq!(battles, finished);
}

#[test]
fn test_moving_while_moving_is_rejected_and_keeps_the_current_node() {
    let map = Map::new("Meadow", vec![meadow("Meadow", None)]).expect("valid definition");
    let mut traversal =
        MapTraversal::new(vec![map], 9, TraversalSettings::default()).expect("one map");
    traversal.start().expect("start failed");
    traversal.advance(0.0);

    let start = traversal.current_node().expect("placed on the start");
    let graph = traversal.current_map().expect("active map").graph();
    let next = graph.successors(start).next().expect("start has successors");

    assert!(traversal.request_move(next));
    assert_eq!(traversal.state(), TraversalState::Moving);
    assert!(!traversal.request_move(next));
    assert_eq!(traversal.current_node(), Some(next));
    assert_eq!(traversal.previous_node(), Some(start));
}

#[test]
fn test_unstarted_traversal_is_idle_and_inert() {
    let map = Map::new("Meadow", vec![meadow("Meadow", None)]).expect("valid definition");
    let mut traversal =
        MapTraversal::new(vec![map], 9, TraversalSettings::default()).expect("one map");
    assert_eq!(traversal.state(), TraversalState::Idle);
    assert_eq!(traversal.current_node(), None);
    assert_eq!(traversal.player_position(), None);

    traversal.hide_current_map();
    assert!(traversal.events().is_empty());
}
