use overworld::{
    Curve, Map, MapDefinition, MapGraph, MapTraversal, NodeKind, NodePolicy, NodeTemplate, Point,
    Rect, TraversalSettings, TraversalState, generate_segment,
};

fn forest() -> MapDefinition {
    MapDefinition {
        name: "Forest".to_string(),
        min_path_length: 3,
        max_path_length: 6,
        total_paths: 3,
        split_chance: Curve::linear(0.2, 0.6),
        max_split_depth: 2,
        split_connection_chance: Curve::constant(0.3),
        nodes_to_generate: vec![
            NodePolicy::new(4, NodeTemplate::new("Trail", NodeKind::Movement)),
            NodePolicy::new(2, NodeTemplate::new("Wolves", NodeKind::Battle {
                scene: "Forest".to_string(),
            })),
        ],
        hidden_nodes_to_generate: vec![NodePolicy::new(1, NodeTemplate::new(
            "Bandits",
            NodeKind::Battle { scene: "Ambush".to_string() },
        ))],
        hidden_node_chance: Curve::constant(0.25),
        ending_nodes: vec![
            NodeTemplate::new("Clearing", NodeKind::Win { message: Some("Out!".to_string()) }),
            NodeTemplate::new("Cave", NodeKind::Win { message: None }),
        ],
        noise_magnitude: Curve::constant(0.6),
        ..MapDefinition::default()
    }
}

fn topology(graph: &MapGraph, paths: &[Vec<overworld::NodeId>]) -> Vec<(u32, u32, usize)> {
    paths
        .iter()
        .flatten()
        .filter_map(|id| graph.node(*id))
        .map(|node| (node.index, node.bonus, node.outgoing.len()))
        .collect()
}

#[test]
fn test_determinism_identical_seeds_produce_identical_segments() {
    let definition = forest();
    let mut left = MapGraph::default();
    let mut right = MapGraph::default();

    let a = generate_segment(&mut left, &definition, 8_675_309).expect("left generation failed");
    let b = generate_segment(&mut right, &definition, 8_675_309).expect("right generation failed");

    assert_eq!(left.node_count(), right.node_count());
    assert_eq!(left.connection_count(), right.connection_count());
    assert_eq!(topology(&left, &a.paths), topology(&right, &b.paths));
}

#[test]
fn test_determinism_fingerprints_follow_the_run_seed() {
    let build = |seed: u64| {
        let mut map = Map::new("Forest", vec![forest(), forest()]).expect("valid definitions");
        map.generate(seed).expect("generation failed");
        map
    };

    assert_eq!(build(77).fingerprint(), build(77).fingerprint());
    assert_ne!(build(77).fingerprint(), build(78).fingerprint());
}

#[test]
fn test_determinism_layout_is_seeded() {
    let positions = || {
        let mut map = Map::new("Forest", vec![forest()]).expect("valid definitions");
        map.generate(5).expect("generation failed");
        map.display(Rect::new(0.0, 0.0, 1280.0, 720.0), Point::new(32.0, 32.0))
            .expect("display failed");
        map.ordered_nodes()
            .into_iter()
            .map(|id| map.graph().node(id).map(|node| node.position))
            .collect::<Vec<_>>()
    };

    assert_eq!(positions(), positions());
}

#[test]
fn test_determinism_same_choices_replay_the_same_events() {
    fn run(seed: u64) -> Vec<String> {
        let map = Map::new("Forest", vec![forest()]).expect("valid definitions");
        let settings = TraversalSettings {
            movement_time: 0.25,
            message_seed: Some(seed),
            ..TraversalSettings::default()
        };
        let mut traversal = MapTraversal::new(vec![map], seed, settings).expect("one map");
        traversal.start().expect("start failed");
        traversal.advance(0.0);

        let mut trace = Vec::new();
        for _ in 0..12 {
            let Some(current) = traversal.current_node() else {
                break;
            };
            let graph = traversal.current_map().expect("active map").graph();
            let Some(next) = graph.successors(current).next() else {
                break;
            };
            assert!(traversal.request_move(next));
            let mut ticks = 0;
            while traversal.advance(0.1) == TraversalState::Moving && ticks < 200 {
                traversal.set_battle_mode(true);
                traversal.set_waiting_to_start(true);
                ticks += 1;
            }
            traversal.set_battle_mode(false);
            traversal.set_waiting_to_start(false);
            trace.extend(traversal.drain_events().iter().map(|event| format!("{event:?}")));
        }
        trace
    }

    assert_eq!(run(31_337), run(31_337));
}
