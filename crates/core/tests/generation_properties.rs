use std::collections::{HashSet, VecDeque};

use overworld::{
    Curve, Map, MapDefinition, MapGraph, NodeId, NodeKind, NodePolicy, NodeTag, NodeTemplate,
    PlacementRules, generate_segment,
};
use proptest::{
    arbitrary::any,
    test_runner::{Config as ProptestConfig, TestCaseError, TestRunner},
};
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};

fn between(rng: &mut ChaCha8Rng, min: u32, max: u32) -> u32 {
    min + (rng.next_u32() % (max - min + 1))
}

fn unit(rng: &mut ChaCha8Rng) -> f32 {
    (rng.next_u32() >> 8) as f32 / (1_u32 << 24) as f32
}

fn random_definition(rng: &mut ChaCha8Rng, name: &str) -> MapDefinition {
    let min_path_length = between(rng, 1, 5);
    let min_split_amount = between(rng, 1, 3);
    let battle = NodeTemplate::new("Ambush", NodeKind::Battle { scene: "Battle".to_string() })
        .with_rules(PlacementRules { not_after: vec![NodeTag::Battle], max_per_path: Some(2) });
    let road = NodeTemplate::new("Road", NodeKind::Movement);
    MapDefinition {
        name: name.to_string(),
        min_path_length,
        max_path_length: min_path_length + between(rng, 0, 3),
        total_paths: between(rng, 1, 4),
        split_chance: Curve::linear(unit(rng), unit(rng)),
        min_split_amount,
        max_split_amount: min_split_amount + between(rng, 0, 2),
        split_decay: unit(rng),
        max_split_depth: between(rng, 0, 3),
        max_bonus_splits: between(rng, 0, 3),
        split_connection_chance: Curve::constant(unit(rng)),
        detour_chance: Curve::constant(unit(rng)),
        nodes_to_generate: vec![
            NodePolicy::new(between(rng, 0, 4) as i32, road),
            NodePolicy::new(between(rng, 0, 4) as i32, battle.clone()),
        ],
        hidden_nodes_to_generate: vec![NodePolicy::new(1, battle)],
        hidden_node_chance: Curve::constant(unit(rng)),
        ending_nodes: (0..between(rng, 1, 3))
            .map(|i| NodeTemplate::new(format!("Exit {i}"), NodeKind::Win { message: None }))
            .collect(),
        noise_magnitude: Curve::constant(unit(rng)),
        ..MapDefinition::default()
    }
}

fn visible_nodes(graph: &MapGraph) -> Vec<NodeId> {
    graph.nodes().filter(|(_, node)| !node.hidden).map(|(id, _)| id).collect()
}

fn check_map(map: &Map) -> Result<(), String> {
    let graph = map.graph();
    let start = map.start_node().ok_or("map has no start")?;
    let final_ends: HashSet<NodeId> = map.final_ends().iter().copied().collect();

    for id in visible_nodes(graph) {
        let node = graph.node(id).ok_or("dangling node id")?;
        if id == start {
            if !node.incoming.is_empty() {
                return Err(format!("start {} has incoming edges", node.name));
            }
        } else if node.incoming.is_empty() {
            return Err(format!("{} has no incoming edge", node.name));
        }
        if final_ends.contains(&id) {
            if !node.outgoing.is_empty() {
                return Err(format!("end {} has outgoing edges", node.name));
            }
        } else if node.outgoing.is_empty() {
            return Err(format!("{} has no outgoing edge", node.name));
        }
    }

    let mut owners = HashSet::new();
    for (_, connection) in graph.connections() {
        for hidden in &connection.hidden_nodes {
            let node = graph.node(*hidden).ok_or("dangling hidden node")?;
            if !node.hidden || !node.incoming.is_empty() || !node.outgoing.is_empty() {
                return Err(format!("hidden node {} is wired into the graph", node.name));
            }
            if !owners.insert(*hidden) {
                return Err(format!("hidden node {} sits on two connections", node.name));
            }
        }
    }
    let hidden_total = graph.nodes().filter(|(_, node)| node.hidden).count();
    if owners.len() != hidden_total {
        return Err("a hidden node is not attached to any connection".to_string());
    }

    let mut reached = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(id) = queue.pop_front() {
        for next in graph.successors(id) {
            if reached.insert(next) {
                queue.push_back(next);
            }
        }
    }
    if reached.len() != visible_nodes(graph).len() {
        return Err(format!(
            "{} of {} visible nodes are reachable from the start",
            reached.len(),
            visible_nodes(graph).len()
        ));
    }

    for segment in map.segments() {
        let members: HashSet<NodeId> = segment.node_ids().into_iter().collect();
        for id in &members {
            let from = graph.node(*id).ok_or("dangling path node")?;
            for next in graph.successors(*id).filter(|next| members.contains(next)) {
                let to = graph.node(next).ok_or("dangling successor")?;
                if to.distance < from.distance {
                    return Err(format!(
                        "{} ({}) -> {} ({}) runs backwards",
                        from.name, from.distance, to.name, to.distance
                    ));
                }
            }
        }
    }
    Ok(())
}

#[test]
fn test_random_definitions_keep_graph_invariants() {
    let mut runner = TestRunner::new(ProptestConfig::with_cases(64));
    let seeds = (any::<u64>(), any::<u64>());

    runner
        .run(&seeds, |(definition_seed, run_seed)| {
            let mut rng = ChaCha8Rng::seed_from_u64(definition_seed);
            let definitions = (0..between(&mut rng, 1, 3))
                .map(|i| random_definition(&mut rng, &format!("Segment {i}")))
                .collect();
            let mut map = Map::new("Fuzzed", definitions)
                .map_err(|error| TestCaseError::fail(error.to_string()))?;
            map.generate(run_seed).map_err(|error| TestCaseError::fail(error.to_string()))?;
            check_map(&map).map_err(TestCaseError::fail)?;
            Ok(())
        })
        .expect("generated maps should stay connected and monotonic");
}

#[test]
fn test_two_step_single_path_scenario() {
    let definition = MapDefinition {
        name: "Scenario".to_string(),
        min_path_length: 2,
        max_path_length: 2,
        total_paths: 1,
        split_chance: Curve::constant(0.0),
        nodes_to_generate: vec![NodePolicy::new(1, NodeTemplate::new("Road", NodeKind::Movement))],
        ending_nodes: vec![NodeTemplate::new("Exit", NodeKind::Win { message: None })],
        ..MapDefinition::default()
    };
    let mut graph = MapGraph::default();

    let segment = generate_segment(&mut graph, &definition, 2_024).expect("generation failed");

    assert_eq!(segment.paths.len(), 1);
    let [start, first, second, end] = segment.paths[0].as_slice() else {
        panic!("expected start, two interior nodes and an end");
    };
    assert_eq!(segment.start, *start);
    assert_eq!(segment.ends, vec![*end]);
    assert_eq!(graph.connection_count(), 3);
    assert!(graph.connection_between(*start, *first).is_some());
    assert!(graph.connection_between(*first, *second).is_some());
    assert!(graph.connection_between(*second, *end).is_some());
    assert_eq!(graph.nodes().filter(|(_, node)| node.is_bonus()).count(), 0);
}

#[test]
fn test_zero_weight_pools_never_stall_generation() {
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    for seed in 0..32 {
        let mut definition = random_definition(&mut rng, "Weightless");
        for policy in &mut definition.nodes_to_generate {
            policy.weight = 0;
        }
        let mut map = Map::new("Weightless", vec![definition]).expect("valid definition");
        map.generate(seed).expect("zero weights fall back instead of failing");
        check_map(&map).expect("fallback output keeps the invariants");
    }
}
