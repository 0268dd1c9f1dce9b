use std::collections::HashSet;

use anyhow::{Result, bail, ensure};
use clap::Parser;
use overworld::{
    Curve, Map, MapDefinition, MapEvent, MapTraversal, NodeKind, NodePolicy, NodeTag,
    NodeTemplate, PlacementRules, TraversalSettings, TraversalState,
};
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
    #[arg(short, long, default_value_t = 200)]
    iterations: u32,
    /// Upper bound on simulation ticks per run
    #[arg(short, long, default_value_t = 20_000)]
    ticks: u32,
}

fn choose<T: Clone>(rng: &mut ChaCha8Rng, slice: &[T]) -> T {
    let p = rng.next_u64() as usize % slice.len();
    slice[p].clone()
}

fn between(rng: &mut ChaCha8Rng, min: u32, max: u32) -> u32 {
    min + (rng.next_u32() % (max - min + 1))
}

fn unit(rng: &mut ChaCha8Rng) -> f32 {
    (rng.next_u32() >> 8) as f32 / (1_u32 << 24) as f32
}

fn random_definition(rng: &mut ChaCha8Rng, name: String, last: bool) -> MapDefinition {
    let min_path_length = between(rng, 1, 5);
    let min_split_amount = between(rng, 1, 3);
    let battle = NodeTemplate::new("Ambush", NodeKind::Battle { scene: "Battle".to_string() })
        .with_rules(PlacementRules { not_after: vec![NodeTag::Battle], max_per_path: Some(3) });
    let road = NodeTemplate::new("Road", NodeKind::Movement);
    let exit = if last {
        NodeTemplate::new("Exit", NodeKind::Win { message: Some("Onwards".to_string()) })
    } else {
        NodeTemplate::new("Fork", NodeKind::Movement)
    };
    MapDefinition {
        name,
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
            NodePolicy::new(between(rng, 0, 5) as i32, road),
            NodePolicy::new(between(rng, 0, 3) as i32, battle.clone()),
        ],
        hidden_nodes_to_generate: vec![NodePolicy::new(1, battle)],
        hidden_node_chance: Curve::constant(unit(rng) * 0.5),
        ending_nodes: vec![exit; between(rng, 1, 3) as usize],
        noise_magnitude: Curve::constant(unit(rng)),
        ..MapDefinition::default()
    }
}

fn check_invariants(map: &Map) -> Result<()> {
    let graph = map.graph();
    let Some(start) = map.start_node() else {
        bail!("Invariant failed: map {} has no start", map.name());
    };
    let ends: HashSet<_> = map.final_ends().iter().copied().collect();
    for (id, node) in graph.nodes().filter(|(_, node)| !node.hidden) {
        ensure!(
            id == start || !node.incoming.is_empty(),
            "Invariant failed: {} has no incoming edge",
            node.name
        );
        ensure!(
            ends.contains(&id) || !node.outgoing.is_empty(),
            "Invariant failed: {} has no outgoing edge",
            node.name
        );
    }
    for segment in map.segments() {
        let members: HashSet<_> = segment.node_ids().into_iter().collect();
        for (_, connection) in graph.connections() {
            if !members.contains(&connection.start) || !members.contains(&connection.end) {
                continue;
            }
            let (Some(from), Some(to)) = (graph.node(connection.start), graph.node(connection.end))
            else {
                bail!("Invariant failed: dangling connection");
            };
            ensure!(
                to.distance >= from.distance,
                "Invariant failed: {} -> {} runs backwards",
                from.name,
                to.name
            );
        }
    }
    Ok(())
}

/// Walks random successors until the run completes.
fn play(traversal: &mut MapTraversal, rng: &mut ChaCha8Rng, max_ticks: u32) -> Result<u32> {
    traversal.start()?;
    let mut ticks = 0;
    loop {
        while traversal.advance(0.05) == TraversalState::Moving {
            let events = traversal.events();
            if events.iter().any(|event| matches!(event, MapEvent::BattleRequested { .. })) {
                traversal.set_battle_mode(true);
                traversal.set_waiting_to_start(true);
            }
            ticks += 1;
            ensure!(ticks < max_ticks, "Invariant failed: movement stalled");
        }
        traversal.set_battle_mode(false);
        traversal.set_waiting_to_start(false);
        if traversal.drain_events().contains(&MapEvent::RunCompleted) {
            return Ok(ticks);
        }

        let (Some(map), Some(current)) = (traversal.current_map(), traversal.current_node()) else {
            bail!("Invariant failed: player is not placed");
        };
        let options: Vec<_> = map.graph().successors(current).collect();
        ensure!(!options.is_empty(), "Invariant failed: stranded before the last exit");
        let target = choose(rng, &options);
        ensure!(traversal.request_move(target), "Invariant failed: connected move rejected");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    println!("Starting Fuzz harness on seed {} for {} iterations...", args.seed, args.iterations);
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);

    let mut total_nodes = 0;
    let mut total_ticks = 0;
    for iteration in 0..args.iterations {
        let map_count = between(&mut rng, 1, 3);
        let mut maps = Vec::new();
        for m in 0..map_count {
            let segments = between(&mut rng, 1, 3);
            let definitions = (0..segments)
                .map(|s| {
                    let name = format!("{iteration}.{m}.{s}");
                    random_definition(&mut rng, name, s + 1 == segments)
                })
                .collect();
            maps.push(Map::new(format!("Map {m}"), definitions)?);
        }

        let settings = TraversalSettings {
            movement_time: 0.1,
            message_seed: Some(rng.next_u64()),
            battle_cooldown: 0.1,
            ..TraversalSettings::default()
        };
        let mut traversal = MapTraversal::new(maps, rng.next_u64(), settings)?;
        total_ticks += play(&mut traversal, &mut rng, args.ticks)?;
        for map in traversal.maps() {
            check_invariants(map)?;
            total_nodes += map.graph().node_count();
        }
    }

    println!("Visited {} generated nodes over {} ticks", total_nodes, total_ticks);
    println!("Fuzzing completed successfully.");
    Ok(())
}
