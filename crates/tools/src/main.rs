use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use overworld::{Map, MapDefinition, NodeId, NodeTag, Point, Rect, runtime_seed};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Segment definition files (`.json` or `.toml`), in the order they are chained
    #[arg(short, long = "definition", required = true)]
    definitions: Vec<PathBuf>,
    /// Run seed; drawn from live entropy when omitted
    #[arg(short, long)]
    seed: Option<u64>,
    #[arg(long, default_value = "Overworld")]
    name: String,
    #[arg(long, default_value_t = 1280.0)]
    width: f32,
    #[arg(long, default_value_t = 720.0)]
    height: f32,
    #[arg(long, default_value_t = 32.0)]
    padding: f32,
    /// Print the laid out map as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct MapSnapshot {
    name: String,
    run_seed: u64,
    fingerprint: String,
    bounds: Rect,
    nodes: Vec<NodeSnapshot>,
    connections: Vec<ConnectionSnapshot>,
}

#[derive(Serialize)]
struct NodeSnapshot {
    id: usize,
    name: String,
    tag: NodeTag,
    index: u32,
    bonus: u32,
    distance: f32,
    hidden: bool,
    position: Point,
}

#[derive(Serialize)]
struct ConnectionSnapshot {
    from: usize,
    to: usize,
    hidden_nodes: Vec<usize>,
    travel_messages: Vec<String>,
    return_messages: Vec<String>,
}

fn snapshot(map: &Map, run_seed: u64, bounds: Rect) -> MapSnapshot {
    let ordered = map.ordered_nodes();
    let ordinal = |id: NodeId| ordered.iter().position(|other| *other == id).unwrap_or(usize::MAX);
    let graph = map.graph();

    let nodes = ordered
        .iter()
        .enumerate()
        .filter_map(|(id, node_id)| {
            let node = graph.node(*node_id)?;
            Some(NodeSnapshot {
                id,
                name: node.name.clone(),
                tag: node.kind.tag(),
                index: node.index,
                bonus: node.bonus,
                distance: node.distance,
                hidden: node.hidden,
                position: node.position,
            })
        })
        .collect();

    let connections = ordered
        .iter()
        .filter_map(|id| graph.node(*id))
        .flat_map(|node| node.outgoing.iter())
        .filter_map(|edge| graph.connection(*edge))
        .map(|connection| ConnectionSnapshot {
            from: ordinal(connection.start),
            to: ordinal(connection.end),
            hidden_nodes: connection.hidden_nodes.iter().map(|id| ordinal(*id)).collect(),
            travel_messages: connection.travel_messages.clone(),
            return_messages: connection.return_messages.clone(),
        })
        .collect();

    MapSnapshot {
        name: map.name().to_string(),
        run_seed,
        fingerprint: format!("{:016x}", map.fingerprint()),
        bounds,
        nodes,
        connections,
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();

    let definitions = args
        .definitions
        .iter()
        .map(|path| {
            MapDefinition::load(path)
                .with_context(|| format!("Failed to load definition: {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let run_seed = args.seed.unwrap_or_else(runtime_seed);
    let mut map = Map::new(args.name, definitions).context("Invalid map definitions")?;
    map.generate(run_seed).context("Map generation failed")?;
    let viewport = Rect::new(0.0, 0.0, args.width, args.height);
    let bounds = map
        .display(viewport, Point::new(args.padding, args.padding))
        .context("Map layout failed")?;
    tracing::info!(
        map = %map.name(),
        run_seed,
        nodes = map.graph().node_count(),
        "generated map"
    );

    let snapshot = snapshot(&map, run_seed, bounds);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("Map: {}", snapshot.name);
    println!("Run Seed: {}", snapshot.run_seed);
    for (index, segment) in map.segments().iter().enumerate() {
        println!(
            "Segment {index}: {} (seed {}, {} paths, {} ends)",
            segment.definition.name,
            segment.seed,
            segment.paths.len(),
            segment.ends.len()
        );
    }
    let hidden = snapshot.nodes.iter().filter(|node| node.hidden).count();
    let bonus = snapshot.nodes.iter().filter(|node| node.bonus > 0).count();
    println!("Nodes: {} ({} bonus, {} hidden)", snapshot.nodes.len(), bonus, hidden);
    println!("Connections: {}", snapshot.connections.len());
    println!("Bounds: {}x{} at ({}, {})", bounds.width, bounds.height, bounds.x, bounds.y);
    println!("Fingerprint: {}", snapshot.fingerprint);

    Ok(())
}
