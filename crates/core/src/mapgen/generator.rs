//! Segment generation: paths of weighted nodes grown step by step from a shared start.

mod bonus;
mod connect;

pub use connect::UNEXPECTED_PATH_MESSAGE;

use crate::behavior::{self, NodeTemplate};
use crate::definition::{MapDefinition, NodePolicy};
use crate::error::{DefinitionError, MapError};
use crate::graph::{MapGraph, MapNode, MapSegment};
use crate::seed::MapRng;
use crate::types::NodeId;
use crate::weighted::weighted_choice;

const GENERATION_TARGET: &str = "overworld::mapgen";

/// Builds one [`MapSegment`] from a definition and a seed.
pub struct MapGenerator<'a> {
    definition: &'a MapDefinition,
    seed: u64,
}

impl<'a> MapGenerator<'a> {
    pub fn new(definition: &'a MapDefinition, seed: u64) -> Self {
        Self { definition, seed }
    }

    /// Adds the segment's nodes and connections to `graph`.
    ///
    /// The definition is validated first; nothing is inserted when it is rejected.
    pub fn generate(&self, graph: &mut MapGraph) -> Result<MapSegment, MapError> {
        if let Err(error) = self.definition.validate() {
            tracing::error!(target: GENERATION_TARGET, %error, "refusing to generate segment");
            return Err(error.into());
        }

        let mut builder = SegmentBuilder::new(graph, self.definition, self.seed);
        let segment = builder.build()?;
        log_summary(builder.graph, &segment);
        Ok(segment)
    }
}

/// Mutable state shared by every generation step of one segment.
pub(crate) struct SegmentBuilder<'a> {
    graph: &'a mut MapGraph,
    definition: &'a MapDefinition,
    rng: MapRng,
    seed: u64,
    /// Every node this builder inserted, hidden ones included.
    created: Vec<NodeId>,
}

impl<'a> SegmentBuilder<'a> {
    pub(crate) fn new(graph: &'a mut MapGraph, definition: &'a MapDefinition, seed: u64) -> Self {
        Self { graph, definition, rng: MapRng::new(seed), seed, created: Vec::new() }
    }

    fn build(&mut self) -> Result<MapSegment, MapError> {
        let definition = self.definition;
        let start = self.spawn(&definition.starting_node, format!("Start of {}", definition.name));

        let end_index = definition.end_index();
        let mut ends = Vec::with_capacity(definition.ending_nodes.len());
        for template in &definition.ending_nodes {
            let end = self.spawn(template, format!("End of {} {}", definition.name, template.name));
            self.place(end, 1.0, end_index);
            ends.push(end);
        }
        self.set_neighbors(&ends);
        self.set_neighbors(&[start]);

        let mut paths = Vec::with_capacity(definition.total_paths as usize);
        for _ in 0..definition.total_paths {
            paths.push(self.generate_path(start, &ends)?);
        }

        self.run_generate_hooks();

        Ok(MapSegment {
            paths,
            start,
            ends,
            definition: definition.clone(),
            seed: self.seed,
        })
    }

    /// Connects the ends of one segment to the start of the following one.
    pub(crate) fn link_segments(&mut self, ends: &[NodeId], next_start: NodeId) {
        self.connect_nodes(ends, &[next_start], &[]);
        self.run_generate_hooks();
    }

    fn run_generate_hooks(&mut self) {
        for id in &self.created {
            if let Some(node) = self.graph.node_mut(*id) {
                behavior::on_generate(node);
            }
        }
    }

    fn generate_path(&mut self, start: NodeId, ends: &[NodeId]) -> Result<Vec<NodeId>, MapError> {
        let definition = self.definition;
        let mut path = vec![start];
        let mut frontier = vec![start];

        let steps =
            self.rng.range_inclusive(definition.min_path_length, definition.max_path_length);
        for step in 1..=steps {
            frontier = self.generate_step(&frontier, &mut path, step, steps + 2)?;
        }

        self.connect_nodes(&frontier, ends, &path);
        path.extend_from_slice(ends);
        Ok(path)
    }

    /// Appends the nodes of step `index` to `path` and returns the new frontier.
    fn generate_step(
        &mut self,
        frontier: &[NodeId],
        path: &mut Vec<NodeId>,
        index: u32,
        total_steps: u32,
    ) -> Result<Vec<NodeId>, MapError> {
        let definition = self.definition;
        let distance = index as f32 / total_steps as f32;

        let split = self.rng.chance(definition.split_chance.evaluate(distance));
        let amount = if split {
            self.rng.range_inclusive(definition.min_split_amount, definition.max_split_amount) + 1
        } else {
            1
        };

        let prefix = index.to_string();
        let mut siblings: Vec<NodeId> = Vec::with_capacity(amount as usize);
        for slot in 0..amount as usize {
            let anchor = match frontier.get(slot) {
                Some(anchor) => Some(*anchor),
                None => self.rng.pick(frontier).copied(),
            };
            let node = self.generate_node(anchor, path, &definition.nodes_to_generate, &prefix)?;
            self.place(node, distance, index);

            if let Some(previous_sibling) = siblings.last().copied()
                && self.rng.chance(definition.split_connection_chance.evaluate(distance))
            {
                self.create_connection(node, previous_sibling, path);
            }
            siblings.push(node);
        }
        self.set_neighbors(&siblings);

        path.extend_from_slice(&siblings);
        self.connect_nodes(frontier, &siblings, path);

        if split {
            return self.split_bonus_nodes(siblings, path, index, total_steps);
        }
        Ok(siblings)
    }

    /// Draws a node from `pool`, preferring templates that may follow `previous` on `path`.
    fn generate_node(
        &mut self,
        previous: Option<NodeId>,
        path: &[NodeId],
        pool: &[NodePolicy],
        prefix: &str,
    ) -> Result<NodeId, MapError> {
        let definition = self.definition;
        let graph = &*self.graph;
        let rng = &mut self.rng;
        let valid = weighted_choice(pool, rng, |policy| {
            if graph.template_fits(&policy.node, previous, path) { policy.weight } else { 0 }
        });
        let policy = match valid {
            Some(policy) => policy,
            None => {
                tracing::warn!(
                    target: GENERATION_TARGET,
                    prefix,
                    "no valid weighted node candidate, ignoring placement rules"
                );
                match weighted_choice(pool, rng, |policy| policy.weight) {
                    Some(policy) => policy,
                    None => {
                        tracing::warn!(
                            target: GENERATION_TARGET,
                            prefix,
                            "node pool has zero total weight, using its first entry"
                        );
                        pool.first().ok_or_else(|| DefinitionError::NoNodesToGenerate {
                            definition: definition.name.clone(),
                        })?
                    }
                }
            }
        };

        let name = format!("{prefix} {}", policy.node.name);
        let template = policy.node.clone();
        Ok(self.spawn(&template, name))
    }

    fn spawn(&mut self, template: &NodeTemplate, name: String) -> NodeId {
        let mut node = MapNode::from_template(template);
        node.name = name;
        let id = self.graph.insert_node(node);
        self.created.push(id);
        id
    }

    fn place(&mut self, id: NodeId, distance: f32, index: u32) {
        if let Some(node) = self.graph.node_mut(id) {
            node.distance = distance;
            node.index = index;
        }
    }

    fn set_neighbors(&mut self, group: &[NodeId]) {
        for id in group {
            if let Some(node) = self.graph.node_mut(*id) {
                node.neighbors = group.to_vec();
            }
        }
    }
}

fn log_summary(graph: &MapGraph, segment: &MapSegment) {
    let nodes = segment.node_ids();
    let bonus_nodes =
        nodes.iter().filter_map(|id| graph.node(*id)).filter(|node| node.is_bonus()).count();
    let connections: usize =
        nodes.iter().filter_map(|id| graph.node(*id)).map(|node| node.outgoing.len()).sum();
    tracing::debug!(
        target: GENERATION_TARGET,
        definition = %segment.definition.name,
        seed = segment.seed,
        paths = segment.paths.len(),
        nodes = nodes.len(),
        bonus_nodes,
        connections,
        "generated map segment"
    );
}
