//! A map: one or more generated segments chained end to start and drawn side by side.

use slotmap::SecondaryMap;
use xxhash_rust::xxh3::xxh3_64;

use crate::behavior::NodeTag;
use crate::definition::MapDefinition;
use crate::error::MapError;
use crate::graph::{MapGraph, MapSegment};
use crate::layout::{layout_segment, segment_bounds};
use crate::mapgen::{chain_segments, generate_segment};
use crate::seed::derive_segment_seed;
use crate::types::{NodeId, Point, Rect};

const MAP_TARGET: &str = "overworld::mapgen";

#[derive(Clone, Debug)]
pub struct Map {
    name: String,
    definitions: Vec<MapDefinition>,
    graph: MapGraph,
    segments: Vec<MapSegment>,
    visible: bool,
}

impl Map {
    /// Validates every definition up front; a map that cannot be generated is never built.
    pub fn new(name: impl Into<String>, definitions: Vec<MapDefinition>) -> Result<Self, MapError> {
        let name = name.into();
        if definitions.is_empty() {
            tracing::error!(target: MAP_TARGET, map = %name, "map has no definitions");
            return Err(MapError::NoDefinitions);
        }
        for definition in &definitions {
            if let Err(error) = definition.validate() {
                tracing::error!(target: MAP_TARGET, map = %name, %error, "invalid map definition");
                return Err(error.into());
            }
        }
        Ok(Self {
            name,
            definitions,
            graph: MapGraph::default(),
            segments: Vec::new(),
            visible: false,
        })
    }

    /// Regenerates every segment. Segments without a pinned seed derive one from `run_seed`.
    ///
    /// On failure the map is left empty.
    pub fn generate(&mut self, run_seed: u64) -> Result<(), MapError> {
        self.destroy();
        for (index, definition) in self.definitions.iter().enumerate() {
            let seed = definition.seed.unwrap_or_else(|| derive_segment_seed(run_seed, index));
            match generate_segment(&mut self.graph, definition, seed) {
                Ok(segment) => self.segments.push(segment),
                Err(error) => {
                    tracing::error!(
                        target: MAP_TARGET,
                        map = %self.name,
                        %error,
                        "map generation failed"
                    );
                    self.graph.clear();
                    self.segments.clear();
                    return Err(error);
                }
            }
        }
        for pair in self.segments.windows(2) {
            chain_segments(&mut self.graph, &pair[0], &pair[1]);
        }
        tracing::debug!(
            target: MAP_TARGET,
            map = %self.name,
            run_seed,
            segments = self.segments.len(),
            nodes = self.graph.node_count(),
            connections = self.graph.connection_count(),
            "generated map"
        );
        Ok(())
    }

    /// Lays every segment out inside `base` shrunk by `padding` and makes the map visible.
    ///
    /// Returns the combined bounds the segments were drawn in.
    pub fn display(&mut self, base: Rect, padding: Point) -> Result<Rect, MapError> {
        if self.segments.is_empty() {
            tracing::error!(target: MAP_TARGET, map = %self.name, "map is not generated");
            return Err(MapError::NotGenerated);
        }
        let (full, bounds) = segment_bounds(&self.segments, base, padding);
        for (segment, bounds) in self.segments.iter().zip(bounds).rev() {
            layout_segment(&mut self.graph, segment, bounds);
        }
        self.visible = true;
        Ok(full)
    }

    pub fn hide(&mut self) {
        if self.segments.is_empty() {
            tracing::warn!(target: MAP_TARGET, map = %self.name, "attempted to hide an empty map");
        }
        self.visible = false;
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    /// Drops every node and connection.
    pub fn destroy(&mut self) {
        if !self.segments.is_empty() {
            tracing::debug!(target: MAP_TARGET, map = %self.name, "destroying map");
        }
        self.graph.clear();
        self.segments.clear();
        self.visible = false;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definitions(&self) -> &[MapDefinition] {
        &self.definitions
    }

    pub fn graph(&self) -> &MapGraph {
        &self.graph
    }

    pub(crate) fn graph_mut(&mut self) -> &mut MapGraph {
        &mut self.graph
    }

    pub fn segments(&self) -> &[MapSegment] {
        &self.segments
    }

    pub fn is_generated(&self) -> bool {
        !self.segments.is_empty()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn start_node(&self) -> Option<NodeId> {
        self.segments.first().map(|segment| segment.start)
    }

    /// Ends of the last segment; the run leaves the map through one of these.
    pub fn final_ends(&self) -> &[NodeId] {
        match self.segments.last() {
            Some(segment) => &segment.ends,
            None => &[],
        }
    }

    /// Nodes in a stable order: segments, then paths, then hidden nodes by connection.
    pub fn ordered_nodes(&self) -> Vec<NodeId> {
        let mut seen = SecondaryMap::new();
        let mut ordered = Vec::with_capacity(self.graph.node_count());
        for segment in &self.segments {
            for id in segment.paths.iter().flatten() {
                if seen.insert(*id, ()).is_none() {
                    ordered.push(*id);
                }
            }
        }
        let hidden: Vec<NodeId> = ordered
            .iter()
            .filter_map(|id| self.graph.node(*id))
            .flat_map(|node| node.outgoing.iter())
            .filter_map(|edge| self.graph.connection(*edge))
            .flat_map(|connection| connection.hidden_nodes.iter().copied())
            .collect();
        for id in hidden {
            if seen.insert(id, ()).is_none() {
                ordered.push(id);
            }
        }
        ordered
    }

    /// Topology bytes independent of arena slot reuse.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let ordered = self.ordered_nodes();
        let mut ordinals = SecondaryMap::new();
        for (ordinal, id) in ordered.iter().enumerate() {
            ordinals.insert(*id, ordinal as u32);
        }
        let ordinal = |id: NodeId| ordinals.get(id).copied().unwrap_or(u32::MAX);

        let mut bytes = Vec::new();
        bytes.extend((self.segments.len() as u32).to_le_bytes());
        for segment in &self.segments {
            bytes.extend(segment.seed.to_le_bytes());
            bytes.extend((segment.paths.len() as u32).to_le_bytes());
        }

        bytes.extend((ordered.len() as u32).to_le_bytes());
        for id in &ordered {
            let Some(node) = self.graph.node(*id) else {
                continue;
            };
            bytes.extend(node.index.to_le_bytes());
            bytes.extend(node.bonus.to_le_bytes());
            bytes.extend(node.branch.to_le_bytes());
            bytes.extend(node.distance.to_bits().to_le_bytes());
            bytes.push(u8::from(node.hidden));
            bytes.push(match node.kind.tag() {
                NodeTag::Movement => 0,
                NodeTag::Battle => 1,
                NodeTag::Win => 2,
            });
        }

        for id in &ordered {
            let Some(node) = self.graph.node(*id) else {
                continue;
            };
            bytes.extend((node.outgoing.len() as u32).to_le_bytes());
            for edge in &node.outgoing {
                let Some(connection) = self.graph.connection(*edge) else {
                    continue;
                };
                bytes.extend(ordinal(connection.end).to_le_bytes());
                bytes.extend((connection.travel_messages.len() as u32).to_le_bytes());
                for hidden in &connection.hidden_nodes {
                    bytes.extend(ordinal(*hidden).to_le_bytes());
                }
            }
        }

        bytes
    }

    pub fn fingerprint(&self) -> u64 {
        xxh3_64(&self.canonical_bytes())
    }
}
