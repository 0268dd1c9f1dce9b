//! Procedural map generation split into path growth, bonus splitting and edge creation.

mod generator;

pub use generator::MapGenerator;
pub use generator::UNEXPECTED_PATH_MESSAGE;

use crate::definition::MapDefinition;
use crate::error::MapError;
use crate::graph::{MapGraph, MapSegment};
use crate::seed::derive_segment_seed;

use generator::SegmentBuilder;

pub fn generate_segment(
    graph: &mut MapGraph,
    definition: &MapDefinition,
    seed: u64,
) -> Result<MapSegment, MapError> {
    MapGenerator::new(definition, seed).generate(graph)
}

/// Connects every end of `from` to the start of `to` using `from`'s connection policy.
pub(crate) fn chain_segments(graph: &mut MapGraph, from: &MapSegment, to: &MapSegment) {
    let seed = derive_segment_seed(from.seed, from.paths.len());
    SegmentBuilder::new(graph, &from.definition, seed).link_segments(&from.ends, to.start);
}
