pub mod behavior;
pub mod curve;
pub mod definition;
pub mod error;
pub mod graph;
pub mod layout;
pub mod map;
pub mod mapgen;
pub mod seed;
pub mod traversal;
pub mod types;
pub mod weighted;

pub use behavior::{CombatSignals, NodeKind, NodeTag, NodeTemplate, PlacementRules};
pub use curve::Curve;
pub use definition::{ConnectionTemplate, MapDefinition, NodePolicy};
pub use error::{DefinitionError, MapError};
pub use graph::{MapConnection, MapGraph, MapNode, MapSegment};
pub use layout::{layout_segment, segment_bounds};
pub use map::Map;
pub use mapgen::{MapGenerator, UNEXPECTED_PATH_MESSAGE, generate_segment};
pub use seed::{MapRng, derive_map_seed, derive_segment_seed, runtime_seed};
pub use traversal::{MapTraversal, TraversalSettings};
pub use types::*;
pub use weighted::weighted_choice;
