//! Declarative generation policy for one map segment.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::behavior::{NodeKind, NodeTemplate};
use crate::curve::Curve;
use crate::error::{DefinitionError, MapError};

/// Weighted entry in a node pool. Negative weights count by magnitude.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePolicy {
    pub weight: i32,
    pub node: NodeTemplate,
}

impl NodePolicy {
    pub fn new(weight: i32, node: NodeTemplate) -> Self {
        Self { weight, node }
    }
}

/// Messages copied onto every connection a definition creates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTemplate {
    #[serde(default)]
    pub travel_messages: Vec<String>,
    #[serde(default)]
    pub return_messages: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapDefinition {
    pub name: String,
    /// Pins the segment seed; derived from the run seed when absent.
    pub seed: Option<u64>,

    pub min_path_length: u32,
    pub max_path_length: u32,
    pub total_paths: u32,

    pub split_chance: Curve,
    pub min_split_amount: u32,
    pub max_split_amount: u32,
    pub split_decay: f32,
    pub max_split_depth: u32,
    pub max_bonus_splits: u32,
    pub split_connection_chance: Curve,
    pub detour_chance: Curve,

    pub nodes_to_generate: Vec<NodePolicy>,
    pub bonus_nodes_to_generate: Vec<NodePolicy>,
    pub hidden_nodes_to_generate: Vec<NodePolicy>,
    pub hidden_node_chance: Curve,

    pub starting_node: NodeTemplate,
    pub ending_nodes: Vec<NodeTemplate>,
    pub connection: ConnectionTemplate,

    pub noise_scale: f32,
    pub noise_magnitude: Curve,
    pub display_width: f32,
    pub display_height: f32,
}

impl Default for MapDefinition {
    fn default() -> Self {
        Self {
            name: "Map".to_string(),
            seed: None,
            min_path_length: 3,
            max_path_length: 5,
            total_paths: 3,
            split_chance: Curve::constant(0.3),
            min_split_amount: 1,
            max_split_amount: 4,
            split_decay: 0.8,
            max_split_depth: 1,
            max_bonus_splits: 2,
            split_connection_chance: Curve::constant(0.0),
            detour_chance: Curve::constant(0.5),
            nodes_to_generate: Vec::new(),
            bonus_nodes_to_generate: Vec::new(),
            hidden_nodes_to_generate: Vec::new(),
            hidden_node_chance: Curve::constant(0.0),
            starting_node: NodeTemplate::new("Start", NodeKind::Movement),
            ending_nodes: Vec::new(),
            connection: ConnectionTemplate::default(),
            noise_scale: 1.0,
            noise_magnitude: Curve::constant(0.0),
            display_width: 1.0,
            display_height: 1.0,
        }
    }
}

impl MapDefinition {
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let definition = self.name.clone();
        if self.nodes_to_generate.is_empty() {
            return Err(DefinitionError::NoNodesToGenerate { definition });
        }
        if self.ending_nodes.is_empty() {
            return Err(DefinitionError::NoEndingNodes { definition });
        }
        if self.min_path_length == 0 || self.min_path_length > self.max_path_length {
            return Err(DefinitionError::InvalidPathLength {
                definition,
                min: self.min_path_length,
                max: self.max_path_length,
            });
        }
        if self.total_paths == 0 {
            return Err(DefinitionError::NoPaths { definition });
        }
        if self.min_split_amount == 0 || self.min_split_amount > self.max_split_amount {
            return Err(DefinitionError::InvalidSplitAmount {
                definition,
                min: self.min_split_amount,
                max: self.max_split_amount,
            });
        }
        if !self.split_decay.is_finite() || self.split_decay < 0.0 {
            return Err(DefinitionError::InvalidSplitDecay { definition, decay: self.split_decay });
        }
        if !(self.display_width > 0.0 && self.display_height > 0.0) {
            return Err(DefinitionError::InvalidDisplaySize {
                definition,
                width: self.display_width,
                height: self.display_height,
            });
        }
        Ok(())
    }

    /// Pool used for bonus splits; falls back to the regular pool when none is declared.
    pub fn bonus_pool(&self) -> &[NodePolicy] {
        if self.bonus_nodes_to_generate.is_empty() {
            &self.nodes_to_generate
        } else {
            &self.bonus_nodes_to_generate
        }
    }

    /// Index given to ending nodes, one past the deepest possible step.
    pub fn end_index(&self) -> u32 {
        self.max_path_length + 2
    }

    pub fn from_json_str(source: &str) -> Result<Self, MapError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn from_toml_str(source: &str) -> Result<Self, MapError> {
        Ok(toml::from_str(source)?)
    }

    /// Loads a `.json` or `.toml` definition file. The result is not validated.
    pub fn load(path: &Path) -> Result<Self, MapError> {
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|extension| extension.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("toml") => Self::from_toml_str(&content),
            other => Err(MapError::UnsupportedFormat(other.unwrap_or_default().to_string())),
        }
    }
}
