use std::io;

use thiserror::Error;

/// A map definition that cannot produce a valid graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefinitionError {
    #[error("definition `{definition}` has no nodes to generate")]
    NoNodesToGenerate { definition: String },

    #[error("definition `{definition}` has no ending nodes")]
    NoEndingNodes { definition: String },

    #[error("definition `{definition}` has an invalid path length range {min}..={max}")]
    InvalidPathLength { definition: String, min: u32, max: u32 },

    #[error("definition `{definition}` must generate at least one path")]
    NoPaths { definition: String },

    #[error("definition `{definition}` has an invalid split amount range {min}..={max}")]
    InvalidSplitAmount { definition: String, min: u32, max: u32 },

    #[error("definition `{definition}` has an invalid split decay {decay}")]
    InvalidSplitDecay { definition: String, decay: f32 },

    #[error("definition `{definition}` has a non-positive display size {width}x{height}")]
    InvalidDisplaySize { definition: String, width: f32, height: f32 },
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("a map needs at least one definition")]
    NoDefinitions,

    #[error("a traversal needs at least one map")]
    NoMaps,

    #[error("map has not been generated yet")]
    NotGenerated,

    #[error("cannot modify a map while a movement transition is in flight")]
    TransitionInFlight,

    #[error("no map at index {0}")]
    UnknownMap(usize),

    #[error("unsupported definition file extension `{0}`")]
    UnsupportedFormat(String),

    #[error("failed to read definition file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse JSON definition: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse TOML definition: {0}")]
    Toml(#[from] toml::de::Error),
}
