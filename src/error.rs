//! Error taxonomy for the reweighter. Matches the five categories from the
//! failure-semantics table: config, data, split, codec, state. Every
//! category is fatal at the point it's raised — there is no retry path.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required config key '{0}'")]
    MissingKey(String),

    #[error("config key '{key}' has wrong type (expected {expected})")]
    WrongType { key: String, expected: &'static str },

    #[error("config key '{key}' has out-of-range value: {message}")]
    OutOfRange { key: String, message: String },

    #[error("failed to read config '{path}': {message}")]
    Io { path: String, message: String },
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("variable '{0}' is not registered")]
    UnknownVariable(String),

    #[error("duplicate variable name '{0}'")]
    DuplicateVariable(String),

    #[error("row index {index} out of range (row_count = {row_count})")]
    RowOutOfRange { index: usize, row_count: usize },

    #[error("invalid histogram range for '{variable}': xmin={xmin} xmax={xmax}")]
    InvalidHistRange {
        variable: String,
        xmin: f64,
        xmax: f64,
    },

    #[error("no variables left after feature sampling")]
    NoFeaturesSelected,

    #[error("row cursor has no current row")]
    NoCurrentRow,
}

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("final node has non-positive source sum ({sum}) for leaf on variable '{variable}' (path: {leaf})")]
    NonPositiveSource { variable: String, sum: f64, leaf: String },

    #[error("no final nodes found after growing tree")]
    NoFinalNodes,
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("duplicate node id {0} inserted into tree")]
    DuplicateNode(u32),

    #[error("tree has no root node")]
    MissingRoot,

    #[error("binary search bounds invalid: l={l} r={r} len={len}")]
    InvalidBinarySearchBounds { l: i64, r: i64, len: usize },

    #[error("row matched neither branch of a node with two outgoing branches")]
    AmbiguousCut,

    #[error("node has no output branch for a non-final status")]
    MissingOutputBranch,

    #[error("branch has no output node")]
    MissingOutputNode,

    #[error("final node weight was never set")]
    UnsetLeafWeight,
}

#[derive(Debug, Error)]
pub enum ReweighterError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Split(#[from] SplitError),

    #[error("weights file error at line {line}: {message}")]
    Codec { line: usize, message: String },

    #[error(transparent)]
    State(#[from] StateError),
}
