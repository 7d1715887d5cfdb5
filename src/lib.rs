//! `mlreweight` learns per-event multiplicative weights that reshape a
//! *source* sample to look like a *target* sample, using tree ensembles:
//! Boosted Decision Trees, Random Forest, or Extremely Randomized Trees.
//! Trained ensembles serialize to a plain-text weights file and can be
//! re-applied to score new rows as `(weight, error)`.

pub mod codec;
pub mod config;
pub mod context;
pub mod cut;
pub mod ensemble;
pub mod error;
pub mod forest;
pub mod histdef;
pub mod histogram;
pub mod node;
pub mod rng;
pub mod row;
pub mod sampling;
pub mod splitter;
pub mod tree;
pub mod variable;

pub use config::{Config, ConfigValue, Method};
pub use context::Context;
pub use ensemble::{Ensemble, EnsembleParams};
pub use error::{ConfigError, DataError, ReweighterError, SplitError, StateError};
pub use forest::Forest;
pub use row::{InMemoryRows, RowCursor};
pub use tree::DecisionTree;
pub use variable::VariableRegistry;
