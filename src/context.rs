//! Bundles the pieces a run needs instead of relying on process-wide
//! singletons the way the original tool's `Variables`/`Event` classes did.

use crate::config::Config;
use crate::variable::VariableRegistry;

#[derive(Debug, Clone)]
pub struct Context {
    pub registry: VariableRegistry,
    pub config: Config,
    pub event_weight_variable: String,
}

impl Context {
    pub fn new(registry: VariableRegistry, config: Config, event_weight_variable: impl Into<String>) -> Self {
        Self {
            registry,
            config,
            event_weight_variable: event_weight_variable.into(),
        }
    }
}
