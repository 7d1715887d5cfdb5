//! Arena-indexed node/branch types. The original tool links nodes and
//! branches with raw/weak pointers into a graph owned by the tree; here the
//! tree owns flat `Vec<Node>`/`Vec<Branch>` arenas and every cross
//! reference is a `NodeId`/`BranchId` index into them.

use crate::cut::Cut;
use crate::error::DataError;
use crate::row::RowCursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BranchId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    New,
    First,
    Intermediate,
    Final,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub status: Status,
    pub input_branch: Option<BranchId>,
    pub output_low: Option<BranchId>,
    pub output_high: Option<BranchId>,
    weight: Option<f64>,
    pub sum_source: f64,
    pub sum_target: f64,
}

impl Node {
    pub fn new_root() -> Self {
        Self {
            status: Status::New,
            input_branch: None,
            output_low: None,
            output_high: None,
            weight: None,
            sum_source: -1.0,
            sum_target: -1.0,
        }
    }

    pub fn new_child(input_branch: BranchId, sum_source: f64, sum_target: f64) -> Self {
        Self {
            status: Status::New,
            input_branch: Some(input_branch),
            output_low: None,
            output_high: None,
            weight: None,
            sum_source,
            sum_target,
        }
    }

    pub fn weight(&self) -> Option<f64> {
        self.weight
    }

    /// Sets the weight only the first time it's called; later calls are
    /// silently ignored, matching `Node::SetAndLockWeight`.
    pub fn set_and_lock_weight(&mut self, weight: f64) {
        if self.weight.is_none() {
            self.weight = Some(weight);
        }
    }

    pub fn is_final(&self) -> bool {
        self.status == Status::Final
    }
}

#[derive(Debug, Clone)]
pub struct Branch {
    pub input_node: NodeId,
    pub output_node: Option<NodeId>,
    pub cut: Cut,
    pub sum_source: f64,
    pub sum_target: f64,
}

impl Branch {
    pub fn pass(&self, cursor: &dyn RowCursor) -> Result<bool, DataError> {
        self.cut.pass(cursor)
    }
}
