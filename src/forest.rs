//! A forest is simply the trees grown (or read back) together as one
//! training run. BDT keeps one forest per call to `train`; RF/ET pool every
//! tree across forests at inference time.

use crate::tree::DecisionTree;

#[derive(Debug, Default)]
pub struct Forest {
    trees: Vec<DecisionTree>,
}

impl Forest {
    pub fn new() -> Self {
        Self { trees: Vec::new() }
    }

    pub fn from_trees(trees: Vec<DecisionTree>) -> Self {
        Self { trees }
    }

    pub fn add_tree(&mut self, tree: DecisionTree) {
        self.trees.push(tree);
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}
