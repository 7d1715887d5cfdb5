//! A decision tree grows layer by layer: every node currently open is
//! filled and split together, so the whole tree advances one depth level
//! per iteration rather than being grown depth-first. This mirrors
//! `DecisionTree::GrowTree`'s `FillNodes`/`Build` loop.

use rand_chacha::ChaCha8Rng;

use crate::cut::Cut;
use crate::error::{DataError, ReweighterError, SplitError, StateError};
use crate::histdef::HistDef;
use crate::histogram::Histogram;
use crate::node::{Branch, BranchId, Node, NodeId, Status};
use crate::row::RowCursor;
use crate::sampling::select_features;
use crate::splitter::{self, SplitMode, VariableHistograms};
use crate::variable::VariableRegistry;

#[derive(Debug, Clone, Copy)]
pub struct TreeConfig {
    pub min_events_node: f64,
    pub max_tree_layers: usize,
    pub learning_rate: f64,
    pub feature_sampling_fraction: Option<f64>,
    pub split_mode: SplitMode,
}

#[derive(Debug)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    branches: Vec<Branch>,
    root: NodeId,
}

struct NodeWork {
    node_id: NodeId,
    feature_indices: Vec<usize>,
    source_hists: Vec<Histogram>,
    target_hists: Vec<Histogram>,
}

/// Renders a root-to-leaf cut path for error messages, e.g. `x<3.5|y>=1.2`.
fn format_cut_path(cuts: &[Cut]) -> String {
    cuts.iter()
        .map(|c| {
            let symbol = if c.is_greater_eq() { ">=" } else { "<" };
            format!("{}{}{}", c.variable(), symbol, c.threshold())
        })
        .collect::<Vec<_>>()
        .join("|")
}

/// A single parsed leaf line from a weights file: its locked weight, the
/// diagnostic sums that were written alongside it, and its root-to-leaf
/// cut path.
pub struct ParsedLeaf {
    pub weight: f64,
    pub sum_target: f64,
    pub sum_source: f64,
    pub cuts: Vec<Cut>,
}

impl DecisionTree {
    pub fn grow(
        registry: &VariableRegistry,
        hist_defs: &[HistDef],
        source: &mut dyn RowCursor,
        source_indices: &[usize],
        target: &mut dyn RowCursor,
        target_indices: &[usize],
        config: &TreeConfig,
        rng: &mut ChaCha8Rng,
        mut multipliers: Option<&mut [f64]>,
    ) -> Result<Self, ReweighterError> {
        let mut tree = DecisionTree {
            nodes: vec![Node::new_root()],
            branches: Vec::new(),
            root: NodeId(0),
        };

        let mut layer: Vec<NodeId> = vec![tree.root];
        let mut layer_index = 0usize;

        while !layer.is_empty() {
            if layer_index >= config.max_tree_layers {
                for &id in &layer {
                    tree.nodes[id.0 as usize].status = Status::Final;
                }
                break;
            }

            let mut work = Vec::with_capacity(layer.len());
            for &node_id in &layer {
                let feature_indices = select_features(registry.len(), config.feature_sampling_fraction, rng);
                if feature_indices.is_empty() {
                    return Err(DataError::NoFeaturesSelected.into());
                }
                let mut source_hists = Vec::with_capacity(feature_indices.len());
                let mut target_hists = Vec::with_capacity(feature_indices.len());
                for &fi in &feature_indices {
                    let hd = &hist_defs[fi];
                    source_hists.push(Histogram::new(hd.nbins, hd.xmin, hd.xmax)?);
                    target_hists.push(Histogram::new(hd.nbins, hd.xmin, hd.xmax)?);
                }
                work.push(NodeWork {
                    node_id,
                    feature_indices,
                    source_hists,
                    target_hists,
                });
            }

            let mult_slice: Option<&[f64]> = multipliers.as_deref();
            tree.fill_layer(&mut work, registry, target, target_indices, source, source_indices, mult_slice)?;

            let mut next_layer = Vec::new();
            for nw in work {
                let NodeWork {
                    node_id,
                    feature_indices,
                    source_hists,
                    target_hists,
                } = nw;
                let histograms: Vec<VariableHistograms> = feature_indices
                    .into_iter()
                    .zip(source_hists.into_iter().zip(target_hists.into_iter()))
                    .map(|(fi, (sh, th))| (registry.names()[fi].clone(), sh, th))
                    .collect();

                let candidate = match config.split_mode {
                    SplitMode::Chisquare => splitter::best_chisquare_split(&histograms, config.min_events_node),
                    SplitMode::Random => splitter::random_split(&histograms, config.min_events_node, rng),
                };

                let is_root = tree.nodes[node_id.0 as usize].input_branch.is_none();

                match candidate {
                    None => {
                        tree.nodes[node_id.0 as usize].status = Status::Final;
                    }
                    Some(cand) => {
                        let total_source = cand.sum_source_low + cand.sum_source_high;
                        let total_target = cand.sum_target_low + cand.sum_target_high;
                        if is_root {
                            tree.nodes[node_id.0 as usize].sum_source = total_source;
                            tree.nodes[node_id.0 as usize].sum_target = total_target;
                            tree.nodes[node_id.0 as usize].status = Status::First;
                        } else {
                            tree.nodes[node_id.0 as usize].status = Status::Intermediate;
                        }

                        let cut_low = Cut::Less {
                            variable: cand.variable.clone(),
                            threshold: cand.threshold,
                        };
                        let cut_high = Cut::GreaterEq {
                            variable: cand.variable.clone(),
                            threshold: cand.threshold,
                        };

                        let low_branch = tree.push_branch(Branch {
                            input_node: node_id,
                            output_node: None,
                            cut: cut_low,
                            sum_source: cand.sum_source_low,
                            sum_target: cand.sum_target_low,
                        });
                        let high_branch = tree.push_branch(Branch {
                            input_node: node_id,
                            output_node: None,
                            cut: cut_high,
                            sum_source: cand.sum_source_high,
                            sum_target: cand.sum_target_high,
                        });

                        tree.nodes[node_id.0 as usize].output_low = Some(low_branch);
                        tree.nodes[node_id.0 as usize].output_high = Some(high_branch);

                        for (branch_id, sum_source, sum_target) in [
                            (low_branch, cand.sum_source_low, cand.sum_target_low),
                            (high_branch, cand.sum_source_high, cand.sum_target_high),
                        ] {
                            let eager_final =
                                sum_source < 2.0 * config.min_events_node || sum_target < 2.0 * config.min_events_node;
                            let mut child = Node::new_child(branch_id, sum_source, sum_target);
                            if eager_final {
                                child.status = Status::Final;
                            }
                            let child_id = tree.push_node(child);
                            tree.branches[branch_id.0 as usize].output_node = Some(child_id);
                            if !eager_final {
                                next_layer.push(child_id);
                            }
                        }
                    }
                }
            }

            layer = next_layer;
            layer_index += 1;
        }

        if tree.nodes[0].status == Status::New {
            tree.nodes[0].status = Status::Final;
        }

        tree.finalize_weights(config.learning_rate)?;

        if let Some(mult) = multipliers.as_deref_mut() {
            tree.update_multipliers(source, source_indices, mult)?;
        }

        Ok(tree)
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn push_branch(&mut self, branch: Branch) -> BranchId {
        let id = BranchId(self.branches.len() as u32);
        self.branches.push(branch);
        id
    }

    fn passes_path(&self, node_id: NodeId, cursor: &dyn RowCursor) -> Result<bool, DataError> {
        let mut current = node_id;
        loop {
            let node = &self.nodes[current.0 as usize];
            match node.input_branch {
                None => return Ok(true),
                Some(branch_id) => {
                    let branch = &self.branches[branch_id.0 as usize];
                    if !branch.cut.pass(cursor)? {
                        return Ok(false);
                    }
                    current = branch.input_node;
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn fill_layer(
        &self,
        work: &mut [NodeWork],
        registry: &VariableRegistry,
        target: &mut dyn RowCursor,
        target_indices: &[usize],
        source: &mut dyn RowCursor,
        source_indices: &[usize],
        multipliers: Option<&[f64]>,
    ) -> Result<(), DataError> {
        let layer_ids: Vec<NodeId> = work.iter().map(|w| w.node_id).collect();

        for &row_idx in target_indices {
            target.get_row(row_idx)?;
            for (wi, &node_id) in layer_ids.iter().enumerate() {
                if self.passes_path(node_id, &*target)? {
                    let w = target.event_weight()?;
                    let nw = &mut work[wi];
                    for (fi, &var_idx) in nw.feature_indices.iter().enumerate() {
                        let name = &registry.names()[var_idx];
                        let v = target.value(name)?;
                        nw.target_hists[fi].fill(v, w);
                    }
                    break;
                }
            }
        }

        for &row_idx in source_indices {
            source.get_row(row_idx)?;
            for (wi, &node_id) in layer_ids.iter().enumerate() {
                if self.passes_path(node_id, &*source)? {
                    let base_w = source.event_weight()?;
                    let w = match multipliers {
                        Some(m) => m[row_idx] * base_w,
                        None => base_w,
                    };
                    let nw = &mut work[wi];
                    for (fi, &var_idx) in nw.feature_indices.iter().enumerate() {
                        let name = &registry.names()[var_idx];
                        let v = source.value(name)?;
                        nw.source_hists[fi].fill(v, w);
                    }
                    break;
                }
            }
        }

        Ok(())
    }

    fn final_node_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_final())
            .map(|(i, _)| NodeId(i as u32))
            .collect()
    }

    fn finalize_weights(&mut self, learning_rate: f64) -> Result<(), ReweighterError> {
        let final_ids = self.final_node_ids();
        if final_ids.is_empty() {
            return Err(SplitError::NoFinalNodes.into());
        }
        let mut ratios = Vec::with_capacity(final_ids.len());
        let mut sum_source_weighted = 0.0;
        let mut sum_target = 0.0;
        for &id in &final_ids {
            let node = &self.nodes[id.0 as usize];
            let source = node.sum_source;
            let target = node.sum_target;
            if !(source > 0.0) {
                let path = self.path_to(id);
                let variable = path.last().map(|c| c.variable().to_string()).unwrap_or_default();
                return Err(SplitError::NonPositiveSource {
                    variable,
                    sum: source,
                    leaf: format_cut_path(&path),
                }
                .into());
            }
            let ratio = (learning_rate * (target / source).ln()).exp();
            ratios.push(ratio);
            sum_source_weighted += ratio * source;
            sum_target += target;
        }
        for (i, &id) in final_ids.iter().enumerate() {
            let w = sum_target * ratios[i] / sum_source_weighted;
            self.nodes[id.0 as usize].set_and_lock_weight(w);
        }
        Ok(())
    }

    /// After a BDT tree is grown, multiply the residual weight of every
    /// sampled source row by the weight of the leaf it lands in. A row
    /// sampled more than once (bagging) is updated only on its first
    /// occurrence, matching `DecisionTree::UpdateWeights`.
    fn update_multipliers(
        &self,
        source: &mut dyn RowCursor,
        source_indices: &[usize],
        multipliers: &mut [f64],
    ) -> Result<(), ReweighterError> {
        let mut previous: Option<usize> = None;
        for &idx in source_indices {
            if previous == Some(idx) {
                continue;
            }
            source.get_row(idx)?;
            let leaf_weight = self.route(&*source)?;
            multipliers[idx] *= leaf_weight;
            previous = Some(idx);
        }
        Ok(())
    }

    /// Routes a row from the root to its leaf and returns the leaf's
    /// weight.
    pub fn route(&self, cursor: &dyn RowCursor) -> Result<f64, ReweighterError> {
        let mut current = self.root;
        loop {
            let node = &self.nodes[current.0 as usize];
            if node.is_final() {
                return node.weight().ok_or_else(|| StateError::UnsetLeafWeight.into());
            }
            let low = node.output_low.ok_or(StateError::MissingOutputBranch)?;
            let high = node.output_high.ok_or(StateError::MissingOutputBranch)?;
            let low_branch = &self.branches[low.0 as usize];
            let high_branch = &self.branches[high.0 as usize];
            current = if low_branch.cut.pass(cursor)? {
                low_branch.output_node.ok_or(StateError::MissingOutputNode)?
            } else if high_branch.cut.pass(cursor)? {
                high_branch.output_node.ok_or(StateError::MissingOutputNode)?
            } else {
                return Err(StateError::AmbiguousCut.into());
            };
        }
    }

    /// Root-to-leaf cut path leading to `node_id`.
    pub fn path_to(&self, node_id: NodeId) -> Vec<Cut> {
        let mut cuts = Vec::new();
        let mut current = node_id;
        loop {
            let node = &self.nodes[current.0 as usize];
            match node.input_branch {
                None => break,
                Some(branch_id) => {
                    let branch = &self.branches[branch_id.0 as usize];
                    cuts.push(branch.cut.clone());
                    current = branch.input_node;
                }
            }
        }
        cuts.reverse();
        cuts
    }

    /// Writes one `weight=...` line per final node, in the original's
    /// leaf-to-root cut order.
    pub fn write_text(&self, out: &mut impl std::fmt::Write) -> std::fmt::Result {
        for id in self.final_node_ids() {
            let node = &self.nodes[id.0 as usize];
            let weight = node.weight().unwrap_or(0.0);
            let target = node.sum_target;
            let source = node.sum_source;
            write!(
                out,
                "weight={}:SumTarget/SumSource={}/{}={}:",
                weight,
                target,
                source,
                target / source
            )?;
            let mut cuts = self.path_to(id);
            cuts.reverse();
            for cut in cuts {
                let symbol = if cut.is_greater_eq() { '>' } else { '<' };
                write!(out, "{}{}{}|", cut.variable(), symbol, cut.threshold())?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    /// Rebuilds a tree from the leaves parsed out of a weights file.
    pub fn from_final_nodes(entries: &[ParsedLeaf]) -> Result<Self, ReweighterError> {
        let mut tree = DecisionTree {
            nodes: vec![Node::new_root()],
            branches: Vec::new(),
            root: NodeId(0),
        };
        tree.nodes[0].status = Status::First;

        for entry in entries {
            let mut current = tree.root;
            for cut in &entry.cuts {
                let is_high = cut.is_greater_eq();
                let existing = if is_high {
                    tree.nodes[current.0 as usize].output_high
                } else {
                    tree.nodes[current.0 as usize].output_low
                };
                current = match existing {
                    Some(branch_id) => tree.branches[branch_id.0 as usize]
                        .output_node
                        .ok_or(StateError::MissingOutputNode)?,
                    None => {
                        let branch_id = tree.push_branch(Branch {
                            input_node: current,
                            output_node: None,
                            cut: cut.clone(),
                            sum_source: 0.0,
                            sum_target: 0.0,
                        });
                        if is_high {
                            tree.nodes[current.0 as usize].output_high = Some(branch_id);
                        } else {
                            tree.nodes[current.0 as usize].output_low = Some(branch_id);
                        }
                        let mut child = Node::new_child(branch_id, -1.0, -1.0);
                        child.status = Status::Intermediate;
                        let child_id = tree.push_node(child);
                        tree.branches[branch_id.0 as usize].output_node = Some(child_id);
                        child_id
                    }
                };
            }
            let leaf = &mut tree.nodes[current.0 as usize];
            leaf.status = Status::Final;
            leaf.sum_source = entry.sum_source;
            leaf.sum_target = entry.sum_target;
            leaf.set_and_lock_weight(entry.weight);
        }

        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::InMemoryRows;
    use rand::SeedableRng;

    fn config(mode: SplitMode) -> TreeConfig {
        TreeConfig {
            min_events_node: 1.0,
            max_tree_layers: 3,
            learning_rate: 1.0,
            feature_sampling_fraction: None,
            split_mode: mode,
        }
    }

    fn registry_and_defs() -> (VariableRegistry, Vec<HistDef>) {
        let mut reg = VariableRegistry::new();
        reg.register("x").unwrap();
        let defs = vec![HistDef {
            variable: "x".into(),
            xmin: 0.0,
            xmax: 10.0,
            nbins: 10,
        }];
        (reg, defs)
    }

    #[test]
    fn grows_and_routes_a_separable_tree() {
        let (reg, defs) = registry_and_defs();
        let mut source = InMemoryRows::new("w")
            .with_column("x", (0..20).map(|i| i as f64 * 0.1).collect())
            .with_column("w", vec![1.0; 20]);
        let mut target = InMemoryRows::new("w")
            .with_column("x", (0..20).map(|i| 5.0 + i as f64 * 0.1).collect())
            .with_column("w", vec![1.0; 20]);
        let source_idx: Vec<usize> = (0..20).collect();
        let target_idx: Vec<usize> = (0..20).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let tree = DecisionTree::grow(
            &reg,
            &defs,
            &mut source,
            &source_idx,
            &mut target,
            &target_idx,
            &config(SplitMode::Chisquare),
            &mut rng,
            None,
        )
        .unwrap();

        source.get_row(0).unwrap();
        let low_weight = tree.route(&source).unwrap();
        source.get_row(19).unwrap();
        let high_weight = tree.route(&source).unwrap();
        assert!(low_weight > 0.0 && high_weight > 0.0);
        assert_ne!(low_weight, high_weight);
    }

    #[test]
    fn weights_file_round_trip_preserves_routing() {
        let (reg, defs) = registry_and_defs();
        let mut source = InMemoryRows::new("w")
            .with_column("x", (0..20).map(|i| i as f64 * 0.1).collect())
            .with_column("w", vec![1.0; 20]);
        let mut target = InMemoryRows::new("w")
            .with_column("x", (0..20).map(|i| 5.0 + i as f64 * 0.1).collect())
            .with_column("w", vec![1.0; 20]);
        let idx: Vec<usize> = (0..20).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let tree = DecisionTree::grow(
            &reg, &defs, &mut source, &idx, &mut target, &idx, &config(SplitMode::Chisquare), &mut rng, None,
        )
        .unwrap();

        let mut text = String::new();
        tree.write_text(&mut text).unwrap();

        let entries = crate::codec::parse_tree_block(&text, 0).unwrap();
        let rebuilt = DecisionTree::from_final_nodes(&entries).unwrap();

        for i in [0usize, 19] {
            source.get_row(i).unwrap();
            assert_eq!(tree.route(&source).unwrap(), rebuilt.route(&source).unwrap());
        }
    }
}
