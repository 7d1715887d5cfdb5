//! The ensemble methods: BDT grows trees sequentially against a shared
//! residual multiplier, while RF/ET grow independent trees from fresh
//! bootstrap samples. Aggregation at inference differs accordingly: BDT
//! multiplies a tree's weight across each forest then averages over
//! forests, while RF/ET pool every tree across every forest and average
//! over the pool.

use crate::config::{Config, Method};
use crate::error::{ConfigError, ReweighterError};
use crate::forest::Forest;
use crate::histdef::discover_ranges;
use crate::rng;
use crate::row::RowCursor;
use crate::sampling::{sample_unique, sample_with_replacement};
use crate::splitter::SplitMode;
use crate::tree::{DecisionTree, TreeConfig};
use crate::variable::VariableRegistry;

#[derive(Debug, Clone)]
pub struct EnsembleParams {
    pub method: Method,
    pub number_of_trees: usize,
    pub max_tree_layers: usize,
    pub min_events_node: f64,
    pub learning_rate: f64,
    pub sampling_fraction: f64,
    pub sampling_fraction_seed: u64,
    pub bagging: bool,
    pub feature_sampling_fraction: Option<f64>,
}

impl EnsembleParams {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let method = Method::parse(config.get_str("Method")?)?;
        let learning_rate = config.get_float("LearningRate")?;
        if matches!(method, Method::Rf | Method::Et) && (learning_rate - 1.0).abs() > 1e-9 {
            return Err(ConfigError::OutOfRange {
                key: "LearningRate".into(),
                message: "must be 1.0 for RF and ET".into(),
            });
        }
        let bagging = config.get_bool_if("Bagging", false);
        if matches!(method, Method::Rf | Method::Et) && !bagging {
            return Err(ConfigError::OutOfRange {
                key: "Bagging".into(),
                message: "must be true for RF and ET".into(),
            });
        }
        let feature_sampling_fraction = if matches!(method, Method::Rf | Method::Et) {
            Some(config.get_float("FeatureSamplingFraction")?)
        } else {
            None
        };
        Ok(Self {
            method,
            number_of_trees: config.get_int("NumberOfTrees")? as usize,
            max_tree_layers: config.get_int("MaxTreeLayers")? as usize,
            min_events_node: config.get_int("MinEventsNode")? as f64,
            learning_rate,
            sampling_fraction: config.get_float("SamplingFraction")?,
            sampling_fraction_seed: config.get_int("SamplingFractionSeed")? as u64,
            bagging,
            feature_sampling_fraction,
        })
    }

    fn split_mode(&self) -> SplitMode {
        match self.method {
            Method::Et => SplitMode::Random,
            Method::Bdt | Method::Rf => SplitMode::Chisquare,
        }
    }

    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            min_events_node: self.min_events_node,
            max_tree_layers: self.max_tree_layers,
            learning_rate: self.learning_rate,
            feature_sampling_fraction: self.feature_sampling_fraction,
            split_mode: self.split_mode(),
        }
    }
}

#[derive(Debug)]
pub struct Ensemble {
    pub method: Method,
    pub forests: Vec<Forest>,
}

impl Ensemble {
    pub fn train(
        params: &EnsembleParams,
        registry: &VariableRegistry,
        source: &mut dyn RowCursor,
        target: &mut dyn RowCursor,
    ) -> Result<Self, ReweighterError> {
        let hist_defs = discover_ranges(registry, target, source)?;
        let mut rng = rng::seeded(params.sampling_fraction_seed);
        let tree_config = params.tree_config();
        let mut forest = Forest::new();

        match params.method {
            Method::Bdt => {
                let mut multipliers = vec![1.0f64; source.row_count()];
                let fixed = if !params.bagging {
                    Some((
                        sample_unique(source.row_count(), params.sampling_fraction, &mut rng),
                        sample_unique(target.row_count(), params.sampling_fraction, &mut rng),
                    ))
                } else {
                    None
                };
                for _ in 0..params.number_of_trees {
                    let (source_indices, target_indices) = match &fixed {
                        Some((s, t)) => (s.clone(), t.clone()),
                        None => (
                            sample_with_replacement(source, params.sampling_fraction, &mut rng)?,
                            sample_with_replacement(target, params.sampling_fraction, &mut rng)?,
                        ),
                    };
                    let tree = DecisionTree::grow(
                        registry,
                        &hist_defs,
                        source,
                        &source_indices,
                        target,
                        &target_indices,
                        &tree_config,
                        &mut rng,
                        Some(&mut multipliers),
                    )?;
                    forest.add_tree(tree);
                }
            }
            Method::Rf | Method::Et => {
                for _ in 0..params.number_of_trees {
                    let source_indices = sample_with_replacement(source, params.sampling_fraction, &mut rng)?;
                    let target_indices = sample_with_replacement(target, params.sampling_fraction, &mut rng)?;
                    let tree = DecisionTree::grow(
                        registry,
                        &hist_defs,
                        source,
                        &source_indices,
                        target,
                        &target_indices,
                        &tree_config,
                        &mut rng,
                        None,
                    )?;
                    forest.add_tree(tree);
                }
            }
        }

        Ok(Self {
            method: params.method,
            forests: vec![forest],
        })
    }

    pub fn infer(&self, cursor: &mut dyn RowCursor, row: usize) -> Result<(f64, f64), ReweighterError> {
        cursor.get_row(row)?;
        match self.method {
            Method::Bdt => self.infer_bdt(cursor),
            Method::Rf | Method::Et => self.infer_pooled(cursor),
        }
    }

    fn infer_bdt(&self, cursor: &dyn RowCursor) -> Result<(f64, f64), ReweighterError> {
        let mut products = Vec::with_capacity(self.forests.len());
        for forest in &self.forests {
            let mut w = 1.0;
            for tree in forest.trees() {
                w *= tree.route(cursor)?;
            }
            products.push(w);
        }
        Ok(mean_and_stdev(&products))
    }

    fn infer_pooled(&self, cursor: &dyn RowCursor) -> Result<(f64, f64), ReweighterError> {
        let mut pool = Vec::new();
        for forest in &self.forests {
            for tree in forest.trees() {
                pool.push(tree.route(cursor)?);
            }
        }
        Ok(mean_and_stdev(&pool))
    }
}

fn mean_and_stdev(values: &[f64]) -> (f64, f64) {
    let n = values.len().max(1) as f64;
    let mean: f64 = values.iter().sum::<f64>() / n;
    let divisor = values.len().saturating_sub(1).max(1) as f64;
    let variance: f64 = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / divisor;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_stdev_of_a_single_value_has_zero_spread() {
        let (mean, stdev) = mean_and_stdev(&[3.0]);
        assert_eq!(mean, 3.0);
        assert_eq!(stdev, 0.0);
    }

    #[test]
    fn mean_and_stdev_divisor_uses_max_n_minus_one_one() {
        let (mean, stdev) = mean_and_stdev(&[1.0, 3.0]);
        assert_eq!(mean, 2.0);
        // variance = ((1-2)^2 + (3-2)^2) / max(2-1,1) = 2 / 1 = 2
        assert!((stdev - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn rf_et_require_bagging_and_unit_learning_rate() {
        let mut config = Config::new();
        config
            .put_str("Method", "RF")
            .put_float("LearningRate", 1.0)
            .put_bool("Bagging", false)
            .put_float("FeatureSamplingFraction", 0.5)
            .put_int("NumberOfTrees", 10)
            .put_int("MaxTreeLayers", 3)
            .put_int("MinEventsNode", 5)
            .put_float("SamplingFraction", 0.5)
            .put_int("SamplingFractionSeed", 1);
        assert!(EnsembleParams::from_config(&config).is_err());
    }

    #[test]
    fn rf_et_reject_non_unit_learning_rate() {
        let mut config = Config::new();
        config
            .put_str("Method", "ET")
            .put_float("LearningRate", 0.5)
            .put_bool("Bagging", true)
            .put_float("FeatureSamplingFraction", 0.5)
            .put_int("NumberOfTrees", 10)
            .put_int("MaxTreeLayers", 3)
            .put_int("MinEventsNode", 5)
            .put_float("SamplingFraction", 0.5)
            .put_int("SamplingFractionSeed", 1);
        assert!(EnsembleParams::from_config(&config).is_err());
    }
}
