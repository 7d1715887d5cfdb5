//! Split search over a node's per-variable histograms. `Chisquare` mode
//! picks the variable/bin maximizing the chi-square statistic between
//! source and target; `Random` mode (used only by Extremely Randomized
//! Trees) picks one variable and one valid bin uniformly at random.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::histogram::Histogram;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    Chisquare,
    Random,
}

#[derive(Debug, Clone)]
pub struct SplitCandidate {
    pub variable: String,
    pub threshold: f64,
    pub chisquare: f64,
    pub sum_source_low: f64,
    pub sum_target_low: f64,
    pub sum_source_high: f64,
    pub sum_target_high: f64,
}

/// One row per sampled variable: its name and its source/target histograms
/// for the node currently being split.
pub type VariableHistograms = (String, Histogram, Histogram);

fn chisquare_at_bin(source: &Histogram, target: &Histogram, b: usize, min_events: f64) -> Option<(f64, f64, f64, f64, f64)> {
    let (s_lo, s_lo_e) = source.integral_and_error(0, b as i64);
    let (s_hi, s_hi_e) = source.integral_and_error(b + 1, -1);
    let (t_lo, t_lo_e) = target.integral_and_error(0, b as i64);
    let (t_hi, t_hi_e) = target.integral_and_error(b + 1, -1);
    if s_lo < min_events || s_hi < min_events || t_lo < min_events || t_hi < min_events {
        return None;
    }
    let chi = (s_lo - t_lo).powi(2) / (s_lo_e.powi(2) + t_lo_e.powi(2))
        + (s_hi - t_hi).powi(2) / (s_hi_e.powi(2) + t_hi_e.powi(2));
    Some((chi, s_lo, t_lo, s_hi, t_hi))
}

fn chisquare_candidate(source: &Histogram, target: &Histogram, variable: &str, min_events: f64) -> Option<SplitCandidate> {
    let nbins = source.nbins();
    let mut best: Option<SplitCandidate> = None;
    for b in 1..nbins {
        if let Some((chi, s_lo, t_lo, s_hi, t_hi)) = chisquare_at_bin(source, target, b, min_events) {
            // zero separating power never replaces the unset best, so a node
            // where source and target agree everywhere stays final
            if chi <= 0.0 {
                continue;
            }
            let better = best.as_ref().map_or(true, |c| chi > c.chisquare);
            if better {
                best = Some(SplitCandidate {
                    variable: variable.to_string(),
                    threshold: source.bin_low_edge(b + 1),
                    chisquare: chi,
                    sum_source_low: s_lo,
                    sum_target_low: t_lo,
                    sum_source_high: s_hi,
                    sum_target_high: t_hi,
                });
            }
        }
    }
    best
}

/// Best chi-square split across all sampled variables, first-seen order
/// breaking ties (a strictly greater chi-square is required to replace the
/// current best).
pub fn best_chisquare_split(histograms: &[VariableHistograms], min_events: f64) -> Option<SplitCandidate> {
    let mut best: Option<SplitCandidate> = None;
    for (name, source, target) in histograms {
        if let Some(candidate) = chisquare_candidate(source, target, name, min_events) {
            let better = best.as_ref().map_or(true, |b| candidate.chisquare > b.chisquare);
            if better {
                best = Some(candidate);
            }
        }
    }
    best
}

/// Picks one sampled variable and one of its bins satisfying the
/// min-events constraint, uniformly at random.
pub fn random_split(
    histograms: &[VariableHistograms],
    min_events: f64,
    rng: &mut ChaCha8Rng,
) -> Option<SplitCandidate> {
    if histograms.is_empty() {
        return None;
    }
    let var_idx = rng.gen_range(0..histograms.len());
    let (name, source, target) = &histograms[var_idx];
    let nbins = source.nbins();
    let mut valid_bins = Vec::new();
    for b in 1..nbins {
        if chisquare_at_bin(source, target, b, min_events).is_some() {
            valid_bins.push(b);
        }
    }
    if valid_bins.is_empty() {
        return None;
    }
    let chosen = valid_bins[rng.gen_range(0..valid_bins.len())];
    let (chi, s_lo, t_lo, s_hi, t_hi) = chisquare_at_bin(source, target, chosen, min_events)?;
    Some(SplitCandidate {
        variable: name.clone(),
        threshold: source.bin_low_edge(chosen + 1),
        chisquare: chi,
        sum_source_low: s_lo,
        sum_target_low: t_lo,
        sum_source_high: s_hi,
        sum_target_high: t_hi,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn make_hist(nbins: usize, xmin: f64, xmax: f64, points: &[f64]) -> Histogram {
        let mut h = Histogram::new(nbins, xmin, xmax).unwrap();
        for &p in points {
            h.fill(p, 1.0);
        }
        h
    }

    #[test]
    fn finds_a_separating_split() {
        let source_low: Vec<f64> = (0..20).map(|i| i as f64 * 0.1).collect();
        let target_high: Vec<f64> = (0..20).map(|i| 5.0 + i as f64 * 0.1).collect();
        let source = make_hist(10, 0.0, 10.0, &source_low);
        let target = make_hist(10, 0.0, 10.0, &target_high);
        let histograms = vec![("x".to_string(), source, target)];
        let candidate = best_chisquare_split(&histograms, 1.0).unwrap();
        assert_eq!(candidate.variable, "x");
        assert!(candidate.threshold > 1.0 && candidate.threshold < 9.0);
    }

    #[test]
    fn min_events_constraint_can_eliminate_all_candidates() {
        let source = make_hist(10, 0.0, 10.0, &[1.0, 2.0]);
        let target = make_hist(10, 0.0, 10.0, &[1.0, 2.0]);
        let histograms = vec![("x".to_string(), source, target)];
        assert!(best_chisquare_split(&histograms, 1000.0).is_none());
    }

    #[test]
    fn random_split_only_returns_valid_bins() {
        let source = make_hist(4, 0.0, 4.0, &[0.5, 1.5, 2.5, 3.5]);
        let target = make_hist(4, 0.0, 4.0, &[0.5, 1.5, 2.5, 3.5]);
        let histograms = vec![("x".to_string(), source, target)];
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let candidate = random_split(&histograms, 1.0, &mut rng);
        assert!(candidate.is_some());
    }
}
