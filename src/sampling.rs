//! Index sampling for both tree bagging and per-node feature selection.
//! Both flavors share the same Fisher-Yates core as `Node::Initialize`'s
//! feature shuffle; weighted sampling-with-replacement mirrors
//! `Algorithm::PrepareIndices`/`BinarySearchIndex`.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::error::{DataError, StateError};
use crate::row::RowCursor;

/// Shuffles `0..n_rows` and takes the first `floor(fraction * n_rows)`
/// entries, sorted ascending. Used for BDT's non-bagging mode, where the
/// same index set is reused across every tree.
pub fn sample_unique(n_rows: usize, fraction: f64, rng: &mut ChaCha8Rng) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n_rows).collect();
    fisher_yates(&mut indices, rng);
    let take = (fraction * n_rows as f64).floor() as usize;
    let mut sample: Vec<usize> = indices.into_iter().take(take).collect();
    sample.sort_unstable();
    sample
}

/// Draws `floor(fraction * row_count)` indices with replacement, weighted
/// by each row's event weight, and returns them sorted ascending.
pub fn sample_with_replacement(
    cursor: &mut dyn RowCursor,
    fraction: f64,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<usize>, DataError> {
    let n_rows = cursor.row_count();
    let mut cumulative = Vec::with_capacity(n_rows);
    let mut running = 0.0;
    for i in 0..n_rows {
        cursor.get_row(i)?;
        running += cursor.event_weight()?;
        cumulative.push(running);
    }
    let take = (fraction * n_rows as f64).floor() as usize;
    let total = *cumulative.last().unwrap_or(&0.0);
    let mut sample = Vec::with_capacity(take);
    for _ in 0..take {
        let draw = rng.gen::<f64>() * total;
        let idx = binary_search_index(&cumulative, draw)
            .map_err(|_| DataError::RowOutOfRange { index: 0, row_count: n_rows })?;
        sample.push(idx);
    }
    sample.sort_unstable();
    Ok(sample)
}

/// Shuffles `0..n_vars` and keeps the first `ceil(fraction * n_vars)`
/// indices, in shuffled order (not re-sorted): the chi-square splitter
/// breaks ties by first-seen order, so the iteration order of sampled
/// features is observable.
pub fn select_features(n_vars: usize, fraction: Option<f64>, rng: &mut ChaCha8Rng) -> Vec<usize> {
    match fraction {
        None => (0..n_vars).collect(),
        Some(frac) => {
            let mut indices: Vec<usize> = (0..n_vars).collect();
            fisher_yates(&mut indices, rng);
            let take = (frac * n_vars as f64).ceil() as usize;
            indices.truncate(take.min(n_vars));
            indices
        }
    }
}

fn fisher_yates(indices: &mut [usize], rng: &mut ChaCha8Rng) {
    for i in 0..indices.len() {
        let j = rng.gen_range(i..indices.len());
        indices.swap(i, j);
    }
}

/// Returns the index of the cumulative-distribution entry that `val` falls
/// into: the smallest `i` such that `cumulative[i] >= val`, found by binary
/// search over the (ascending) cumulative array.
pub fn binary_search_index(cumulative: &[f64], val: f64) -> Result<usize, StateError> {
    if cumulative.is_empty() {
        return Err(StateError::InvalidBinarySearchBounds {
            l: 0,
            r: -1,
            len: 0,
        });
    }
    let mut l: i64 = 0;
    let mut r: i64 = cumulative.len() as i64 - 1;
    while r - l > 1 {
        let mid = l + (r - l) / 2;
        if cumulative[mid as usize] > val {
            r = mid;
        } else {
            l = mid;
        }
    }
    Ok(r as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::InMemoryRows;
    use rand::SeedableRng;

    #[test]
    fn sample_unique_takes_requested_fraction_and_sorts() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let sample = sample_unique(100, 0.3, &mut rng);
        assert_eq!(sample.len(), 30);
        assert!(sample.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn same_seed_gives_same_unique_sample() {
        let mut rng_a = ChaCha8Rng::seed_from_u64(42);
        let mut rng_b = ChaCha8Rng::seed_from_u64(42);
        assert_eq!(
            sample_unique(50, 0.5, &mut rng_a),
            sample_unique(50, 0.5, &mut rng_b)
        );
    }

    #[test]
    fn sample_with_replacement_respects_zero_weight_rows() {
        let mut rows = InMemoryRows::new("w")
            .with_column("w", vec![1.0, 0.0, 1.0, 0.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let sample = sample_with_replacement(&mut rows, 1.0, &mut rng).unwrap();
        assert!(sample.iter().all(|&i| i == 0 || i == 2));
    }

    #[test]
    fn binary_search_index_finds_bracketing_bin() {
        let cumulative = vec![1.0, 3.0, 6.0, 10.0];
        assert_eq!(binary_search_index(&cumulative, 0.5).unwrap(), 1);
        assert_eq!(binary_search_index(&cumulative, 2.0).unwrap(), 1);
        assert_eq!(binary_search_index(&cumulative, 9.9).unwrap(), 3);
    }

    #[test]
    fn select_features_ceils_the_take_count() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let selected = select_features(10, Some(0.25), &mut rng);
        assert_eq!(selected.len(), 3);
    }
}
