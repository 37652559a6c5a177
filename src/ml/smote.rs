use crate::error::{AppError, Result};
use linfa_nn::{distance::L2Dist, CommonNearestNeighbour, NearestNeighbour};
use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// SMOTE oversampling for a binary target
///
/// Synthesizes minority-class samples on segments between a minority sample
/// and one of its k nearest minority neighbours until both classes reach
/// parity. Neighbour queries run on a KdTree over the minority rows; all
/// randomness comes from the seeded generator, so a given (dataset, seed)
/// pair reproduces the same resampled matrix.
pub fn smote_oversample(
    features: &Array2<f64>,
    targets: &[usize],
    k: usize,
    seed: u64,
) -> Result<(Array2<f64>, Vec<usize>)> {
    if features.nrows() != targets.len() {
        return Err(AppError::Dataset(format!(
            "feature rows ({}) and targets ({}) differ",
            features.nrows(),
            targets.len()
        )));
    }

    let positives = targets.iter().filter(|&&t| t == 1).count();
    let negatives = targets.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(AppError::Dataset(
            "both classes must be present to oversample".to_string(),
        ));
    }
    if positives == negatives {
        return Ok((features.clone(), targets.to_vec()));
    }

    let minority_label = if positives < negatives { 1 } else { 0 };
    let deficit = positives.abs_diff(negatives);

    let minority_indices: Vec<usize> = targets
        .iter()
        .enumerate()
        .filter(|(_, &t)| t == minority_label)
        .map(|(i, _)| i)
        .collect();
    let minority = features.select(Axis(0), &minority_indices);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut synthetic: Vec<f64> = Vec::with_capacity(deficit * features.ncols());

    if minority.nrows() == 1 {
        // A single minority point has no neighbours; replicate it.
        for _ in 0..deficit {
            synthetic.extend(minority.row(0).iter());
        }
    } else {
        let k_eff = k.clamp(1, minority.nrows() - 1);
        let index = CommonNearestNeighbour::KdTree
            .from_batch(&minority, L2Dist)
            .map_err(|e| AppError::Computation(format!("neighbour index build failed: {}", e)))?;

        for _ in 0..deficit {
            let anchor_idx = rng.gen_range(0..minority.nrows());
            let anchor = minority.row(anchor_idx);

            // Query one extra so the anchor itself can be discarded.
            let neighbours = index
                .k_nearest(anchor.view(), k_eff + 1)
                .map_err(|e| AppError::Computation(format!("neighbour query failed: {}", e)))?;
            let candidates: Vec<usize> = neighbours
                .iter()
                .map(|(_, i)| *i)
                .filter(|&i| i != anchor_idx)
                .take(k_eff)
                .collect();
            if candidates.is_empty() {
                synthetic.extend(anchor.iter());
                continue;
            }

            let neighbour = minority.row(candidates[rng.gen_range(0..candidates.len())]);
            let gap: f64 = rng.gen();
            for (a, b) in anchor.iter().zip(neighbour.iter()) {
                synthetic.push(a + gap * (b - a));
            }
        }
    }

    let n_new = features.nrows() + deficit;
    let mut data = features.iter().copied().collect::<Vec<f64>>();
    data.extend(synthetic);
    let resampled = Array2::from_shape_vec((n_new, features.ncols()), data)
        .map_err(|e| AppError::Computation(e.to_string()))?;

    let mut resampled_targets = targets.to_vec();
    resampled_targets.extend(std::iter::repeat(minority_label).take(deficit));

    Ok((resampled, resampled_targets))
}
