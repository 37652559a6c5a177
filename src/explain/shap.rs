use crate::error::{AppError, Result};
use crate::ml::gbdt::{GbdtModel, Node, Tree};
use crate::ml::linear::LinearModel;
use ndarray::{Array2, ArrayView1};

/// Per-feature contributions explaining one prediction.
///
/// `base_value + values.sum()` reproduces the model's raw margin for the
/// explained sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribution {
    /// Contributions aligned positionally with the feature-name list
    pub values: Vec<f64>,
    /// Expected margin absent any feature information
    pub base_value: f64,
}

impl Attribution {
    /// All-zero attribution used when explanation fails but the numeric
    /// prediction should still be served.
    pub fn zeros(n_features: usize) -> Self {
        Self {
            values: vec![0.0; n_features],
            base_value: 0.0,
        }
    }

    /// Build from a raw attribution matrix, normalizing degenerate shapes.
    pub fn from_raw(raw: Array2<f64>, base_value: f64, n_features: usize) -> Result<Self> {
        let values = flatten_attribution(&raw, n_features)?;
        Ok(Self { values, base_value })
    }
}

/// Normalize an attribution matrix to a flat vector of feature length.
///
/// Accepts a `1 x n` row, a transposed `n x 1` single-sample result, or a
/// `k x n` multi-output result (first row wins).
pub fn flatten_attribution(raw: &Array2<f64>, n_features: usize) -> Result<Vec<f64>> {
    if raw.ncols() == n_features && raw.nrows() >= 1 {
        return Ok(raw.row(0).to_vec());
    }
    if raw.nrows() == n_features && raw.ncols() == 1 {
        return Ok(raw.column(0).to_vec());
    }
    Err(AppError::Computation(format!(
        "attribution shape {:?} does not fit {} features",
        raw.shape(),
        n_features
    )))
}

/// Exact path-dependent TreeSHAP over the boosted ensemble.
///
/// Contributions are summed across trees; the base value is the
/// cover-weighted expected margin, so additivity holds against
/// `GbdtModel::margin`.
pub fn tree_shap(model: &GbdtModel, features: ArrayView1<'_, f64>) -> Result<Attribution> {
    if features.len() != model.n_features {
        return Err(AppError::Computation(format!(
            "expected {} features, got {}",
            model.n_features,
            features.len()
        )));
    }

    let mut phi = vec![0.0; model.n_features];
    for tree in &model.trees {
        shap_recurse(tree, features, &mut phi, 0, Vec::new(), 1.0, 1.0, None);
    }

    let raw = Array2::from_shape_vec((1, model.n_features), phi)
        .map_err(|e| AppError::Computation(e.to_string()))?;
    Attribution::from_raw(raw, model.expected_margin(), model.n_features)
}

/// Closed-form SHAP for the linear model against a fixed background.
///
/// `phi_i = w_i * (x_i - background_i)`; the base value is the margin at the
/// background point.
pub fn linear_shap(
    model: &LinearModel,
    features: ArrayView1<'_, f64>,
    background: ArrayView1<'_, f64>,
) -> Result<Attribution> {
    let n = model.n_features();
    if features.len() != n || background.len() != n {
        return Err(AppError::Computation(format!(
            "expected {} features, got {} (background {})",
            n,
            features.len(),
            background.len()
        )));
    }

    let phi: Vec<f64> = model
        .weights
        .iter()
        .zip(features.iter().zip(background.iter()))
        .map(|(w, (x, z))| w * (x - z))
        .collect();
    let base_value = model.margin(background);

    let raw =
        Array2::from_shape_vec((1, n), phi).map_err(|e| AppError::Computation(e.to_string()))?;
    Attribution::from_raw(raw, base_value, n)
}

/// One step of the decision path bookkeeping from the TreeSHAP algorithm.
#[derive(Debug, Clone)]
struct PathElement {
    feature: Option<usize>,
    zero_fraction: f64,
    one_fraction: f64,
    pweight: f64,
}

fn extend_path(
    path: &mut Vec<PathElement>,
    zero_fraction: f64,
    one_fraction: f64,
    feature: Option<usize>,
) {
    let depth = path.len();
    path.push(PathElement {
        feature,
        zero_fraction,
        one_fraction,
        pweight: if depth == 0 { 1.0 } else { 0.0 },
    });
    let len = depth as f64 + 1.0;
    for i in (0..depth).rev() {
        path[i + 1].pweight += one_fraction * path[i].pweight * (i as f64 + 1.0) / len;
        path[i].pweight *= zero_fraction * ((depth - i) as f64) / len;
    }
}

fn unwound_path_sum(path: &[PathElement], path_index: usize) -> f64 {
    let unique_depth = path.len() - 1;
    let one_fraction = path[path_index].one_fraction;
    let zero_fraction = path[path_index].zero_fraction;
    let len = unique_depth as f64 + 1.0;

    let mut next_one_portion = path[unique_depth].pweight;
    let mut total = 0.0;
    for i in (0..unique_depth).rev() {
        if one_fraction != 0.0 {
            let tmp = next_one_portion * len / ((i as f64 + 1.0) * one_fraction);
            total += tmp;
            next_one_portion =
                path[i].pweight - tmp * zero_fraction * ((unique_depth - i) as f64) / len;
        } else {
            total += path[i].pweight / (zero_fraction * ((unique_depth - i) as f64) / len);
        }
    }
    total
}

fn unwind_path(path: &mut Vec<PathElement>, path_index: usize) {
    let unique_depth = path.len() - 1;
    let one_fraction = path[path_index].one_fraction;
    let zero_fraction = path[path_index].zero_fraction;
    let len = unique_depth as f64 + 1.0;

    let mut next_one_portion = path[unique_depth].pweight;
    for i in (0..unique_depth).rev() {
        if one_fraction != 0.0 {
            let tmp = path[i].pweight;
            path[i].pweight = next_one_portion * len / ((i as f64 + 1.0) * one_fraction);
            next_one_portion =
                tmp - path[i].pweight * zero_fraction * ((unique_depth - i) as f64) / len;
        } else {
            path[i].pweight = path[i].pweight * len / (zero_fraction * (unique_depth - i) as f64);
        }
    }
    for i in path_index..unique_depth {
        path[i].feature = path[i + 1].feature;
        path[i].zero_fraction = path[i + 1].zero_fraction;
        path[i].one_fraction = path[i + 1].one_fraction;
    }
    path.pop();
}

#[allow(clippy::too_many_arguments)]
fn shap_recurse(
    tree: &Tree,
    x: ArrayView1<'_, f64>,
    phi: &mut [f64],
    node_idx: usize,
    mut path: Vec<PathElement>,
    parent_zero_fraction: f64,
    parent_one_fraction: f64,
    parent_feature: Option<usize>,
) {
    extend_path(
        &mut path,
        parent_zero_fraction,
        parent_one_fraction,
        parent_feature,
    );

    match &tree.nodes[node_idx] {
        Node::Leaf { value, .. } => {
            for i in 1..path.len() {
                let weight = unwound_path_sum(&path, i);
                let element = &path[i];
                if let Some(feature) = element.feature {
                    phi[feature] +=
                        weight * (element.one_fraction - element.zero_fraction) * value;
                }
            }
        }
        Node::Split {
            feature,
            threshold,
            left,
            right,
            cover,
        } => {
            let (hot, cold) = if x[*feature] < *threshold {
                (*left, *right)
            } else {
                (*right, *left)
            };
            let hot_zero_fraction = tree.nodes[hot].cover() / cover;
            let cold_zero_fraction = tree.nodes[cold].cover() / cover;

            // A feature already on the path is undone before re-splitting.
            let mut incoming_zero = 1.0;
            let mut incoming_one = 1.0;
            if let Some(k) = path
                .iter()
                .enumerate()
                .skip(1)
                .find(|(_, el)| el.feature == Some(*feature))
                .map(|(i, _)| i)
            {
                incoming_zero = path[k].zero_fraction;
                incoming_one = path[k].one_fraction;
                unwind_path(&mut path, k);
            }

            shap_recurse(
                tree,
                x,
                phi,
                hot,
                path.clone(),
                hot_zero_fraction * incoming_zero,
                incoming_one,
                Some(*feature),
            );
            shap_recurse(
                tree,
                x,
                phi,
                cold,
                path,
                cold_zero_fraction * incoming_zero,
                0.0,
                Some(*feature),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::gbdt::{GbdtParams, Tree};
    use ndarray::{array, Array1};

    fn leaf(value: f64, cover: f64) -> Node {
        Node::Leaf { value, cover }
    }

    /// Conditional expectation of the tree output given a feature subset,
    /// descending on known features and cover-averaging over unknown ones.
    fn expvalue(tree: &Tree, x: &[f64], subset: u32, node_idx: usize) -> f64 {
        match &tree.nodes[node_idx] {
            Node::Leaf { value, .. } => *value,
            Node::Split {
                feature,
                threshold,
                left,
                right,
                cover,
            } => {
                if subset & (1 << feature) != 0 {
                    let next = if x[*feature] < *threshold { *left } else { *right };
                    expvalue(tree, x, subset, next)
                } else {
                    let wl = tree.nodes[*left].cover() / cover;
                    let wr = tree.nodes[*right].cover() / cover;
                    wl * expvalue(tree, x, subset, *left) + wr * expvalue(tree, x, subset, *right)
                }
            }
        }
    }

    fn factorial(n: usize) -> f64 {
        (1..=n).map(|v| v as f64).product()
    }

    /// Exact Shapley values over the conditional-expectation game.
    fn brute_force_shap(tree: &Tree, x: &[f64], n_features: usize) -> Vec<f64> {
        let mut phi = vec![0.0; n_features];
        for i in 0..n_features {
            for subset in 0u32..(1 << n_features) {
                if subset & (1 << i) != 0 {
                    continue;
                }
                let s = subset.count_ones() as usize;
                let weight = factorial(s) * factorial(n_features - s - 1)
                    / factorial(n_features);
                let with_i = expvalue(tree, x, subset | (1 << i), 0);
                let without_i = expvalue(tree, x, subset, 0);
                phi[i] += weight * (with_i - without_i);
            }
        }
        phi
    }

    /// Depth-two tree over two features with uneven covers.
    fn sample_tree() -> Tree {
        Tree {
            nodes: vec![
                Node::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 1,
                    right: 2,
                    cover: 10.0,
                },
                leaf(-1.0, 6.0),
                Node::Split {
                    feature: 1,
                    threshold: 1.0,
                    left: 3,
                    right: 4,
                    cover: 4.0,
                },
                leaf(0.5, 3.0),
                leaf(2.0, 1.0),
            ],
        }
    }

    #[test]
    fn tree_shap_matches_brute_force() {
        let tree = sample_tree();
        for x in [
            vec![-1.0, 0.0],
            vec![1.0, 0.0],
            vec![1.0, 2.0],
            vec![0.5, 0.99],
        ] {
            let mut phi = vec![0.0; 2];
            shap_recurse(
                &tree,
                Array1::from_vec(x.clone()).view(),
                &mut phi,
                0,
                Vec::new(),
                1.0,
                1.0,
                None,
            );
            let expected = brute_force_shap(&tree, &x, 2);
            for (a, b) in phi.iter().zip(expected.iter()) {
                assert!((a - b).abs() < 1e-9, "shap {:?} != brute {:?}", phi, expected);
            }
        }
    }

    #[test]
    fn tree_shap_additivity_on_trained_model() {
        let features = array![
            [0.1, 1.0, 3.0],
            [0.2, -1.0, 2.0],
            [0.3, 0.5, -1.0],
            [0.4, -0.5, 0.0],
            [2.1, 1.0, 1.5],
            [2.2, -1.0, -2.0],
            [2.3, 0.5, 0.3],
            [2.4, -0.5, 2.5],
        ];
        let targets = vec![0, 0, 0, 0, 1, 1, 1, 1];
        let model = GbdtModel::train(&features, &targets, &GbdtParams::default()).unwrap();

        for row in features.outer_iter() {
            let attribution = tree_shap(&model, row).unwrap();
            let reconstructed =
                attribution.base_value + attribution.values.iter().sum::<f64>();
            let margin = model.margin(row);
            assert!(
                (reconstructed - margin).abs() < 1e-9,
                "additivity violated: {} vs {}",
                reconstructed,
                margin
            );
        }
    }

    #[test]
    fn linear_shap_additivity() {
        let model = LinearModel {
            model_version: 1,
            weights: array![0.5, -2.0, 1.0],
            intercept: 0.3,
            n_training_samples: 0,
            trained_at: chrono::Utc::now(),
        };
        let x = array![1.0, 2.0, -1.0];
        let background = array![0.1, -0.2, 0.0];

        let attribution = linear_shap(&model, x.view(), background.view()).unwrap();
        let reconstructed = attribution.base_value + attribution.values.iter().sum::<f64>();
        assert!((reconstructed - model.margin(x.view())).abs() < 1e-12);
        assert!((attribution.base_value - model.margin(background.view())).abs() < 1e-12);
    }

    #[test]
    fn flatten_accepts_row_matrix() {
        let raw = array![[1.0, 2.0, 3.0]];
        assert_eq!(flatten_attribution(&raw, 3).unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn flatten_accepts_transposed_single_sample() {
        let raw = array![[1.0], [2.0], [3.0]];
        assert_eq!(flatten_attribution(&raw, 3).unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn flatten_takes_first_row_of_multi_output() {
        let raw = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        assert_eq!(flatten_attribution(&raw, 2).unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn flatten_rejects_mismatched_shape() {
        let raw = array![[1.0, 2.0, 3.0]];
        assert!(flatten_attribution(&raw, 5).is_err());
    }

    #[test]
    fn shap_arity_mismatch_is_an_error() {
        let features = array![[0.0, 1.0], [1.0, 0.0], [2.0, 1.0], [3.0, 0.0]];
        let targets = vec![0, 0, 1, 1];
        let model = GbdtModel::train(&features, &targets, &GbdtParams::default()).unwrap();
        assert!(tree_shap(&model, array![1.0].view()).is_err());
    }
}
