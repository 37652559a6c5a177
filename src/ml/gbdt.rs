use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Node of a decision tree, stored in a flat array with child indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        /// Hessian mass that reached this node during training
        cover: f64,
    },
    Leaf {
        /// Margin contribution, learning rate already applied
        value: f64,
        cover: f64,
    },
}

impl Node {
    pub fn cover(&self) -> f64 {
        match self {
            Node::Split { cover, .. } => *cover,
            Node::Leaf { cover, .. } => *cover,
        }
    }
}

/// Regression tree over gradient/hessian residuals. Root at index 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Margin contribution for one sample.
    pub fn predict(&self, features: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value, .. } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if features[*feature] < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Cover-weighted mean leaf value, the tree's contribution to the
    /// ensemble's expected margin.
    pub fn expected_value(&self) -> f64 {
        self.expected_value_at(0)
    }

    fn expected_value_at(&self, idx: usize) -> f64 {
        match &self.nodes[idx] {
            Node::Leaf { value, .. } => *value,
            Node::Split {
                left, right, cover, ..
            } => {
                let wl = self.nodes[*left].cover() / cover;
                let wr = self.nodes[*right].cover() / cover;
                wl * self.expected_value_at(*left) + wr * self.expected_value_at(*right)
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(AppError::Serialization("tree has no nodes".to_string()));
        }
        for node in &self.nodes {
            if let Node::Split {
                left, right, cover, ..
            } = node
            {
                if *left >= self.nodes.len() || *right >= self.nodes.len() {
                    return Err(AppError::Serialization(
                        "tree child index out of range".to_string(),
                    ));
                }
                if *cover <= 0.0 {
                    return Err(AppError::Serialization(
                        "tree node has non-positive cover".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Boosting hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbdtParams {
    /// Number of boosting rounds
    pub rounds: usize,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Shrinkage applied to every leaf value
    pub learning_rate: f64,
    /// L2 regularization on leaf weights
    pub lambda: f64,
    /// Minimum gain required to keep a split
    pub gamma: f64,
    /// Minimum hessian mass per child
    pub min_child_weight: f64,
}

impl Default for GbdtParams {
    fn default() -> Self {
        Self {
            rounds: 60,
            max_depth: 3,
            learning_rate: 0.1,
            lambda: 1.0,
            gamma: 0.0,
            min_child_weight: 1.0,
        }
    }
}

/// Gradient-boosted tree ensemble for binary logistic classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbdtModel {
    /// Model format version
    pub model_version: i64,
    /// Number of features expected per sample
    pub n_features: usize,
    /// Initial margin (log-odds of the training prior)
    pub base_score: f64,
    /// Boosted trees, applied additively on the margin
    pub trees: Vec<Tree>,
    /// Number of samples the model was fit on
    pub n_training_samples: usize,
    /// Training timestamp
    pub trained_at: DateTime<Utc>,
}

impl GbdtModel {
    /// Fit the ensemble with greedy exact split search.
    pub fn train(features: &Array2<f64>, targets: &[usize], params: &GbdtParams) -> Result<Self> {
        let n = features.nrows();
        if n == 0 || n != targets.len() {
            return Err(AppError::Dataset(format!(
                "feature rows ({}) and targets ({}) differ or are empty",
                n,
                targets.len()
            )));
        }

        let positives = targets.iter().filter(|&&t| t == 1).count();
        let prior = (positives as f64 / n as f64).clamp(1e-6, 1.0 - 1e-6);
        let base_score = (prior / (1.0 - prior)).ln();

        let mut margins = vec![base_score; n];
        let mut grad = vec![0.0f64; n];
        let mut hess = vec![0.0f64; n];
        let mut trees = Vec::with_capacity(params.rounds);
        let all_indices: Vec<usize> = (0..n).collect();

        for _round in 0..params.rounds {
            for i in 0..n {
                let p = sigmoid(margins[i]);
                grad[i] = p - targets[i] as f64;
                hess[i] = (p * (1.0 - p)).max(1e-16);
            }

            let mut builder = TreeBuilder {
                features,
                grad: &grad,
                hess: &hess,
                params,
                nodes: Vec::new(),
            };
            builder.build(&all_indices, 0);
            let tree = Tree {
                nodes: builder.nodes,
            };

            for (i, margin) in margins.iter_mut().enumerate() {
                *margin += tree.predict(features.row(i));
            }
            trees.push(tree);
        }

        Ok(Self {
            model_version: 1,
            n_features: features.ncols(),
            base_score,
            trees,
            n_training_samples: n,
            trained_at: Utc::now(),
        })
    }

    /// Raw margin (log-odds) for one sample.
    pub fn margin(&self, features: ArrayView1<'_, f64>) -> f64 {
        self.base_score
            + self
                .trees
                .iter()
                .map(|tree| tree.predict(features))
                .sum::<f64>()
    }

    /// Probability of the positive (failure) class.
    pub fn predict_probability(&self, features: ArrayView1<'_, f64>) -> f64 {
        sigmoid(self.margin(features))
    }

    /// Cover-weighted expected margin of the whole ensemble.
    pub fn expected_margin(&self) -> f64 {
        self.base_score
            + self
                .trees
                .iter()
                .map(|tree| tree.expected_value())
                .sum::<f64>()
    }

    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<()> {
        if self.n_features == 0 {
            return Err(AppError::Serialization(
                "model expects zero features".to_string(),
            ));
        }
        for tree in &self.trees {
            tree.validate()?;
        }
        Ok(())
    }
}

/// Numerically safe logistic function.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

struct TreeBuilder<'a> {
    features: &'a Array2<f64>,
    grad: &'a [f64],
    hess: &'a [f64],
    params: &'a GbdtParams,
    nodes: Vec<Node>,
}

struct BestSplit {
    gain: f64,
    feature: usize,
    threshold: f64,
}

impl<'a> TreeBuilder<'a> {
    fn build(&mut self, indices: &[usize], depth: usize) -> usize {
        let g: f64 = indices.iter().map(|&i| self.grad[i]).sum();
        let h: f64 = indices.iter().map(|&i| self.hess[i]).sum();

        if depth >= self.params.max_depth || indices.len() < 2 {
            return self.push_leaf(g, h);
        }

        let best = match self.best_split(indices, g, h) {
            Some(split) if split.gain > 0.0 => split,
            _ => return self.push_leaf(g, h),
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| self.features[[i, best.feature]] < best.threshold);
        if left_indices.is_empty() || right_indices.is_empty() {
            return self.push_leaf(g, h);
        }

        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: 0.0,
            cover: h,
        });
        let left = self.build(&left_indices, depth + 1);
        let right = self.build(&right_indices, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
            cover: h,
        };
        idx
    }

    fn push_leaf(&mut self, g: f64, h: f64) -> usize {
        let value = -g / (h + self.params.lambda) * self.params.learning_rate;
        self.nodes.push(Node::Leaf { value, cover: h });
        self.nodes.len() - 1
    }

    fn best_split(&self, indices: &[usize], g_total: f64, h_total: f64) -> Option<BestSplit> {
        let lambda = self.params.lambda;
        let parent_score = g_total * g_total / (h_total + lambda);
        let mut best: Option<BestSplit> = None;

        for feature in 0..self.features.ncols() {
            let mut sorted: Vec<usize> = indices.to_vec();
            sorted.sort_by(|&a, &b| {
                self.features[[a, feature]]
                    .partial_cmp(&self.features[[b, feature]])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut gl = 0.0;
            let mut hl = 0.0;
            for window in 0..sorted.len() - 1 {
                let i = sorted[window];
                gl += self.grad[i];
                hl += self.hess[i];

                let current = self.features[[i, feature]];
                let next = self.features[[sorted[window + 1], feature]];
                if current == next {
                    continue;
                }

                let gr = g_total - gl;
                let hr = h_total - hl;
                if hl < self.params.min_child_weight || hr < self.params.min_child_weight {
                    continue;
                }

                let gain = 0.5
                    * (gl * gl / (hl + lambda) + gr * gr / (hr + lambda) - parent_score)
                    - self.params.gamma;
                if best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(BestSplit {
                        gain,
                        feature,
                        threshold: 0.5 * (current + next),
                    });
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Vec<usize>) {
        let features = array![
            [0.1, 1.0],
            [0.2, -1.0],
            [0.3, 0.5],
            [0.4, -0.5],
            [2.1, 1.0],
            [2.2, -1.0],
            [2.3, 0.5],
            [2.4, -0.5],
        ];
        let targets = vec![0, 0, 0, 0, 1, 1, 1, 1];
        (features, targets)
    }

    fn log_loss(model: &GbdtModel, features: &Array2<f64>, targets: &[usize]) -> f64 {
        let mut loss = 0.0;
        for (i, &t) in targets.iter().enumerate() {
            let p = model.predict_probability(features.row(i)).clamp(1e-12, 1.0 - 1e-12);
            loss -= if t == 1 { p.ln() } else { (1.0 - p).ln() };
        }
        loss / targets.len() as f64
    }

    #[test]
    fn learns_a_separable_split() {
        let (features, targets) = separable();
        let params = GbdtParams {
            rounds: 20,
            ..GbdtParams::default()
        };
        let model = GbdtModel::train(&features, &targets, &params).unwrap();
        model.validate().unwrap();

        for (i, &t) in targets.iter().enumerate() {
            let p = model.predict_probability(features.row(i));
            if t == 1 {
                assert!(p > 0.5, "sample {} should score positive, got {}", i, p);
            } else {
                assert!(p < 0.5, "sample {} should score negative, got {}", i, p);
            }
        }
    }

    #[test]
    fn boosting_reduces_log_loss() {
        let (features, targets) = separable();
        let short = GbdtModel::train(
            &features,
            &targets,
            &GbdtParams {
                rounds: 1,
                ..GbdtParams::default()
            },
        )
        .unwrap();
        let long = GbdtModel::train(
            &features,
            &targets,
            &GbdtParams {
                rounds: 30,
                ..GbdtParams::default()
            },
        )
        .unwrap();
        assert!(log_loss(&long, &features, &targets) < log_loss(&short, &features, &targets));
    }

    #[test]
    fn training_is_deterministic() {
        let (features, targets) = separable();
        let params = GbdtParams::default();
        let a = GbdtModel::train(&features, &targets, &params).unwrap();
        let b = GbdtModel::train(&features, &targets, &params).unwrap();
        assert_eq!(a.trees, b.trees);
        assert_eq!(a.base_score, b.base_score);
    }

    #[test]
    fn bincode_round_trip_preserves_margins() {
        let (features, targets) = separable();
        let model = GbdtModel::train(&features, &targets, &GbdtParams::default()).unwrap();
        let bytes = bincode::serialize(&model).unwrap();
        let restored: GbdtModel = bincode::deserialize(&bytes).unwrap();
        for row in features.outer_iter() {
            assert_eq!(model.margin(row), restored.margin(row));
        }
    }

    #[test]
    fn probability_pair_is_well_formed() {
        let (features, targets) = separable();
        let model = GbdtModel::train(&features, &targets, &GbdtParams::default()).unwrap();
        let p = model.predict_probability(features.row(0));
        assert!(p > 0.0 && p < 1.0);
    }

    #[test]
    fn sigmoid_is_symmetric_and_bounded() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!((sigmoid(3.0) + sigmoid(-3.0) - 1.0).abs() < 1e-12);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(sigmoid(800.0) <= 1.0);
    }
}
