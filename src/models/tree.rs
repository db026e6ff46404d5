//! CART regression tree shared by the two ensemble variants.
//!
//! Splits greedily maximize variance reduction. Every node keeps the mean
//! target of the samples it saw at fit time, which makes two things cheap
//! later on: path-based attribution (each split's contribution is the change
//! in node mean along the decision path, so contributions sum exactly to the
//! leaf value minus the root mean) and split-gain feature importances.
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        /// Sum-of-squares reduction achieved by this split, weighted by the
        /// samples that reached it.
        gain: f64,
        /// Mean target of the samples at this node.
        value: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    root: Node,
    n_features: usize,
}

impl RegressionTree {
    /// Grow a tree on the rows named by `indices` (duplicates allowed, so a
    /// bootstrap sample is just a multiset of indices).
    pub fn fit(
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        indices: &[usize],
        params: &TreeParams,
    ) -> RegressionTree {
        assert!(!indices.is_empty(), "cannot grow a tree on zero samples");
        let root = grow(x, y, indices, 0, params);
        RegressionTree {
            root,
            n_features: x.ncols(),
        }
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { value, .. } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if row[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    /// Mean target at the root, i.e. this tree's baseline prediction.
    pub fn root_value(&self) -> f64 {
        match &self.root {
            Node::Leaf { value, .. } => *value,
            Node::Split { value, .. } => *value,
        }
    }

    /// Walk the decision path for `row`, adding each split's change in node
    /// mean to `contributions[feature]`. Returns the root mean, so that
    /// `root mean + contributions added == predict_row(row)` exactly.
    pub fn decompose(&self, row: ArrayView1<f64>, contributions: &mut [f64]) -> f64 {
        assert_eq!(contributions.len(), self.n_features);
        let baseline = self.root_value();
        let mut node = &self.root;
        let mut current = baseline;
        loop {
            match node {
                Node::Leaf { .. } => return baseline,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    let child: &Node = if row[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                    let child_value = match child {
                        Node::Leaf { value, .. } => *value,
                        Node::Split { value, .. } => *value,
                    };
                    contributions[*feature] += child_value - current;
                    current = child_value;
                    node = child;
                }
            }
        }
    }

    /// Accumulate each split's gain into `gains[feature]`.
    pub fn accumulate_gain(&self, gains: &mut [f64]) {
        assert_eq!(gains.len(), self.n_features);
        accumulate(&self.root, gains);
    }
}

fn accumulate(node: &Node, gains: &mut [f64]) {
    if let Node::Split {
        feature,
        gain,
        left,
        right,
        ..
    } = node
    {
        gains[*feature] += *gain;
        accumulate(left, gains);
        accumulate(right, gains);
    }
}

fn grow(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    indices: &[usize],
    depth: usize,
    params: &TreeParams,
) -> Node {
    let n = indices.len();
    let sum: f64 = indices.iter().map(|&i| y[i]).sum();
    let mean = sum / n as f64;

    if depth >= params.max_depth || n < params.min_samples_split {
        return Node::Leaf {
            value: mean,
            n_samples: n,
        };
    }

    let Some(split) = best_split(x, y, indices) else {
        return Node::Leaf {
            value: mean,
            n_samples: n,
        };
    };

    let (mut left_idx, mut right_idx) = (Vec::new(), Vec::new());
    for &i in indices {
        if x[(i, split.feature)] <= split.threshold {
            left_idx.push(i);
        } else {
            right_idx.push(i);
        }
    }

    let left = grow(x, y, &left_idx, depth + 1, params);
    let right = grow(x, y, &right_idx, depth + 1, params);

    Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        gain: split.gain,
        value: mean,
        left: Box::new(left),
        right: Box::new(right),
    }
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Exhaustive best-split search: per feature, sort the node's samples and
/// scan prefix sums for the largest sum-of-squares reduction.
fn best_split(x: ArrayView2<f64>, y: ArrayView1<f64>, indices: &[usize]) -> Option<Split> {
    let n = indices.len();
    let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
    let parent_score = total_sum * total_sum / n as f64;

    let mut best: Option<Split> = None;

    for feature in 0..x.ncols() {
        let mut samples: Vec<(f64, f64)> = indices.iter().map(|&i| (x[(i, feature)], y[i])).collect();
        samples.sort_by(|a, b| a.0.partial_cmp(&b.0).expect("non-finite feature value"));

        let mut left_sum = 0.0;
        for k in 1..n {
            left_sum += samples[k - 1].1;
            // Only split between distinct values.
            if samples[k].0 <= samples[k - 1].0 {
                continue;
            }
            let n_left = k as f64;
            let n_right = (n - k) as f64;
            let right_sum = total_sum - left_sum;
            let gain =
                left_sum * left_sum / n_left + right_sum * right_sum / n_right - parent_score;
            if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                best = Some(Split {
                    feature,
                    threshold: 0.5 * (samples[k - 1].0 + samples[k].0),
                    gain,
                });
            }
        }
    }

    best
}
