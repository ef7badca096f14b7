//! CART decision tree used as the base learner of the forest and booster.

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TunerError};

/// Impurity threshold below which a node is treated as pure.
const PURE_EPSILON: f64 = 1e-12;

/// Decision tree node, stored flat in [`DecisionTree`]'s node list.
///
/// Children are indices into that list; the root is node 0 and every child
/// sits after its parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Class proportions (classification) or a single mean (regression).
    Leaf { value: Vec<f64>, n_samples: usize },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: u32,
        right: u32,
        n_samples: usize,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Criterion {
    /// Gini impurity (classification)
    Gini,
    /// Mean squared error (regression)
    Mse,
}

/// Training targets seen by the split search.
enum Targets<'a> {
    Classes { y: &'a [usize], n_classes: usize },
    Values(&'a [f64]),
}

impl Targets<'_> {
    fn n_outputs(&self) -> usize {
        match self {
            Targets::Classes { n_classes, .. } => *n_classes,
            Targets::Values(_) => 1,
        }
    }
}

/// Running sufficient statistics for one side of a split.
#[derive(Clone)]
struct NodeStats {
    count: usize,
    class_counts: Vec<usize>,
    sum: f64,
    sq_sum: f64,
}

impl NodeStats {
    fn empty(n_outputs: usize) -> Self {
        Self {
            count: 0,
            class_counts: vec![0; n_outputs],
            sum: 0.0,
            sq_sum: 0.0,
        }
    }

    fn collect(targets: &Targets, indices: &[usize]) -> Self {
        let mut stats = Self::empty(targets.n_outputs());
        for &i in indices {
            stats.add(targets, i);
        }
        stats
    }

    fn add(&mut self, targets: &Targets, i: usize) {
        self.count += 1;
        match targets {
            Targets::Classes { y, .. } => self.class_counts[y[i]] += 1,
            Targets::Values(y) => {
                self.sum += y[i];
                self.sq_sum += y[i] * y[i];
            }
        }
    }

    fn remove(&mut self, targets: &Targets, i: usize) {
        self.count -= 1;
        match targets {
            Targets::Classes { y, .. } => self.class_counts[y[i]] -= 1,
            Targets::Values(y) => {
                self.sum -= y[i];
                self.sq_sum -= y[i] * y[i];
            }
        }
    }

    fn impurity(&self, criterion: Criterion) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        match criterion {
            Criterion::Gini => {
                1.0 - self
                    .class_counts
                    .iter()
                    .map(|&c| (c as f64 / n).powi(2))
                    .sum::<f64>()
            }
            Criterion::Mse => (self.sq_sum / n - (self.sum / n).powi(2)).max(0.0),
        }
    }

    fn leaf_value(&self, criterion: Criterion) -> Vec<f64> {
        let n = self.count.max(1) as f64;
        match criterion {
            Criterion::Gini => self.class_counts.iter().map(|&c| c as f64 / n).collect(),
            Criterion::Mse => vec![self.sum / n],
        }
    }
}

/// Pending node in the depth-first build.
struct Frame {
    slot: usize,
    indices: Vec<usize>,
    depth: usize,
}

struct BestSplit {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features drawn at random for each split; `None` considers all of them.
    pub max_features: Option<usize>,
    pub criterion: Criterion,
    pub random_state: u64,
    n_features: usize,
    n_outputs: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

impl DecisionTree {
    pub fn new_classifier() -> Self {
        Self::with_criterion(Criterion::Gini)
    }

    pub fn new_regressor() -> Self {
        Self::with_criterion(Criterion::Mse)
    }

    fn with_criterion(criterion: Criterion) -> Self {
        Self {
            nodes: Vec::new(),
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion,
            random_state: 0,
            n_features: 0,
            n_outputs: 0,
            feature_importances: None,
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Fit a classification tree on class indices in `0..n_classes`.
    pub fn fit_classes(&mut self, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<()> {
        if let Some(&bad) = y.iter().find(|&&c| c >= n_classes) {
            return Err(TunerError::InvalidInput(format!(
                "class index {} out of range for {} classes",
                bad, n_classes
            )));
        }
        self.criterion = Criterion::Gini;
        self.fit_targets(x, &Targets::Classes { y, n_classes })
    }

    /// Fit a regression tree on continuous targets.
    pub fn fit_values(&mut self, x: &Array2<f64>, y: &[f64]) -> Result<()> {
        self.criterion = Criterion::Mse;
        self.fit_targets(x, &Targets::Values(y))
    }

    fn fit_targets(&mut self, x: &Array2<f64>, targets: &Targets) -> Result<()> {
        let n_samples = x.nrows();
        let n_targets = match targets {
            Targets::Classes { y, .. } => y.len(),
            Targets::Values(y) => y.len(),
        };
        if n_samples != n_targets {
            return Err(TunerError::Shape {
                expected: format!("{} targets", n_samples),
                actual: format!("{} targets", n_targets),
            });
        }
        if n_samples == 0 {
            return Err(TunerError::EmptyDataset("tree training data".to_string()));
        }

        self.n_features = x.ncols();
        self.n_outputs = targets.n_outputs();

        let mut importances = vec![0.0; self.n_features];
        let mut rng = StdRng::seed_from_u64(self.random_state);
        self.nodes = self.build(x, targets, n_samples, &mut rng, &mut importances);

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));
        Ok(())
    }

    /// Grow the tree depth-first with an explicit stack, left subtree first.
    fn build(
        &self,
        x: &Array2<f64>,
        targets: &Targets,
        n_samples: usize,
        rng: &mut StdRng,
        importances: &mut [f64],
    ) -> Vec<TreeNode> {
        let placeholder = || TreeNode::Leaf {
            value: Vec::new(),
            n_samples: 0,
        };
        let mut nodes = vec![placeholder()];
        let mut stack = vec![Frame {
            slot: 0,
            indices: (0..n_samples).collect(),
            depth: 0,
        }];

        while let Some(Frame {
            slot,
            indices,
            depth,
        }) = stack.pop()
        {
            let n_samples = indices.len();
            let stats = NodeStats::collect(targets, &indices);
            let impurity = stats.impurity(self.criterion);

            let should_stop = n_samples < self.min_samples_split
                || n_samples < 2 * self.min_samples_leaf
                || self.max_depth.is_some_and(|d| depth >= d)
                || impurity <= PURE_EPSILON;

            let best = if should_stop {
                None
            } else {
                self.find_best_split(x, targets, &indices, &stats, impurity, rng)
            };

            let Some(best) = best else {
                nodes[slot] = TreeNode::Leaf {
                    value: stats.leaf_value(self.criterion),
                    n_samples,
                };
                continue;
            };

            importances[best.feature_idx] += n_samples as f64 * best.gain;

            let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
                .into_iter()
                .partition(|&i| x[[i, best.feature_idx]] <= best.threshold);

            let left = nodes.len();
            nodes.push(placeholder());
            nodes.push(placeholder());
            nodes[slot] = TreeNode::Split {
                feature_idx: best.feature_idx,
                threshold: best.threshold,
                left: left as u32,
                right: (left + 1) as u32,
                n_samples,
            };

            stack.push(Frame {
                slot: left + 1,
                indices: right_idx,
                depth: depth + 1,
            });
            stack.push(Frame {
                slot: left,
                indices: left_idx,
                depth: depth + 1,
            });
        }

        nodes
    }

    /// Scan candidate features with a sorted sweep, tracking left/right statistics incrementally.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        targets: &Targets,
        indices: &[usize],
        parent: &NodeStats,
        parent_impurity: f64,
        rng: &mut StdRng,
    ) -> Option<BestSplit> {
        let n_features = x.ncols();
        let candidates: Vec<usize> = match self.max_features {
            Some(k) if k < n_features => sample(rng, n_features, k.max(1)).into_vec(),
            _ => (0..n_features).collect(),
        };

        let n = indices.len() as f64;
        let mut best: Option<BestSplit> = None;
        let mut order: Vec<usize> = indices.to_vec();

        for feature_idx in candidates {
            order.sort_by(|&a, &b| x[[a, feature_idx]].total_cmp(&x[[b, feature_idx]]));

            let mut left = NodeStats::empty(targets.n_outputs());
            let mut right = parent.clone();

            for pos in 0..order.len() - 1 {
                let i = order[pos];
                left.add(targets, i);
                right.remove(targets, i);

                let current = x[[i, feature_idx]];
                let next = x[[order[pos + 1], feature_idx]];
                if next <= current {
                    continue;
                }
                if left.count < self.min_samples_leaf || right.count < self.min_samples_leaf {
                    continue;
                }

                let weighted = (left.count as f64 * left.impurity(self.criterion)
                    + right.count as f64 * right.impurity(self.criterion))
                    / n;
                let gain = parent_impurity - weighted;

                if gain > PURE_EPSILON && best.as_ref().is_none_or(|b| gain > b.gain) {
                    best = Some(BestSplit {
                        feature_idx,
                        threshold: current + (next - current) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }

    /// Leaf value reached by one sample.
    pub fn predict_row(&self, row: ArrayView1<f64>) -> Result<&[f64]> {
        if self.nodes.is_empty() {
            return Err(TunerError::ModelNotFitted);
        }
        let mut idx = 0usize;
        loop {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value, .. }) => return Ok(value.as_slice()),
                Some(TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                }) => {
                    idx = if row[*feature_idx] <= *threshold {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
                None => {
                    return Err(TunerError::InvalidInput(format!(
                        "tree node {} out of range",
                        idx
                    )))
                }
            }
        }
    }

    /// Leaf values for every row, shaped `(n_samples, n_outputs)`.
    pub fn predict_values(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.nodes.is_empty() {
            return Err(TunerError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(TunerError::Shape {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut out = Array2::zeros((x.nrows(), self.n_outputs));
        for (i, row) in x.rows().into_iter().enumerate() {
            let value = self.predict_row(row)?;
            for (j, &v) in value.iter().enumerate() {
                out[[i, j]] = v;
            }
        }
        Ok(out)
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn depth(&self) -> usize {
        // children always follow their parent, so one forward pass suffices
        let mut depths = vec![0usize; self.nodes.len()];
        let mut max = 0;
        for (i, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split { left, right, .. } = node {
                let d = depths[i] + 1;
                for child in [*left as usize, *right as usize] {
                    if let Some(slot) = depths.get_mut(child) {
                        *slot = d;
                    }
                }
                max = max.max(d);
            }
        }
        max
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }
}
