//! CART regression tree grown by variance reduction.
//!
//! Nodes live in a flat arena in pre-order. A sample goes left when
//! `features[node.feature] <= node.threshold`.

#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    sse: f64,
}

impl RegressionTree {
    /// Fit on every row of `x`.
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &TreeParams) -> Self {
        Self::fit_sample(x, y, (0..y.len()).collect(), params)
    }

    /// Fit on the rows named by `sample`; indices may repeat (bootstrap draws).
    pub fn fit_sample(x: &[Vec<f64>], y: &[f64], sample: Vec<usize>, params: &TreeParams) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        if sample.is_empty() {
            tree.nodes.push(TreeNode::Leaf { value: 0.0 });
        } else {
            tree.grow(x, y, sample, 0, params);
        }
        tree
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = row.get(*feature).copied().unwrap_or(f64::NAN);
                    // NaN goes left
                    idx = if v <= *threshold || v.is_nan() { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], idx: usize) -> usize {
            match &nodes[idx] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
            }
        }
        walk(&self.nodes, 0)
    }

    fn grow(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        sample: Vec<usize>,
        depth: usize,
        params: &TreeParams,
    ) -> usize {
        let node_idx = self.nodes.len();
        let (sum, sum_sq) = sample
            .iter()
            .fold((0.0, 0.0), |(s, sq), &i| (s + y[i], sq + y[i] * y[i]));
        let n = sample.len() as f64;
        let value = sum / n;
        let sse = (sum_sq - sum * sum / n).max(0.0);

        self.nodes.push(TreeNode::Leaf { value });

        let depth_reached = params.max_depth.is_some_and(|d| depth >= d);
        if depth_reached || sample.len() < params.min_samples_split || sse <= 1e-12 {
            return node_idx;
        }

        let best = match find_best_split(x, y, &sample, params.min_samples_leaf) {
            Some(best) if best.sse < sse => best,
            _ => return node_idx,
        };

        let (left_sample, right_sample): (Vec<usize>, Vec<usize>) = sample
            .into_iter()
            .partition(|&i| x[i][best.feature] <= best.threshold);

        let left = self.grow(x, y, left_sample, depth + 1, params);
        let right = self.grow(x, y, right_sample, depth + 1, params);
        self.nodes[node_idx] = TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        node_idx
    }
}

/// Lowest combined sum of squared errors over all features and cut points.
fn find_best_split(
    x: &[Vec<f64>],
    y: &[f64],
    sample: &[usize],
    min_samples_leaf: usize,
) -> Option<BestSplit> {
    let n = sample.len();
    let n_features = x.get(sample[0]).map_or(0, Vec::len);
    let min_leaf = min_samples_leaf.max(1);
    let total_sum: f64 = sample.iter().map(|&i| y[i]).sum();
    let total_sq: f64 = sample.iter().map(|&i| y[i] * y[i]).sum();

    let mut best: Option<BestSplit> = None;
    let mut order = sample.to_vec();

    for feature in 0..n_features {
        order.sort_by(|&a, &b| {
            x[a][feature]
                .partial_cmp(&x[b][feature])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for k in 0..n - 1 {
            let yi = y[order[k]];
            left_sum += yi;
            left_sq += yi * yi;

            let left_n = k + 1;
            let right_n = n - left_n;
            if left_n < min_leaf || right_n < min_leaf {
                continue;
            }

            let here = x[order[k]][feature];
            let next = x[order[k + 1]][feature];
            if here >= next {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / left_n as f64)
                + (right_sq - right_sum * right_sum / right_n as f64);

            if best.as_ref().map_or(true, |b| sse < b.sse) {
                let mut threshold = here + (next - here) / 2.0;
                if threshold >= next {
                    threshold = here;
                }
                best = Some(BestSplit {
                    feature,
                    threshold,
                    sse,
                });
            }
        }
    }

    best
}
