use serde::{Deserialize, Serialize};

use super::{Features, ModelError};

/// Gradient-boosted regression trees.
///
/// The prediction is `base_score` plus the sum of the leaf reached in each
/// tree. Nodes are stored flat; a split sends `x < threshold` left.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsemble {
    #[serde(default)]
    pub base_score: f64,
    /// Feature count the ensemble was trained on, when recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_features: Option<usize>,
    pub trees: Vec<Tree>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        leaf: f64,
    },
}

impl TreeEnsemble {
    /// Check node references against the expected feature width.
    ///
    /// Every node reachable from the root must be reached exactly once, which
    /// rules out cycles and shared subtrees. Nodes may appear in any order.
    pub fn check(&self, width: usize) -> Result<(), String> {
        if let Some(n) = self.num_features {
            if n != width {
                return Err(format!(
                    "tree ensemble was trained on {} features but receives {}",
                    n, width
                ));
            }
        }
        if self.trees.is_empty() {
            return Err("tree ensemble has no trees".to_string());
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(format!("tree {} has no nodes", t));
            }
            let mut seen = vec![false; tree.nodes.len()];
            let mut pending = vec![0];
            while let Some(i) = pending.pop() {
                if seen[i] {
                    return Err(format!("tree {} reaches node {} twice", t, i));
                }
                seen[i] = true;

                if let Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } = tree.nodes[i]
                {
                    if feature >= width {
                        return Err(format!(
                            "tree {} node {} splits on feature {} but only {} features exist",
                            t, i, feature, width
                        ));
                    }
                    for child in [left, right] {
                        if child >= tree.nodes.len() {
                            return Err(format!(
                                "tree {} node {} points to invalid child {}",
                                t, i, child
                            ));
                        }
                        pending.push(child);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn predict(&self, features: &Features) -> Result<f64, ModelError> {
        let values = features.as_slice();
        let mut sum = self.base_score;

        for (t, tree) in self.trees.iter().enumerate() {
            let mut idx = 0;
            loop {
                match tree.nodes.get(idx) {
                    Some(Node::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    }) => {
                        let value = values.get(*feature).ok_or(ModelError::FeatureCount {
                            expected: feature + 1,
                            actual: values.len(),
                        })?;
                        idx = if *value < *threshold { *left } else { *right };
                    }
                    Some(Node::Leaf { leaf }) => {
                        sum += leaf;
                        break;
                    }
                    None => return Err(ModelError::MalformedTree { tree: t, node: idx }),
                }
            }
        }

        Ok(sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64, low: f64, high: f64) -> Tree {
        Tree {
            nodes: vec![
                Node::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                Node::Leaf { leaf: low },
                Node::Leaf { leaf: high },
            ],
        }
    }

    #[test]
    fn sums_leaves_across_trees() {
        let ensemble = TreeEnsemble {
            num_features: None,
            base_score: 0.5,
            trees: vec![stump(0, 1.0, 1.0, 2.0), stump(1, 10.0, 10.0, 20.0)],
        };
        let features = Features::new(vec![1.5, 3.0]);
        assert_eq!(ensemble.predict(&features).unwrap(), 0.5 + 2.0 + 10.0);
    }

    #[test]
    fn threshold_value_goes_right() {
        let ensemble = TreeEnsemble {
            num_features: None,
            base_score: 0.0,
            trees: vec![stump(0, 1.0, -1.0, 1.0)],
        };
        assert_eq!(ensemble.predict(&Features::new(vec![1.0])).unwrap(), 1.0);
    }

    #[test]
    fn parses_flat_node_json() {
        let ensemble: TreeEnsemble = serde_json::from_str(
            r#"{ "trees": [ { "nodes": [
                { "feature": 0, "threshold": 2, "left": 1, "right": 2 },
                { "leaf": 3.5 },
                { "leaf": 7 }
            ] } ] }"#,
        )
        .unwrap();
        assert!(ensemble.check(1).is_ok());
        assert_eq!(ensemble.predict(&Features::new(vec![0.0])).unwrap(), 3.5);
    }

    #[test]
    fn check_rejects_cycles() {
        let ensemble = TreeEnsemble {
            num_features: None,
            base_score: 0.0,
            trees: vec![Tree {
                nodes: vec![
                    Node::Split {
                        feature: 0,
                        threshold: 0.0,
                        left: 0,
                        right: 1,
                    },
                    Node::Leaf { leaf: 1.0 },
                ],
            }],
        };
        assert!(ensemble.check(1).is_err());
    }

    #[test]
    fn check_accepts_children_stored_before_parent() {
        let ensemble = TreeEnsemble {
            num_features: None,
            base_score: 0.0,
            trees: vec![Tree {
                nodes: vec![
                    Node::Split {
                        feature: 0,
                        threshold: 0.0,
                        left: 2,
                        right: 3,
                    },
                    Node::Leaf { leaf: 1.0 },
                    Node::Split {
                        feature: 0,
                        threshold: -1.0,
                        left: 4,
                        right: 1,
                    },
                    Node::Leaf { leaf: 3.0 },
                    Node::Leaf { leaf: 2.0 },
                ],
            }],
        };
        assert!(ensemble.check(1).is_ok());
        assert_eq!(ensemble.predict(&Features::new(vec![-0.5])).unwrap(), 1.0);
    }

    #[test]
    fn check_rejects_recorded_width_mismatch() {
        let ensemble = TreeEnsemble {
            num_features: Some(3),
            base_score: 0.0,
            trees: vec![stump(0, 0.0, 0.0, 0.0)],
        };
        assert!(ensemble.check(3).is_ok());
        assert!(ensemble.check(7).is_err());
    }

    #[test]
    fn check_rejects_out_of_range_feature() {
        let ensemble = TreeEnsemble {
            num_features: None,
            base_score: 0.0,
            trees: vec![stump(4, 0.0, 0.0, 0.0)],
        };
        assert!(ensemble.check(4).is_err());
        assert!(ensemble.check(5).is_ok());
    }
}
