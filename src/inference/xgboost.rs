//! Reader for XGBoost's JSON model format (`Booster.save_model("model.json")`).
//!
//! Only the `gbtree` booster with an identity-link regression objective is
//! supported. Each tree is stored column-wise: node `i` is a leaf when
//! `left_children[i] == -1`, in which case `split_conditions[i]` holds the
//! leaf value (already shrunk by the learning rate).

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};

use super::{Node, Tree, TreeEnsemble};

const IDENTITY_OBJECTIVES: [&str; 5] = [
    "reg:squarederror",
    "reg:linear",
    "reg:absoluteerror",
    "reg:pseudohubererror",
    "reg:quantileerror",
];

#[derive(Debug, Deserialize)]
pub struct XgbModel {
    pub learner: Learner,
    #[serde(default)]
    pub version: Vec<u32>,
}

#[derive(Debug, Deserialize)]
pub struct Learner {
    pub gradient_booster: GradientBooster,
    pub learner_model_param: LearnerModelParam,
    #[serde(default)]
    pub objective: Option<Objective>,
}

#[derive(Debug, Deserialize)]
pub struct GradientBooster {
    pub name: String,
    #[serde(default)]
    pub model: Option<GbTreeModel>,
}

#[derive(Debug, Deserialize)]
pub struct GbTreeModel {
    pub trees: Vec<XgbTree>,
}

#[derive(Debug, Deserialize)]
pub struct LearnerModelParam {
    /// Stored as text, e.g. `"5E-1"`, or `"[5E-1]"` in newer releases.
    pub base_score: String,
    #[serde(default, deserialize_with = "number_text")]
    pub num_feature: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct Objective {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct XgbTree {
    pub left_children: Vec<i64>,
    pub right_children: Vec<i64>,
    pub split_indices: Vec<i64>,
    pub split_conditions: Vec<f64>,
}

fn number_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
    let text = Option::<String>::deserialize(deserializer)?;
    text.map(|t| t.trim().parse().map_err(serde::de::Error::custom))
        .transpose()
}

/// True when the document looks like an XGBoost model rather than a native
/// artifact.
pub fn is_xgboost(value: &serde_json::Value) -> bool {
    value.get("learner").is_some()
}

impl XgbModel {
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).context("Failed to parse XGBoost model")
    }

    pub fn base_score(&self) -> Result<f64> {
        let raw = &self.learner.learner_model_param.base_score;
        let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
        let first = trimmed.split(',').next().unwrap_or_default().trim();
        first
            .parse()
            .with_context(|| format!("Invalid XGBoost base_score '{}'", raw))
    }

    /// Convert into the crate's tree ensemble.
    pub fn into_ensemble(self) -> Result<TreeEnsemble> {
        if let Some(objective) = &self.learner.objective {
            if !IDENTITY_OBJECTIVES.contains(&objective.name.as_str()) {
                anyhow::bail!("Unsupported XGBoost objective '{}'", objective.name);
            }
        }

        let booster = &self.learner.gradient_booster;
        if booster.name != "gbtree" {
            anyhow::bail!("Unsupported XGBoost booster '{}'", booster.name);
        }

        let base_score = self.base_score()?;
        let num_features = self.learner.learner_model_param.num_feature;
        let model = self
            .learner
            .gradient_booster
            .model
            .context("XGBoost model has no trees")?;

        let trees = model
            .trees
            .into_iter()
            .enumerate()
            .map(|(t, tree)| convert_tree(t, tree))
            .collect::<Result<Vec<_>>>()?;

        Ok(TreeEnsemble {
            base_score,
            num_features,
            trees,
        })
    }
}

fn convert_tree(t: usize, tree: XgbTree) -> Result<Tree> {
    let len = tree.left_children.len();
    if tree.right_children.len() != len
        || tree.split_indices.len() != len
        || tree.split_conditions.len() != len
    {
        anyhow::bail!("XGBoost tree {} has arrays of different lengths", t);
    }

    let index = |i: usize, child: i64| {
        usize::try_from(child)
            .with_context(|| format!("XGBoost tree {} node {} has child {}", t, i, child))
    };

    let mut nodes = Vec::with_capacity(len);
    for i in 0..len {
        if tree.left_children[i] == -1 {
            nodes.push(Node::Leaf {
                leaf: tree.split_conditions[i],
            });
        } else {
            nodes.push(Node::Split {
                feature: index(i, tree.split_indices[i])?,
                threshold: tree.split_conditions[i],
                left: index(i, tree.left_children[i])?,
                right: index(i, tree.right_children[i])?,
            });
        }
    }
    Ok(Tree { nodes })
}
