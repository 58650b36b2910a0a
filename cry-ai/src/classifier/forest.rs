//! Random forest loaded from a JSON artifact
//!
//! ```json
//! {
//!   "n_features": 60,
//!   "n_classes": 5,
//!   "trees": [
//!     { "nodes": [
//!         { "feature": 59, "threshold": 0.08, "left": 1, "right": 2 },
//!         { "value": [4.0, 1.0, 0.0, 0.0, 0.0] },
//!         { "value": [0.0, 0.0, 1.0, 3.0, 0.0] }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Node 0 is the root. Split nodes send `x[feature] <= threshold` left.

use super::{CryLabel, CryModel, ModelError};
use crate::features::FEATURE_LEN;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Node {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Normalised class distribution at the leaf reached by `x`
    fn leaf_distribution(&self, x: &[f32]) -> Vec<f64> {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if x[*feature] <= *threshold { *left } else { *right };
                }
                Node::Leaf { value } => {
                    let total: f64 = value.iter().sum();
                    if total > 0.0 {
                        return value.iter().map(|v| v / total).collect();
                    }
                    let uniform = 1.0 / value.len() as f64;
                    return vec![uniform; value.len()];
                }
            }
        }
    }
}

/// Averaged-vote decision forest
#[derive(Debug, Clone, Deserialize)]
pub struct ForestModel {
    n_features: usize,
    n_classes: usize,
    trees: Vec<Tree>,
}

impl ForestModel {
    /// Load and validate an artifact from disk
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let json = std::fs::read_to_string(path)?;
        let model = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            trees = model.trees.len(),
            n_features = model.n_features,
            "Loaded classifier model"
        );
        Ok(model)
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let model: ForestModel = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.n_features != FEATURE_LEN {
            return Err(ModelError::Invalid(format!(
                "model expects {} features, extractor produces {}",
                self.n_features, FEATURE_LEN
            )));
        }
        if self.n_classes != CryLabel::ALL.len() {
            return Err(ModelError::Invalid(format!(
                "model has {} classes, expected {}",
                self.n_classes,
                CryLabel::ALL.len()
            )));
        }
        if self.trees.is_empty() {
            return Err(ModelError::Invalid("model has no trees".to_string()));
        }

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(ModelError::Invalid(format!("tree {t} has no nodes")));
            }

            for (i, node) in tree.nodes.iter().enumerate() {
                match node {
                    Node::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        if *feature >= self.n_features {
                            return Err(ModelError::Invalid(format!(
                                "tree {t} node {i}: feature {feature} out of range"
                            )));
                        }
                        if !threshold.is_finite() {
                            return Err(ModelError::Invalid(format!(
                                "tree {t} node {i}: non-finite threshold"
                            )));
                        }
                        // Children after the parent rules out cycles
                        for child in [*left, *right] {
                            if child <= i || child >= tree.nodes.len() {
                                return Err(ModelError::Invalid(format!(
                                    "tree {t} node {i}: child {child} out of order or range"
                                )));
                            }
                        }
                    }
                    Node::Leaf { value } => {
                        if value.len() != self.n_classes {
                            return Err(ModelError::Invalid(format!(
                                "tree {t} node {i}: leaf has {} values, expected {}",
                                value.len(),
                                self.n_classes
                            )));
                        }
                        if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
                            return Err(ModelError::Invalid(format!(
                                "tree {t} node {i}: leaf weights must be finite and non-negative"
                            )));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn check_width(&self, features: &[f32]) -> Result<(), ModelError> {
        if features.len() != self.n_features {
            return Err(ModelError::FeatureCount {
                expected: self.n_features,
                actual: features.len(),
            });
        }
        Ok(())
    }
}

impl CryModel for ForestModel {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict(&self, features: &[f32]) -> Result<usize, ModelError> {
        let proba = self.predict_proba(features)?;
        let mut best = 0;
        for (i, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = i;
            }
        }
        Ok(best)
    }

    fn predict_proba(&self, features: &[f32]) -> Result<Vec<f64>, ModelError> {
        self.check_width(features)?;

        let mut totals = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in totals.iter_mut().zip(tree.leaf_distribution(features)) {
                *acc += p;
            }
        }

        let n_trees = self.trees.len() as f64;
        Ok(totals.into_iter().map(|t| t / n_trees).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{ClassificationSource, ClassifierAdapter};
    use crate::features::FeatureVector;
    use std::sync::Arc;

    /// Stump on feature 0 plus stump on feature 59
    const TWO_STUMPS: &str = r#"{
        "n_features": 60,
        "n_classes": 5,
        "trees": [
            { "nodes": [
                { "feature": 0, "threshold": 0.5, "left": 1, "right": 2 },
                { "value": [0, 0, 0, 0, 0] },
                { "value": [10, 0, 0, 0, 0] }
            ] },
            { "nodes": [
                { "feature": 59, "threshold": 0.5, "left": 1, "right": 2 },
                { "value": [0, 0, 0, 0, 0] },
                { "value": [0, 0, 0, 0, 6] }
            ] }
        ]
    }"#;

    fn with_values(pairs: &[(usize, f32)]) -> [f32; 60] {
        let mut x = [0.0; 60];
        for &(i, v) in pairs {
            x[i] = v;
        }
        x
    }

    #[test]
    fn test_predict_proba_averages_trees() {
        let model = ForestModel::from_json(TWO_STUMPS).unwrap();
        assert_eq!(model.n_trees(), 2);

        // Both stumps go right: hunger from tree 0, burping from tree 1
        let proba = model.predict_proba(&with_values(&[(0, 1.0), (59, 1.0)])).unwrap();
        assert_eq!(proba, vec![0.5, 0.0, 0.0, 0.0, 0.5]);
        // Tie goes to the lower index
        assert_eq!(model.predict(&with_values(&[(0, 1.0), (59, 1.0)])).unwrap(), 0);
    }

    #[test]
    fn test_empty_leaf_is_uniform() {
        let model = ForestModel::from_json(TWO_STUMPS).unwrap();
        let proba = model.predict_proba(&with_values(&[(0, 1.0)])).unwrap();
        // Tree 0: hunger; tree 1: uniform 0.2
        assert!((proba[0] - 0.6).abs() < 1e-12);
        assert!((proba[4] - 0.1).abs() < 1e-12);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_segment_position_matters() {
        let adapter = ClassifierAdapter::new(Arc::new(ForestModel::from_json(TWO_STUMPS).unwrap()));

        // Same value, first vs last slot
        let first = adapter.classify(&FeatureVector::from(with_values(&[(0, 1.0)])));
        let last = adapter.classify(&FeatureVector::from(with_values(&[(59, 1.0)])));

        assert_eq!(first.source, ClassificationSource::Model);
        assert_eq!(first.label, CryLabel::Hunger);
        assert_eq!(last.label, CryLabel::Burping);
    }

    #[test]
    fn test_wrong_width_rejected() {
        let model = ForestModel::from_json(TWO_STUMPS).unwrap();
        assert!(matches!(
            model.predict(&[1.0; 59]),
            Err(ModelError::FeatureCount {
                expected: 60,
                actual: 59
            })
        ));
    }

    #[test]
    fn test_rejects_malformed_artifacts() {
        let cases = [
            // Not JSON
            "not json",
            // No trees
            r#"{"n_features": 60, "n_classes": 5, "trees": []}"#,
            // Input width differs from the feature vector
            r#"{"n_features": 59, "n_classes": 5, "trees": [{"nodes": [{"value": [1, 0, 0, 0, 0]}]}]}"#,
            // Wrong class count
            r#"{"n_features": 60, "n_classes": 3, "trees": [{"nodes": [{"value": [1, 1, 1]}]}]}"#,
            // Leaf width mismatch
            r#"{"n_features": 60, "n_classes": 5, "trees": [{"nodes": [{"value": [1, 1]}]}]}"#,
            // Feature out of range
            r#"{"n_features": 60, "n_classes": 5, "trees": [{"nodes": [
                {"feature": 60, "threshold": 0.0, "left": 1, "right": 2},
                {"value": [1, 0, 0, 0, 0]}, {"value": [0, 1, 0, 0, 0]}]}]}"#,
            // Child points backwards
            r#"{"n_features": 60, "n_classes": 5, "trees": [{"nodes": [
                {"feature": 0, "threshold": 0.0, "left": 0, "right": 1},
                {"value": [1, 0, 0, 0, 0]}]}]}"#,
            // Child out of range
            r#"{"n_features": 60, "n_classes": 5, "trees": [{"nodes": [
                {"feature": 0, "threshold": 0.0, "left": 1, "right": 5},
                {"value": [1, 0, 0, 0, 0]}]}]}"#,
            // Negative weight
            r#"{"n_features": 60, "n_classes": 5, "trees": [{"nodes": [{"value": [1, -1, 0, 0, 0]}]}]}"#,
        ];

        for json in cases {
            assert!(ForestModel::from_json(json).is_err(), "accepted: {json}");
        }
    }

    #[test]
    fn test_width_mismatch_rejected_at_load() {
        let json = TWO_STUMPS.replacen("\"n_features\": 60", "\"n_features\": 61", 1);
        match ForestModel::from_json(&json) {
            Err(ModelError::Invalid(msg)) => assert!(msg.contains("61 features")),
            other => panic!("expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_file() {
        let err = ForestModel::load(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err, ModelError::Io(_)));
    }

    #[test]
    fn test_bundled_model_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("models/cry_classifier.json");
        let model = ForestModel::load(&path).unwrap();
        assert_eq!(model.n_features(), 60);
        assert_eq!(model.n_classes(), 5);
    }
}
