//! Prediction methods for the Random Forest ensemble.

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::error::RfError;
use crate::forest::RandomForest;
use crate::tree::argmax;

/// Class probability distribution from a prediction.
#[derive(Debug, Clone)]
pub struct ClassDistribution {
    probs: Vec<f64>,
}

impl ClassDistribution {
    /// Return the predicted class (argmax of probabilities, lowest index on ties).
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        argmax(&self.probs)
    }

    /// Return the probability distribution as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }
}

impl RandomForest {
    /// Predict the class index for a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict(&self, sample: &[f64]) -> Result<usize, RfError> {
        Ok(self.predict_proba(sample)?.predicted_class())
    }

    /// Average the leaf distributions of all trees for a single sample.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] when `sample.len() != n_features`.
    pub fn predict_proba(&self, sample: &[f64]) -> Result<ClassDistribution, RfError> {
        if sample.len() != self.n_features {
            return Err(RfError::PredictionFeatureMismatch {
                expected: self.n_features,
                got: sample.len(),
            });
        }

        let mut avg = vec![0.0f64; self.n_classes()];
        for tree in &self.trees {
            for (acc, p) in avg.iter_mut().zip(tree.predict_proba(sample)?) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        avg.iter_mut().for_each(|v| *v /= n);

        Ok(ClassDistribution { probs: avg })
    }

    /// Predict class indices for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_batch(&self, features: &[Vec<f64>]) -> Result<Vec<usize>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }

    /// Return probability distributions for a batch of samples in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::PredictionFeatureMismatch`] if any sample has the wrong feature count.
    pub fn predict_proba_batch(
        &self,
        features: &[Vec<f64>],
    ) -> Result<Vec<ClassDistribution>, RfError> {
        features
            .into_par_iter()
            .map(|sample| self.predict_proba(sample))
            .collect()
    }

    /// Return the number of features this forest was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.class_names.len()
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the feature names, in training column order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the class names; class index `i` is `class_names()[i]`.
    #[must_use]
    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }
}

#[cfg(test)]
mod tests {
    use crate::config::RandomForestConfig;

    #[test]
    fn batch_matches_individual_and_sums_to_one() {
        let features: Vec<Vec<f64>> = (0..30).map(|i| vec![f64::from(i), f64::from(i % 3)]).collect();
        let labels: Vec<usize> = (0..30).map(|i| usize::from(i >= 15)).collect();
        let names = vec!["a".to_string(), "b".to_string()];
        let classes = vec!["0".to_string(), "1".to_string()];
        let forest = RandomForestConfig::new(8)
            .unwrap()
            .fit(&features, &labels, &names, &classes)
            .unwrap()
            .into_forest();

        let batch = forest.predict_proba_batch(&features).unwrap();
        for (sample, dist) in features.iter().zip(&batch) {
            let single = forest.predict_proba(sample).unwrap();
            assert_eq!(dist.as_slice(), single.as_slice());
            let sum: f64 = dist.as_slice().iter().sum();
            assert!((sum - 1.0).abs() < 1e-10);
        }
        assert_eq!(forest.n_classes(), 2);
        assert_eq!(forest.class_names()[1], "1");
    }

    #[test]
    fn wrong_width_rejected() {
        let forest = RandomForestConfig::new(2)
            .unwrap()
            .fit(
                &[vec![0.0], vec![1.0]],
                &[0, 1],
                &["x".to_string()],
                &["no".to_string(), "yes".to_string()],
            )
            .unwrap()
            .into_forest();
        assert!(forest.predict(&[0.0, 1.0]).is_err());
    }
}
