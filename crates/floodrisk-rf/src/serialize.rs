//! Model serialization and deserialization via bincode.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::error::RfError;
use crate::forest::RandomForest;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// Versioned envelope around the serialized forest.
///
/// Feature and class names live only in `forest`; the counts are kept
/// beside it for logging on load.
#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope {
    format_version: u32,
    n_trees: usize,
    n_features: usize,
    n_classes: usize,
    forest: RandomForest,
}

impl RandomForest {
    /// Save the model to a binary file, replacing any existing file.
    ///
    /// The parent directory must already exist.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::SerializeModel`] | bincode encoding failed |
    /// | [`RfError::WriteModel`] | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RfError> {
        let path = path.as_ref();

        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            n_trees: self.trees.len(),
            n_features: self.n_features,
            n_classes: self.n_classes(),
            forest: self.clone(),
        };

        let bytes = bincode::serialize(&envelope)
            .map_err(|e| RfError::SerializeModel { source: e })?;

        std::fs::write(path, &bytes).map_err(|e| RfError::WriteModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(
            size_bytes = bytes.len(),
            n_trees = self.trees.len(),
            "model saved"
        );

        Ok(())
    }

    /// Load a model from a binary file written by [`RandomForest::save`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::ReadModel`] | file read failed |
    /// | [`RfError::DeserializeModel`] | bincode decoding failed |
    /// | [`RfError::IncompatibleModelVersion`] | format version mismatch |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RfError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| RfError::ReadModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        let envelope: ModelEnvelope =
            bincode::deserialize(&bytes).map_err(|e| RfError::DeserializeModel {
                path: path.to_path_buf(),
                source: e,
            })?;

        if envelope.format_version != FORMAT_VERSION {
            return Err(RfError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: envelope.format_version,
                path: path.to_path_buf(),
            });
        }

        debug!(
            n_trees = envelope.n_trees,
            n_features = envelope.n_features,
            n_classes = envelope.n_classes,
            "model loaded"
        );

        Ok(envelope.forest)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::config::RandomForestConfig;
    use crate::forest::RandomForest;
    use crate::weights::ClassWeight;

    fn train_simple_model() -> RandomForest {
        let features = vec![
            vec![1.0, 0.0],
            vec![2.0, 0.0],
            vec![3.0, 0.0],
            vec![10.0, 0.0],
            vec![11.0, 0.0],
            vec![12.0, 0.0],
        ];
        let labels = vec![0, 0, 0, 1, 1, 1];
        let names = vec!["elevation".to_string(), "distance_to_river".to_string()];
        let classes = vec!["0".to_string(), "1".to_string()];
        RandomForestConfig::new(5)
            .unwrap()
            .with_class_weight(ClassWeight::Balanced)
            .fit(&features, &labels, &names, &classes)
            .unwrap()
            .into_forest()
    }

    #[test]
    fn saved_model_predicts_identically() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("model.bin");

        let forest = train_simple_model();
        forest.save(&model_path).unwrap();
        let loaded = RandomForest::load(&model_path).unwrap();

        assert_eq!(loaded.class_names(), forest.class_names());
        assert_eq!(loaded.feature_names(), forest.feature_names());
        for sample in [[1.5, 0.0], [11.0, 0.0], [5.0, 0.0]] {
            assert_eq!(forest.predict(&sample).unwrap(), loaded.predict(&sample).unwrap());
            assert_eq!(
                forest.predict_proba(&sample).unwrap().as_slice(),
                loaded.predict_proba(&sample).unwrap().as_slice()
            );
        }
    }

    #[test]
    fn names_stored_once() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("model.bin");
        train_simple_model().save(&model_path).unwrap();

        let bytes = std::fs::read(&model_path).unwrap();
        let needle = b"distance_to_river";
        let hits = bytes.windows(needle.len()).filter(|w| *w == needle.as_slice()).count();
        assert_eq!(hits, 1);
    }

    #[test]
    fn save_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("model.bin");
        std::fs::write(&model_path, vec![0u8; 1 << 20]).unwrap();

        train_simple_model().save(&model_path).unwrap();

        assert!(std::fs::metadata(&model_path).unwrap().len() < 1 << 20);
        assert!(RandomForest::load(&model_path).is_ok());
    }

    #[test]
    fn load_missing_file_error() {
        let dir = TempDir::new().unwrap();
        let err = RandomForest::load(dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, crate::RfError::ReadModel { .. }));
    }

    #[test]
    fn load_corrupt_file_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.bin");
        std::fs::write(&path, b"not a model").unwrap();
        let err = RandomForest::load(&path).unwrap_err();
        assert!(matches!(err, crate::RfError::DeserializeModel { .. }));
    }
}
