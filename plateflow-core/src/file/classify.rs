use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::file::File;

/// Feature types that make a file reconstruction (rotation) data rather than
/// something that gets reconstructed.
const RECONSTRUCTION_FEATURE_TYPES: &[&str] = &[
    "gpml:TotalReconstructionSequence",
    "gpml:AbsoluteReferenceFrame",
];

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeatureCollectionType {
    /// Contains features that can be reconstructed to a past geological time.
    Reconstructable,
    /// Contains rotation data used to reconstruct other features.
    Reconstruction,
}

/// The set of roles a file's content can play. Produced by a
/// [`FileClassifier`] and handed unchanged to workflows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Classification(BTreeSet<FeatureCollectionType>);

impl Classification {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: FeatureCollectionType) {
        self.0.insert(kind);
    }

    pub fn with(mut self, kind: FeatureCollectionType) -> Self {
        self.insert(kind);
        self
    }

    pub fn contains(&self, kind: FeatureCollectionType) -> bool {
        self.0.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = FeatureCollectionType> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<FeatureCollectionType> for Classification {
    fn from_iter<I: IntoIterator<Item = FeatureCollectionType>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<String> = self.iter().map(|kind| kind.to_string()).collect();
        write!(f, "[{}]", kinds.join(", "))
    }
}

/// Labels a loaded file. The result is opaque to the activation core.
pub trait FileClassifier: Send + Sync {
    fn classify(&self, file: &File) -> Classification;
}

/// Classifies by feature type: rotation features mark reconstruction data,
/// everything else is reconstructable.
#[derive(Debug, Clone, Default)]
pub struct FeatureTypeClassifier;

impl FileClassifier for FeatureTypeClassifier {
    fn classify(&self, file: &File) -> Classification {
        let mut classification = Classification::empty();
        for feature in &file.features {
            if RECONSTRUCTION_FEATURE_TYPES.contains(&feature.feature_type.as_str()) {
                classification.insert(FeatureCollectionType::Reconstruction);
            } else {
                classification.insert(FeatureCollectionType::Reconstructable);
            }
        }
        classification
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::Feature;

    #[test]
    fn test_empty_file_has_no_classification() {
        let file = File::from_path("empty.gpml", vec![]);
        assert!(FeatureTypeClassifier.classify(&file).is_empty());
    }

    #[test]
    fn test_rotation_file_is_reconstruction() {
        let file = File::from_path(
            "rotations.rot",
            vec![Feature::new("gpml:TotalReconstructionSequence")],
        );
        let classification = FeatureTypeClassifier.classify(&file);
        assert!(classification.contains(FeatureCollectionType::Reconstruction));
        assert!(!classification.contains(FeatureCollectionType::Reconstructable));
    }

    #[test]
    fn test_mixed_file_has_both() {
        let file = File::from_path(
            "mixed.gpml",
            vec![
                Feature::new("gpml:Coastline").with_plate_id(801),
                Feature::new("gpml:AbsoluteReferenceFrame"),
            ],
        );
        let classification = FeatureTypeClassifier.classify(&file);
        assert!(classification.contains(FeatureCollectionType::Reconstruction));
        assert!(classification.contains(FeatureCollectionType::Reconstructable));
        assert_eq!(classification.to_string(), "[reconstructable, reconstruction]");
    }

    #[test]
    fn test_feature_collection_type_parses_from_snake_case() {
        let kind: FeatureCollectionType = "reconstruction".parse().unwrap();
        assert_eq!(kind, FeatureCollectionType::Reconstruction);
    }
}
