use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub mod arena;
pub mod classify;
pub mod node;

pub use arena::{FileHandle, FileNodes, FileRef, LoadedFiles};
pub use classify::{Classification, FeatureCollectionType, FeatureTypeClassifier, FileClassifier};
pub use node::{FileNode, FileNodeActiveState, FileNodeState};

/// Where a loaded file came from. Files created in memory have no path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl FileInfo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn display_name(&self) -> String {
        match &self.path {
            Some(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string()),
            None => "<unnamed>".to_string(),
        }
    }
}

/// A single feature as far as activation is concerned: its type and the
/// plate it is reconstructed with. Geometry is owned by other subsystems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub feature_type: String,
    #[serde(default)]
    pub reconstruction_plate_id: Option<u64>,
}

impl Feature {
    pub fn new(feature_type: impl Into<String>) -> Self {
        Self {
            feature_type: feature_type.into(),
            reconstruction_plate_id: None,
        }
    }

    pub fn with_plate_id(mut self, plate_id: u64) -> Self {
        self.reconstruction_plate_id = Some(plate_id);
        self
    }
}

/// A loaded feature collection file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    #[serde(default)]
    pub info: FileInfo,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl File {
    pub fn new(info: FileInfo, features: Vec<Feature>) -> Self {
        Self { info, features }
    }

    pub fn from_path(path: impl Into<PathBuf>, features: Vec<Feature>) -> Self {
        Self::new(FileInfo::new(path), features)
    }

    pub fn path(&self) -> Option<&Path> {
        self.info.path.as_deref()
    }

    pub fn display_name(&self) -> String {
        self.info.display_name()
    }
}
