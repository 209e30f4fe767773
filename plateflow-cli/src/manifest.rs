use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use plateflow_core::file::{Feature, File};
use serde::{Deserialize, Serialize};

/// A recorded session: the files it knows about and what was done to them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub files: Vec<ManifestFile>,

    /// When empty, every file is loaded in the order listed.
    #[serde(default)]
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub name: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl ManifestFile {
    pub fn to_file(&self) -> File {
        File::from_path(&self.name, self.features.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Load { file: String },
    Unload { file: String },
    Activate { file: String, workflow: String },
    Deactivate { file: String, workflow: String },
    /// Reloads `file` with the content of another manifest entry.
    Replace { file: String, with: String },
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;

        let manifest = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON manifest {}", path.display()))?,
            Some("toml") | None => toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML manifest {}", path.display()))?,
            Some(other) => bail!("Unsupported manifest format '.{other}', expected .toml or .json"),
        };
        Ok(manifest)
    }

    pub fn file(&self, name: &str) -> Result<&ManifestFile> {
        self.files
            .iter()
            .find(|file| file.name == name)
            .with_context(|| format!("Manifest does not list a file named '{name}'"))
    }

    /// The operations to replay, with the implicit "load everything" filled in.
    pub fn operations(&self) -> Vec<Operation> {
        if !self.operations.is_empty() {
            return self.operations.clone();
        }
        self.files
            .iter()
            .map(|file| Operation::Load {
                file: file.name.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TOML_MANIFEST: &str = r#"
[[files]]
name = "global.rot"
features = [{ feature_type = "gpml:TotalReconstructionSequence" }]

[[files]]
name = "coastlines.gpml"
features = [{ feature_type = "gpml:Coastline", reconstruction_plate_id = 801 }]

[[operations]]
op = "load"
file = "global.rot"

[[operations]]
op = "deactivate"
file = "global.rot"
workflow = "reconstruction"
"#;

    #[test]
    fn test_load_toml_manifest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.toml");
        fs::write(&path, TOML_MANIFEST).unwrap();

        let manifest = Manifest::load(&path).unwrap();

        assert_eq!(manifest.files.len(), 2);
        assert_eq!(
            manifest.file("coastlines.gpml").unwrap().features[0].reconstruction_plate_id,
            Some(801)
        );
        assert_eq!(
            manifest.operations(),
            vec![
                Operation::Load {
                    file: "global.rot".to_string()
                },
                Operation::Deactivate {
                    file: "global.rot".to_string(),
                    workflow: "reconstruction".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_load_json_manifest_defaults_to_loading_everything() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(
            &path,
            r#"{"files": [{"name": "a.gpml"}, {"name": "b.gpml", "features": []}]}"#,
        )
        .unwrap();

        let manifest = Manifest::load(&path).unwrap();

        assert_eq!(
            manifest.operations(),
            vec![
                Operation::Load {
                    file: "a.gpml".to_string()
                },
                Operation::Load {
                    file: "b.gpml".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.yaml");
        fs::write(&path, "files: []").unwrap();

        let err = Manifest::load(&path).unwrap_err();
        assert!(err.to_string().contains("Unsupported manifest format"));
    }

    #[test]
    fn test_missing_file_entry() {
        let manifest = Manifest::default();
        assert!(manifest.file("nowhere.gpml").is_err());
    }
}
