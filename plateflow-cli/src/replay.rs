use std::collections::HashMap;
use std::fmt::Write as _;

use anyhow::{Context, Result};
use plateflow_core::file::FileHandle;
use plateflow_core::file_state::{EventSender, FileState, FileStateEvent};
use plateflow_core::settings::Settings;
use plateflow_core::workflow::WorkflowTag;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::manifest::{Manifest, Operation};

/// Replays a manifest's operations into a fresh [`FileState`].
pub struct Replay {
    state: FileState,
    event_rx: mpsc::UnboundedReceiver<FileStateEvent>,
    loaded: HashMap<String, FileHandle>,
}

impl Replay {
    pub fn new(settings: &Settings) -> Self {
        let (events, event_rx) = EventSender::new();
        let mut state = FileState::default().with_event_sender(events);
        state.register_builtin_workflows(settings);
        Self {
            state,
            event_rx,
            loaded: HashMap::new(),
        }
    }

    pub fn state(&self) -> &FileState {
        &self.state
    }

    pub fn run(&mut self, manifest: &Manifest) -> Result<()> {
        let operations = manifest.operations();
        info!(files = manifest.files.len(), operations = operations.len(), "Replaying manifest");

        for (index, operation) in operations.iter().enumerate() {
            self.apply(manifest, operation)
                .with_context(|| format!("Operation {} ({operation:?}) failed", index + 1))?;
        }
        Ok(())
    }

    fn apply(&mut self, manifest: &Manifest, operation: &Operation) -> Result<()> {
        debug!(?operation, "Applying operation");
        match operation {
            Operation::Load { file } => {
                if self.loaded.contains_key(file) {
                    anyhow::bail!("'{file}' is already loaded");
                }
                let handle = self.state.add_file(manifest.file(file)?.to_file());
                self.loaded.insert(file.clone(), handle);
            }
            Operation::Unload { file } => {
                let handle = self.handle(file)?;
                self.state.remove_file(handle)?;
                self.loaded.remove(file);
            }
            Operation::Activate { file, workflow } => {
                let handle = self.handle(file)?;
                self.state
                    .set_file_active_workflow(handle, &WorkflowTag::new(workflow), true)?;
            }
            Operation::Deactivate { file, workflow } => {
                let handle = self.handle(file)?;
                self.state
                    .set_file_active_workflow(handle, &WorkflowTag::new(workflow), false)?;
            }
            Operation::Replace { file, with } => {
                let handle = self.handle(file)?;
                self.state
                    .changed_file(handle, manifest.file(with)?.to_file())?;
            }
        }
        Ok(())
    }

    fn handle(&self, name: &str) -> Result<FileHandle> {
        self.loaded
            .get(name)
            .copied()
            .with_context(|| format!("'{name}' is not loaded"))
    }

    /// Events emitted since the last call.
    pub fn take_events(&mut self) -> Vec<FileStateEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.event_rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Each workflow's active files, highest priority workflow first.
    pub fn active_summary(&self) -> Result<String> {
        let mut out = String::new();
        for tag in self.state.workflow_tags() {
            let names: Vec<String> = self
                .state
                .active_files(&tag)?
                .map(|file| file.file().display_name())
                .collect();
            writeln!(out, "{tag}: [{}]", names.join(", "))?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestFile;
    use plateflow_core::file::Feature;

    fn rotation(name: &str) -> ManifestFile {
        ManifestFile {
            name: name.to_string(),
            features: vec![Feature::new("gpml:TotalReconstructionSequence")],
        }
    }

    fn coastline(name: &str) -> ManifestFile {
        ManifestFile {
            name: name.to_string(),
            features: vec![Feature::new("gpml:Coastline").with_plate_id(801)],
        }
    }

    fn load(file: &str) -> Operation {
        Operation::Load {
            file: file.to_string(),
        }
    }

    #[test]
    fn test_replay_switches_rotation_model() {
        let manifest = Manifest {
            files: vec![rotation("a.rot"), rotation("b.rot"), coastline("c.gpml")],
            operations: vec![
                load("a.rot"),
                load("b.rot"),
                load("c.gpml"),
                Operation::Activate {
                    file: "a.rot".to_string(),
                    workflow: "reconstruction".to_string(),
                },
            ],
        };

        let mut replay = Replay::new(&Settings::default());
        replay.run(&manifest).unwrap();

        assert_eq!(
            replay.active_summary().unwrap(),
            "reconstruction: [a.rot]\nreconstructable: [c.gpml]\n"
        );
        assert!(!replay.take_events().is_empty());
        assert!(replay.take_events().is_empty());
    }

    #[test]
    fn test_replace_and_unload() {
        let manifest = Manifest {
            files: vec![coastline("data.gpml"), rotation("data.rot")],
            operations: vec![
                load("data.gpml"),
                Operation::Replace {
                    file: "data.gpml".to_string(),
                    with: "data.rot".to_string(),
                },
            ],
        };

        let mut replay = Replay::new(&Settings::default());
        replay.run(&manifest).unwrap();
        assert_eq!(
            replay.active_summary().unwrap(),
            "reconstruction: [data.rot]\nreconstructable: []\n"
        );

        replay
            .apply(
                &manifest,
                &Operation::Unload {
                    file: "data.gpml".to_string(),
                },
            )
            .unwrap();
        assert!(replay.state().is_empty());
    }

    #[test]
    fn test_errors_name_the_failing_operation() {
        let manifest = Manifest {
            files: vec![coastline("c.gpml")],
            operations: vec![
                load("c.gpml"),
                Operation::Activate {
                    file: "c.gpml".to_string(),
                    workflow: "reconstruction".to_string(),
                },
            ],
        };

        let mut replay = Replay::new(&Settings::default());
        let err = replay.run(&manifest).unwrap_err();

        assert!(err.to_string().starts_with("Operation 2"));
        assert!(format!("{err:#}").contains("not attached"));
    }

    #[test]
    fn test_unloading_unknown_file_fails() {
        let mut replay = Replay::new(&Settings::default());
        let err = replay
            .run(&Manifest {
                files: vec![],
                operations: vec![Operation::Unload {
                    file: "ghost.gpml".to_string(),
                }],
            })
            .unwrap_err();
        assert!(format!("{err:#}").contains("'ghost.gpml' is not loaded"));
    }
}
