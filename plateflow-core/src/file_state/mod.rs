use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::activation::{ActivationChanges, ActiveListsManager, SharedStrategy};
use crate::file::{
    FeatureTypeClassifier, File, FileClassifier, FileHandle, FileNode, FileNodes, FileRef,
    LoadedFiles,
};
use crate::settings::Settings;
use crate::workflow::{
    ReconstructableWorkflow, ReconstructionWorkflow, SharedWorkflow, WorkflowManager, WorkflowTag,
};

pub mod events;

pub use events::{EventSender, FileStateEvent};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileStateError {
    #[error("{0} does not refer to a loaded file")]
    UnknownFile(FileHandle),

    #[error("workflow '{0}' is not registered")]
    UnknownWorkflow(WorkflowTag),

    #[error("workflow '{tag}' is not attached to {file}")]
    NotAttached { file: FileHandle, tag: WorkflowTag },
}

/// The built-in workflows registered by
/// [`FileState::register_builtin_workflows`]. `None` when disabled in settings.
#[derive(Clone, Default)]
pub struct BuiltinWorkflows {
    pub reconstructable: Option<Arc<ReconstructableWorkflow>>,
    pub reconstruction: Option<Arc<ReconstructionWorkflow>>,
}

/// Owns every loaded file and coordinates which workflows consume it.
///
/// Each method is one logical user action and runs as a single activation
/// transaction. Handles passed in from outside are validated here; once inside
/// the workflow manager, inconsistencies are bugs and panic.
pub struct FileState {
    files: FileNodes,
    classifier: Box<dyn FileClassifier>,
    workflows: WorkflowManager,
    active_lists: ActiveListsManager,
    events: Option<EventSender>,
}

impl Default for FileState {
    fn default() -> Self {
        Self::new(Box::new(FeatureTypeClassifier))
    }
}

impl FileState {
    pub fn new(classifier: Box<dyn FileClassifier>) -> Self {
        Self {
            files: FileNodes::new(),
            classifier,
            workflows: WorkflowManager::new(),
            active_lists: ActiveListsManager::new(),
            events: None,
        }
    }

    /// The default classifier with the built-in workflows registered.
    pub fn from_settings(settings: &Settings) -> (Self, BuiltinWorkflows) {
        let mut state = Self::default();
        let builtins = state.register_builtin_workflows(settings);
        (state, builtins)
    }

    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.events = Some(sender);
        self
    }

    fn emit(&self, event: FileStateEvent) {
        if let Some(events) = &self.events {
            events.send(event);
        }
    }

    fn emit_activation_changes(&self, changes: &ActivationChanges) {
        if let Some(events) = &self.events {
            events.send_activation_changes(changes);
        }
    }

    /// Registers the reconstructable and reconstruction workflows as the
    /// settings describe them.
    pub fn register_builtin_workflows(&mut self, settings: &Settings) -> BuiltinWorkflows {
        let mut builtins = BuiltinWorkflows::default();

        let reconstructable = settings.workflow(&ReconstructableWorkflow::workflow_tag());
        if reconstructable.enabled {
            let workflow = Arc::new(ReconstructableWorkflow::new());
            self.register_workflow(workflow.clone(), reconstructable.strategy.build());
            builtins.reconstructable = Some(workflow);
        }

        let reconstruction = settings.workflow(&ReconstructionWorkflow::workflow_tag());
        if reconstruction.enabled {
            let workflow = Arc::new(ReconstructionWorkflow::new());
            self.register_workflow(workflow.clone(), reconstruction.strategy.build());
            builtins.reconstruction = Some(workflow);
        }

        builtins
    }

    /// Panics if the tag is already registered. Files loaded before the
    /// workflow was registered are not offered to it.
    pub fn register_workflow(&mut self, workflow: SharedWorkflow, strategy: SharedStrategy) {
        let tag = workflow.tag();
        self.workflows.register_workflow(workflow, strategy);
        self.active_lists.register_workflow(&tag);
        self.emit(FileStateEvent::WorkflowRegistered { tag });
    }

    /// Detaches the workflow from every file and forgets it. Returns false if
    /// it was not registered.
    pub fn unregister_workflow(&mut self, tag: &WorkflowTag) -> bool {
        if !self.workflows.is_registered(tag) {
            return false;
        }

        let changes = self
            .workflows
            .detach_workflow(tag, &mut self.files, &mut self.active_lists);

        self.workflows.unregister_workflow(tag);
        self.active_lists.unregister_workflow(tag);
        self.emit_activation_changes(&changes);
        self.emit(FileStateEvent::WorkflowUnregistered { tag: tag.clone() });
        true
    }

    /// Returns false if the tag is not registered.
    pub fn set_activation_strategy(&mut self, tag: &WorkflowTag, strategy: SharedStrategy) -> bool {
        self.workflows.set_activation_strategy(strategy, tag)
    }

    pub fn add_file(&mut self, file: File) -> FileHandle {
        let classification = self.classifier.classify(&file);
        let name = file.display_name();
        debug!(%name, %classification, "Loading file");

        let handle = self.files.insert(FileNode::new(file, classification));
        self.emit(FileStateEvent::FileAdded { file: handle, name });

        let changes = self
            .workflows
            .add_file(handle, &mut self.files, &mut self.active_lists);
        self.emit_activation_changes(&changes);
        handle
    }

    /// Loads several files as one batch. Each file is still arbitrated in its
    /// own transaction, in order, so later files see earlier activations.
    pub fn add_files(&mut self, files: impl IntoIterator<Item = File>) -> Vec<FileHandle> {
        let files: Vec<File> = files.into_iter().collect();
        self.emit(FileStateEvent::BeginAddFiles { count: files.len() });

        let handles: Vec<FileHandle> = files.into_iter().map(|file| self.add_file(file)).collect();

        info!(count = handles.len(), "Loaded files");
        self.emit(FileStateEvent::EndAddFiles {
            files: handles.clone(),
        });
        handles
    }

    /// Unloads a file and hands it back to the caller.
    pub fn remove_file(&mut self, handle: FileHandle) -> Result<File, FileStateError> {
        if !self.files.contains(handle) {
            return Err(FileStateError::UnknownFile(handle));
        }
        self.emit(FileStateEvent::FileAboutToBeRemoved { file: handle });

        let changes = self
            .workflows
            .remove_file(handle, &mut self.files, &mut self.active_lists);
        self.emit_activation_changes(&changes);

        let node = self
            .files
            .remove(handle)
            .ok_or(FileStateError::UnknownFile(handle))?;
        debug!(file = %handle, name = %node.file.display_name(), "Unloaded file");
        self.emit(FileStateEvent::FileRemoved { file: handle });
        Ok(node.file)
    }

    /// Replaces a loaded file's content (for example after a reload from
    /// disk), keeping its handle. Returns the previous content.
    pub fn changed_file(
        &mut self,
        handle: FileHandle,
        new_file: File,
    ) -> Result<File, FileStateError> {
        let classification = self.classifier.classify(&new_file);
        let node = self
            .files
            .get_mut(handle)
            .ok_or(FileStateError::UnknownFile(handle))?;
        debug!(file = %handle, %classification, "File content changed");
        let old_file = std::mem::replace(&mut node.file, new_file);
        node.state.classification = classification;
        self.emit(FileStateEvent::FileChanged { file: handle });

        let changes = self.workflows.changed_file(
            handle,
            &old_file,
            &mut self.files,
            &mut self.active_lists,
        );
        self.emit_activation_changes(&changes);
        Ok(old_file)
    }

    /// Requests activation or deactivation of a file in one workflow. The
    /// workflow's strategy has the final say, and may change other files of
    /// that workflow as well.
    pub fn set_file_active_workflow(
        &mut self,
        handle: FileHandle,
        tag: &WorkflowTag,
        active: bool,
    ) -> Result<(), FileStateError> {
        self.check_attached(handle, tag)?;
        let changes = self.workflows.set_active(
            handle,
            tag,
            active,
            &mut self.files,
            &mut self.active_lists,
        );
        self.emit_activation_changes(&changes);
        Ok(())
    }

    pub fn is_file_active_workflow(
        &self,
        handle: FileHandle,
        tag: &WorkflowTag,
    ) -> Result<bool, FileStateError> {
        self.check_attached(handle, tag)?;
        Ok(self.files.loaded_ref(handle).is_active(tag))
    }

    fn check_attached(&self, handle: FileHandle, tag: &WorkflowTag) -> Result<(), FileStateError> {
        let file = self
            .files
            .file_ref(handle)
            .ok_or(FileStateError::UnknownFile(handle))?;
        if !self.workflows.is_registered(tag) {
            return Err(FileStateError::UnknownWorkflow(tag.clone()));
        }
        if !file.is_attached(tag) {
            return Err(FileStateError::NotAttached {
                file: handle,
                tag: tag.clone(),
            });
        }
        Ok(())
    }

    pub fn file(&self, handle: FileHandle) -> Option<FileRef<'_>> {
        self.files.file_ref(handle)
    }

    pub fn loaded_files(&self) -> LoadedFiles<'_> {
        self.files.iter()
    }

    /// A workflow's active files in the order they became active.
    pub fn active_files(
        &self,
        tag: &WorkflowTag,
    ) -> Result<impl DoubleEndedIterator<Item = FileRef<'_>> + ExactSizeIterator + '_, FileStateError>
    {
        let active = self
            .active_lists
            .try_get_active_files(tag)
            .ok_or_else(|| FileStateError::UnknownWorkflow(tag.clone()))?;
        Ok(active.map(move |handle| self.files.loaded_ref(handle)))
    }

    /// Registered workflow tags, highest priority first.
    pub fn workflow_tags(&self) -> Vec<WorkflowTag> {
        self.workflows
            .workflows()
            .map(|info| info.tag().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
