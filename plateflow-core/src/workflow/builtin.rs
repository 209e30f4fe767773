use std::collections::BTreeSet;
use std::sync::RwLock;

use tracing::debug;

use crate::file::{Classification, FeatureCollectionType, File, FileHandle, FileRef};
use crate::workflow::{Priority, Workflow, WorkflowTag};

pub const RECONSTRUCTABLE_TAG: &str = "reconstructable";
pub const RECONSTRUCTION_TAG: &str = "reconstruction";

/// Files a built-in workflow holds, and which of them it was told are active.
#[derive(Debug, Default)]
struct HeldFiles {
    held: BTreeSet<FileHandle>,
    active: BTreeSet<FileHandle>,
}

/// Shared behavior of the built-in workflows: interest is decided purely by
/// the file's classification.
#[derive(Debug)]
struct ClassifiedWorkflow {
    tag: &'static str,
    priority: Priority,
    kind: FeatureCollectionType,
    files: RwLock<HeldFiles>,
}

impl ClassifiedWorkflow {
    fn new(tag: &'static str, priority: Priority, kind: FeatureCollectionType) -> Self {
        Self {
            tag,
            priority,
            kind,
            files: RwLock::new(HeldFiles::default()),
        }
    }

    fn add_file(&self, file: FileRef<'_>, classification: &Classification) -> bool {
        if !classification.contains(self.kind) {
            return false;
        }
        self.files.write().unwrap().held.insert(file.handle());
        true
    }

    fn remove_file(&self, file: FileRef<'_>) {
        let mut files = self.files.write().unwrap();
        files.held.remove(&file.handle());
        files.active.remove(&file.handle());
    }

    fn changed_file(&self, file: FileRef<'_>, new_classification: &Classification) -> bool {
        if new_classification.contains(self.kind) {
            return true;
        }
        debug!(tag = self.tag, file = %file.handle(), "Changed file no longer matches workflow");
        self.files.write().unwrap().held.remove(&file.handle());
        false
    }

    fn set_file_active(&self, file: FileRef<'_>, is_active: bool) {
        let mut files = self.files.write().unwrap();
        if is_active {
            files.active.insert(file.handle());
        } else {
            files.active.remove(&file.handle());
        }
    }

    fn held_files(&self) -> Vec<FileHandle> {
        self.files.read().unwrap().held.iter().copied().collect()
    }

    fn active_files(&self) -> Vec<FileHandle> {
        self.files.read().unwrap().active.iter().copied().collect()
    }
}

/// Takes every file containing features that can be reconstructed.
#[derive(Debug)]
pub struct ReconstructableWorkflow {
    inner: ClassifiedWorkflow,
}

impl ReconstructableWorkflow {
    pub fn new() -> Self {
        Self {
            inner: ClassifiedWorkflow::new(
                RECONSTRUCTABLE_TAG,
                Priority::RECONSTRUCTABLE,
                FeatureCollectionType::Reconstructable,
            ),
        }
    }

    pub fn workflow_tag() -> WorkflowTag {
        WorkflowTag::new(RECONSTRUCTABLE_TAG)
    }

    pub fn held_files(&self) -> Vec<FileHandle> {
        self.inner.held_files()
    }

    pub fn active_files(&self) -> Vec<FileHandle> {
        self.inner.active_files()
    }
}

impl Default for ReconstructableWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl Workflow for ReconstructableWorkflow {
    fn tag(&self) -> WorkflowTag {
        Self::workflow_tag()
    }

    fn priority(&self) -> Priority {
        self.inner.priority
    }

    fn add_file(
        &self,
        file: FileRef<'_>,
        classification: &Classification,
        _claimed_by_higher_priority: bool,
    ) -> bool {
        self.inner.add_file(file, classification)
    }

    fn remove_file(&self, file: FileRef<'_>) {
        self.inner.remove_file(file);
    }

    fn changed_file(
        &self,
        file: FileRef<'_>,
        _old_file: &File,
        new_classification: &Classification,
    ) -> bool {
        self.inner.changed_file(file, new_classification)
    }

    fn set_file_active(&self, file: FileRef<'_>, is_active: bool) {
        self.inner.set_file_active(file, is_active);
    }
}

/// Takes every file containing rotation data. Usually paired with
/// [`MutuallyExclusiveActivationStrategy`](crate::activation::MutuallyExclusiveActivationStrategy)
/// so only one rotation model drives reconstructions at a time.
#[derive(Debug)]
pub struct ReconstructionWorkflow {
    inner: ClassifiedWorkflow,
}

impl ReconstructionWorkflow {
    pub fn new() -> Self {
        Self {
            inner: ClassifiedWorkflow::new(
                RECONSTRUCTION_TAG,
                Priority::RECONSTRUCTION,
                FeatureCollectionType::Reconstruction,
            ),
        }
    }

    pub fn workflow_tag() -> WorkflowTag {
        WorkflowTag::new(RECONSTRUCTION_TAG)
    }

    pub fn held_files(&self) -> Vec<FileHandle> {
        self.inner.held_files()
    }

    pub fn active_files(&self) -> Vec<FileHandle> {
        self.inner.active_files()
    }
}

impl Default for ReconstructionWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl Workflow for ReconstructionWorkflow {
    fn tag(&self) -> WorkflowTag {
        Self::workflow_tag()
    }

    fn priority(&self) -> Priority {
        self.inner.priority
    }

    fn add_file(
        &self,
        file: FileRef<'_>,
        classification: &Classification,
        _claimed_by_higher_priority: bool,
    ) -> bool {
        self.inner.add_file(file, classification)
    }

    fn remove_file(&self, file: FileRef<'_>) {
        self.inner.remove_file(file);
    }

    fn changed_file(
        &self,
        file: FileRef<'_>,
        _old_file: &File,
        new_classification: &Classification,
    ) -> bool {
        self.inner.changed_file(file, new_classification)
    }

    fn set_file_active(&self, file: FileRef<'_>, is_active: bool) {
        self.inner.set_file_active(file, is_active);
    }
}
