use std::collections::BTreeMap;

use tracing::trace;

use crate::file::{FileHandle, FileNodes, FileRef};
use crate::workflow::WorkflowTag;

/// First and last activation value of one (file, workflow) pair within a
/// transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveInfo {
    pub file: FileHandle,
    pub initial_active: bool,
    pub final_active: bool,
}

impl ActiveInfo {
    pub fn changed(&self) -> bool {
        self.initial_active != self.final_active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationChange {
    pub file: FileHandle,
    pub active: bool,
}

/// Net activation changes of one transaction, grouped by workflow. Within a
/// workflow, files appear in the order they were first touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationChanges {
    by_workflow: BTreeMap<WorkflowTag, Vec<ActivationChange>>,
}

impl ActivationChanges {
    pub fn is_empty(&self) -> bool {
        self.by_workflow.is_empty()
    }

    /// Total number of (workflow, file) pairs that changed.
    pub fn len(&self) -> usize {
        self.by_workflow.values().map(Vec::len).sum()
    }

    pub fn workflow(&self, tag: &WorkflowTag) -> &[ActivationChange] {
        self.by_workflow.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&WorkflowTag, &[ActivationChange])> {
        self.by_workflow
            .iter()
            .map(|(tag, changes)| (tag, changes.as_slice()))
    }

    pub fn workflow_tags(&self) -> impl Iterator<Item = &WorkflowTag> {
        self.by_workflow.keys()
    }
}

/// Records every activation write made during one workflow manager operation.
///
/// Holds the only mutable borrow of the file arena for the duration of the
/// operation. Writes go straight through to the files; the transaction keeps
/// the value each (file, workflow) pair had before its first write so that
/// toggling back and forth within one operation nets out to no change.
pub struct ActivationStateManager<'f> {
    files: &'f mut FileNodes,
    log: BTreeMap<WorkflowTag, Vec<ActiveInfo>>,
}

impl<'f> ActivationStateManager<'f> {
    pub fn new(files: &'f mut FileNodes) -> Self {
        Self {
            files,
            log: BTreeMap::new(),
        }
    }

    /// Panics if the handle does not refer to a loaded file.
    pub fn file(&self, file: FileHandle) -> FileRef<'_> {
        self.files.loaded_ref(file)
    }

    /// Attaches a workflow to a file, initially inactive.
    pub fn add_workflow_tag(&mut self, file: FileHandle, tag: &WorkflowTag) {
        trace!(%file, %tag, "Attaching workflow to file");
        self.files
            .node_mut(file)
            .state
            .active_state
            .add_workflow_tag(tag, false);
    }

    pub fn remove_workflow_tag(&mut self, file: FileHandle, tag: &WorkflowTag) {
        trace!(%file, %tag, "Detaching workflow from file");
        self.files
            .node_mut(file)
            .state
            .active_state
            .remove_workflow_tag(tag);
    }

    pub fn is_file_active_workflow(&self, file: FileHandle, tag: &WorkflowTag) -> bool {
        self.files.node(file).state.active_state.is_active(tag)
    }

    /// Panics if the workflow is not attached to the file.
    pub fn set_file_active_workflow(&mut self, file: FileHandle, tag: &WorkflowTag, activate: bool) {
        let active_state = &mut self.files.node_mut(file).state.active_state;
        let current = active_state.is_active(tag);
        active_state.set_active(tag, activate);

        let entries = self.log.entry(tag.clone()).or_default();
        match entries.iter_mut().find(|info| info.file == file) {
            Some(info) => info.final_active = activate,
            None => entries.push(ActiveInfo {
                file,
                initial_active: current,
                final_active: activate,
            }),
        }
        trace!(%file, %tag, activate, "Recorded activation write");
    }

    /// Everything touched so far, including entries that netted out.
    pub fn touched(&self, tag: &WorkflowTag) -> &[ActiveInfo] {
        self.log.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Files whose activation differs from the start of the transaction,
    /// grouped by workflow. Computed from the write log on every call.
    pub fn get_changed_activation_workflow_files(&self) -> ActivationChanges {
        compute_changes(&self.log)
    }

    pub fn into_changes(self) -> ActivationChanges {
        compute_changes(&self.log)
    }
}

fn compute_changes(log: &BTreeMap<WorkflowTag, Vec<ActiveInfo>>) -> ActivationChanges {
    let by_workflow = log
        .iter()
        .filter_map(|(tag, entries)| {
            let changes: Vec<ActivationChange> = entries
                .iter()
                .filter(|info| info.changed())
                .map(|info| ActivationChange {
                    file: info.file,
                    active: info.final_active,
                })
                .collect();
            (!changes.is_empty()).then(|| (tag.clone(), changes))
        })
        .collect();
    ActivationChanges { by_workflow }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{Classification, File, FileNode};

    fn load(files: &mut FileNodes, name: &str) -> FileHandle {
        files.insert(FileNode::new(
            File::from_path(name, vec![]),
            Classification::empty(),
        ))
    }

    #[test]
    fn test_single_write_is_reported() {
        let mut files = FileNodes::new();
        let a = load(&mut files, "a.gpml");
        let tag = WorkflowTag::new("reconstructable");

        let mut txn = ActivationStateManager::new(&mut files);
        txn.add_workflow_tag(a, &tag);
        txn.set_file_active_workflow(a, &tag, true);

        let changes = txn.get_changed_activation_workflow_files();
        assert_eq!(
            changes.workflow(&tag),
            &[ActivationChange {
                file: a,
                active: true
            }]
        );
        assert!(txn.is_file_active_workflow(a, &tag));
    }

    #[test]
    fn test_toggle_back_nets_out() {
        let mut files = FileNodes::new();
        let a = load(&mut files, "a.gpml");
        let tag = WorkflowTag::new("reconstruction");

        let mut txn = ActivationStateManager::new(&mut files);
        txn.add_workflow_tag(a, &tag);
        txn.set_file_active_workflow(a, &tag, true);
        txn.set_file_active_workflow(a, &tag, false);
        txn.set_file_active_workflow(a, &tag, true);
        txn.set_file_active_workflow(a, &tag, false);

        assert!(txn.get_changed_activation_workflow_files().is_empty());
        assert_eq!(txn.touched(&tag).len(), 1);
    }

    #[test]
    fn test_initial_value_comes_from_before_the_transaction() {
        let mut files = FileNodes::new();
        let a = load(&mut files, "a.gpml");
        let tag = WorkflowTag::new("reconstruction");

        {
            let mut txn = ActivationStateManager::new(&mut files);
            txn.add_workflow_tag(a, &tag);
            txn.set_file_active_workflow(a, &tag, true);
        }

        let mut txn = ActivationStateManager::new(&mut files);
        txn.set_file_active_workflow(a, &tag, false);
        txn.set_file_active_workflow(a, &tag, true);
        assert!(txn.get_changed_activation_workflow_files().is_empty());

        txn.set_file_active_workflow(a, &tag, false);
        let changes = txn.into_changes();
        assert_eq!(changes.len(), 1);
        assert!(!changes.workflow(&tag)[0].active);
    }

    #[test]
    fn test_changes_are_grouped_by_workflow() {
        let mut files = FileNodes::new();
        let a = load(&mut files, "a.gpml");
        let b = load(&mut files, "b.gpml");
        let first = WorkflowTag::new("first");
        let second = WorkflowTag::new("second");

        let mut txn = ActivationStateManager::new(&mut files);
        for file in [a, b] {
            txn.add_workflow_tag(file, &first);
            txn.add_workflow_tag(file, &second);
        }
        txn.set_file_active_workflow(b, &first, true);
        txn.set_file_active_workflow(a, &first, true);
        txn.set_file_active_workflow(a, &second, true);

        let changes = txn.get_changed_activation_workflow_files();
        let first_files: Vec<FileHandle> =
            changes.workflow(&first).iter().map(|c| c.file).collect();
        assert_eq!(first_files, vec![b, a]);
        assert_eq!(changes.workflow(&second).len(), 1);
        assert_eq!(changes.workflow_tags().count(), 2);
    }

    #[test]
    #[should_panic(expected = "not attached")]
    fn test_setting_unattached_workflow_panics() {
        let mut files = FileNodes::new();
        let a = load(&mut files, "a.gpml");

        let mut txn = ActivationStateManager::new(&mut files);
        txn.set_file_active_workflow(a, &WorkflowTag::new("missing"), true);
    }
}
