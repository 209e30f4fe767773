use std::collections::HashMap;

use tracing::debug;

use crate::activation::ActivationStateManager;
use crate::file::FileHandle;
use crate::workflow::WorkflowTag;

/// Per-workflow list of active files, in the order they became active.
#[derive(Debug, Default)]
pub struct ActiveListsManager {
    lists: HashMap<WorkflowTag, Vec<FileHandle>>,
}

impl ActiveListsManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_workflow(&mut self, tag: &WorkflowTag) {
        let previous = self.lists.insert(tag.clone(), Vec::new());
        assert!(
            previous.is_none(),
            "active list for workflow '{tag}' already exists"
        );
    }

    pub fn unregister_workflow(&mut self, tag: &WorkflowTag) {
        self.lists.remove(tag);
    }

    pub fn is_registered(&self, tag: &WorkflowTag) -> bool {
        self.lists.contains_key(tag)
    }

    /// Panics if the workflow was never registered.
    pub fn get_active_files(&self, tag: &WorkflowTag) -> ActiveFiles<'_> {
        match self.try_get_active_files(tag) {
            Some(files) => files,
            None => panic!("no active list for unregistered workflow '{tag}'"),
        }
    }

    pub fn try_get_active_files(&self, tag: &WorkflowTag) -> Option<ActiveFiles<'_>> {
        self.lists.get(tag).map(|list| ActiveFiles { inner: list.iter() })
    }

    /// Brings the lists in line with every file whose activation changed in
    /// the transaction, reading the activation now stored on the file.
    /// Returns the number of list insertions and removals performed, which is
    /// zero when the lists were already in sync.
    pub fn update_active_lists(&mut self, txn: &ActivationStateManager<'_>) -> usize {
        let mut mutations = 0;
        for (tag, changes) in txn.get_changed_activation_workflow_files().iter() {
            let Some(list) = self.lists.get_mut(tag) else {
                panic!("activation changed for unregistered workflow '{tag}'");
            };

            for change in changes {
                let is_active = txn.file(change.file).is_active(tag);
                let position = list.iter().position(|file| *file == change.file);
                match (is_active, position) {
                    (true, None) => {
                        list.push(change.file);
                        mutations += 1;
                    }
                    (false, Some(index)) => {
                        list.remove(index);
                        mutations += 1;
                    }
                    _ => {}
                }
            }
            debug!(%tag, active_files = list.len(), "Updated active list");
        }
        mutations
    }
}

/// Handles of a workflow's active files.
#[derive(Clone)]
pub struct ActiveFiles<'a> {
    inner: std::slice::Iter<'a, FileHandle>,
}

impl Iterator for ActiveFiles<'_> {
    type Item = FileHandle;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().copied()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for ActiveFiles<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().copied()
    }
}

impl ExactSizeIterator for ActiveFiles<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{Classification, File, FileNode, FileNodes};

    fn load(files: &mut FileNodes, name: &str) -> FileHandle {
        files.insert(FileNode::new(
            File::from_path(name, vec![]),
            Classification::empty(),
        ))
    }

    #[test]
    fn test_update_is_idempotent() {
        let tag = WorkflowTag::new("reconstructable");
        let mut lists = ActiveListsManager::new();
        lists.register_workflow(&tag);

        let mut files = FileNodes::new();
        let a = load(&mut files, "a.gpml");
        let b = load(&mut files, "b.gpml");

        let mut txn = ActivationStateManager::new(&mut files);
        txn.add_workflow_tag(a, &tag);
        txn.add_workflow_tag(b, &tag);
        txn.set_file_active_workflow(a, &tag, true);
        txn.set_file_active_workflow(b, &tag, true);

        assert_eq!(lists.update_active_lists(&txn), 2);
        assert_eq!(lists.update_active_lists(&txn), 0);

        let active: Vec<FileHandle> = lists.get_active_files(&tag).collect();
        assert_eq!(active, vec![a, b]);
        let reversed: Vec<FileHandle> = lists.get_active_files(&tag).rev().collect();
        assert_eq!(reversed, vec![b, a]);
    }

    #[test]
    fn test_deactivation_removes_from_list() {
        let tag = WorkflowTag::new("reconstruction");
        let mut lists = ActiveListsManager::new();
        lists.register_workflow(&tag);

        let mut files = FileNodes::new();
        let a = load(&mut files, "a.rot");

        {
            let mut txn = ActivationStateManager::new(&mut files);
            txn.add_workflow_tag(a, &tag);
            txn.set_file_active_workflow(a, &tag, true);
            lists.update_active_lists(&txn);
        }
        assert_eq!(lists.get_active_files(&tag).len(), 1);

        let mut txn = ActivationStateManager::new(&mut files);
        txn.set_file_active_workflow(a, &tag, false);
        txn.remove_workflow_tag(a, &tag);
        assert_eq!(lists.update_active_lists(&txn), 1);
        assert_eq!(lists.get_active_files(&tag).len(), 0);
    }

    #[test]
    #[should_panic(expected = "unregistered workflow")]
    fn test_unknown_workflow_panics() {
        let lists = ActiveListsManager::new();
        let _ = lists.get_active_files(&WorkflowTag::new("missing"));
    }
}
