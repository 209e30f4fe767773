use std::collections::BTreeMap;

use crate::file::{Classification, File};
use crate::workflow::WorkflowTag;

/// Per-file activation flags, one per workflow attached to the file.
///
/// A tag has to be added before it can be queried or set and is removed
/// exactly once when its workflow lets go of the file. Breaking that protocol
/// is a bug in the caller and panics.
#[derive(Debug, Clone, Default)]
pub struct FileNodeActiveState {
    active: BTreeMap<WorkflowTag, bool>,
}

impl FileNodeActiveState {
    pub fn add_workflow_tag(&mut self, tag: &WorkflowTag, active: bool) {
        let previous = self.active.insert(tag.clone(), active);
        assert!(
            previous.is_none(),
            "workflow tag '{tag}' is already attached to this file"
        );
    }

    pub fn remove_workflow_tag(&mut self, tag: &WorkflowTag) {
        let removed = self.active.remove(tag);
        assert!(
            removed.is_some(),
            "cannot remove workflow tag '{tag}': not attached to this file"
        );
    }

    pub fn set_active(&mut self, tag: &WorkflowTag, active: bool) {
        match self.active.get_mut(tag) {
            Some(flag) => *flag = active,
            None => panic!("cannot set activation for workflow tag '{tag}': not attached"),
        }
    }

    pub fn is_active(&self, tag: &WorkflowTag) -> bool {
        match self.active.get(tag) {
            Some(active) => *active,
            None => panic!("cannot query activation for workflow tag '{tag}': not attached"),
        }
    }

    /// Non-panicking lookup: `None` when the tag is not attached.
    pub fn get(&self, tag: &WorkflowTag) -> Option<bool> {
        self.active.get(tag).copied()
    }

    pub fn has_workflow_tag(&self, tag: &WorkflowTag) -> bool {
        self.active.contains_key(tag)
    }

    pub fn workflow_tags(&self) -> impl Iterator<Item = &WorkflowTag> {
        self.active.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FileNodeState {
    pub classification: Classification,
    pub active_state: FileNodeActiveState,
}

/// Owns one loaded file plus everything the activation core knows about it.
#[derive(Debug)]
pub struct FileNode {
    pub(crate) file: File,
    pub(crate) state: FileNodeState,
}

impl FileNode {
    pub(crate) fn new(file: File, classification: Classification) -> Self {
        Self {
            file,
            state: FileNodeState {
                classification,
                active_state: FileNodeActiveState::default(),
            },
        }
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn classification(&self) -> &Classification {
        &self.state.classification
    }

    pub fn active_state(&self) -> &FileNodeActiveState {
        &self.state.active_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str) -> WorkflowTag {
        WorkflowTag::new(name)
    }

    #[test]
    fn test_add_set_and_remove_tag() {
        let mut state = FileNodeActiveState::default();
        state.add_workflow_tag(&tag("reconstructable"), false);
        assert!(!state.is_active(&tag("reconstructable")));

        state.set_active(&tag("reconstructable"), true);
        assert!(state.is_active(&tag("reconstructable")));

        state.remove_workflow_tag(&tag("reconstructable"));
        assert!(state.is_empty());
        assert_eq!(state.get(&tag("reconstructable")), None);
    }

    #[test]
    #[should_panic(expected = "already attached")]
    fn test_adding_tag_twice_panics() {
        let mut state = FileNodeActiveState::default();
        state.add_workflow_tag(&tag("reconstruction"), false);
        state.add_workflow_tag(&tag("reconstruction"), true);
    }

    #[test]
    #[should_panic(expected = "not attached")]
    fn test_removing_missing_tag_panics() {
        let mut state = FileNodeActiveState::default();
        state.remove_workflow_tag(&tag("reconstruction"));
    }

    #[test]
    #[should_panic(expected = "not attached")]
    fn test_setting_missing_tag_panics() {
        let mut state = FileNodeActiveState::default();
        state.set_active(&tag("reconstruction"), true);
    }
}
