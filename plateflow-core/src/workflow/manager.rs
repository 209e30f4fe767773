use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::activation::{
    ActivationChanges, ActivationStateManager, ActiveListsManager, ActiveState, SharedStrategy,
};
use crate::file::{File, FileHandle, FileNodes};
use crate::workflow::{Priority, Workflow, WorkflowTag};

pub type SharedWorkflow = Arc<dyn Workflow>;

/// A registered workflow and the strategy that manages its activation.
#[derive(Clone)]
pub struct WorkflowInfo {
    workflow: SharedWorkflow,
    strategy: SharedStrategy,
    tag: WorkflowTag,
    priority: Priority,
}

impl WorkflowInfo {
    pub fn workflow(&self) -> &SharedWorkflow {
        &self.workflow
    }

    pub fn strategy(&self) -> &SharedStrategy {
        &self.strategy
    }

    pub fn tag(&self) -> &WorkflowTag {
        &self.tag
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }
}

/// Arbitrates loaded files between workflows.
///
/// Each public operation is one transaction: it asks workflows from highest
/// to lowest priority, lets their strategies decide activation, syncs the
/// active lists and then tells each workflow about the *net* activation change
/// of each file exactly once.
#[derive(Default)]
pub struct WorkflowManager {
    registry: HashMap<WorkflowTag, WorkflowInfo>,
    /// Ascending priority; equal priorities keep registration order.
    by_priority: Vec<WorkflowInfo>,
}

impl WorkflowManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Panics if a workflow with the same tag is already registered.
    pub fn register_workflow(&mut self, workflow: SharedWorkflow, strategy: SharedStrategy) {
        let tag = workflow.tag();
        let priority = workflow.priority();
        assert!(
            !self.registry.contains_key(&tag),
            "workflow '{tag}' is already registered"
        );

        let info = WorkflowInfo {
            workflow,
            strategy,
            tag: tag.clone(),
            priority,
        };
        let index = self
            .by_priority
            .partition_point(|existing| existing.priority <= priority);
        self.by_priority.insert(index, info.clone());
        self.registry.insert(tag.clone(), info);
        info!(%tag, %priority, "Registered workflow");
    }

    pub fn unregister_workflow(&mut self, tag: &WorkflowTag) -> Option<WorkflowInfo> {
        let info = self.registry.remove(tag)?;
        self.by_priority.retain(|existing| existing.tag != *tag);
        info!(%tag, "Unregistered workflow");
        Some(info)
    }

    /// Returns false, changing nothing, if the tag is not registered.
    pub fn set_activation_strategy(&mut self, strategy: SharedStrategy, tag: &WorkflowTag) -> bool {
        let Some(info) = self.registry.get_mut(tag) else {
            return false;
        };
        info.strategy = strategy.clone();
        if let Some(ordered) = self.by_priority.iter_mut().find(|info| info.tag == *tag) {
            ordered.strategy = strategy;
        }
        debug!(%tag, "Replaced activation strategy");
        true
    }

    pub fn workflow(&self, tag: &WorkflowTag) -> Option<&WorkflowInfo> {
        self.registry.get(tag)
    }

    pub fn is_registered(&self, tag: &WorkflowTag) -> bool {
        self.registry.contains_key(tag)
    }

    /// Registered workflows, highest priority first.
    pub fn workflows(&self) -> impl Iterator<Item = &WorkflowInfo> {
        self.by_priority.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    fn expect_workflow(&self, tag: &WorkflowTag) -> &WorkflowInfo {
        match self.registry.get(tag) {
            Some(info) => info,
            None => panic!("workflow '{tag}' is not registered"),
        }
    }

    /// Offers a newly loaded file to every workflow.
    pub fn add_file(
        &self,
        file: FileHandle,
        files: &mut FileNodes,
        active_lists: &mut ActiveListsManager,
    ) -> ActivationChanges {
        let mut txn = ActivationStateManager::new(files);

        let mut claimed_by_higher_priority = false;
        for info in self.workflows() {
            if self.offer_file(info, file, &mut txn, active_lists, claimed_by_higher_priority) {
                claimed_by_higher_priority = true;
            }
        }

        self.apply_and_notify(&txn, active_lists)
    }

    /// Deactivates and detaches the file from every workflow holding it.
    /// Workflows see the deactivation before their `remove_file` is called.
    pub fn remove_file(
        &self,
        file: FileHandle,
        files: &mut FileNodes,
        active_lists: &mut ActiveListsManager,
    ) -> ActivationChanges {
        let mut txn = ActivationStateManager::new(files);

        let mut detached = Vec::new();
        for info in self.workflows() {
            if !txn.file(file).is_attached(&info.tag) {
                continue;
            }
            {
                let mut active_state = ActiveState::new(&info.tag, active_lists, &mut txn);
                info.strategy.removing_file_from_workflow(file, &mut active_state);
            }
            // The strategy may have left it active; removal always deactivates.
            txn.set_file_active_workflow(file, &info.tag, false);
            txn.remove_workflow_tag(file, &info.tag);
            detached.push(info);
        }

        if let Some(tag) = txn.file(file).workflow_tags().next() {
            panic!("{file} is attached to unregistered workflow '{tag}'");
        }

        let changes = self.apply_and_notify(&txn, active_lists);

        for info in detached {
            debug!(%file, tag = %info.tag, "Removing file from workflow");
            info.workflow.remove_file(txn.file(file));
        }

        changes
    }

    /// Deactivates and detaches one workflow from every file it holds, ahead
    /// of unregistering it. The workflow is notified of each deactivation but
    /// its `remove_file` is not called.
    pub fn detach_workflow(
        &self,
        tag: &WorkflowTag,
        files: &mut FileNodes,
        active_lists: &mut ActiveListsManager,
    ) -> ActivationChanges {
        let info = self.expect_workflow(tag);
        let attached: Vec<FileHandle> = files
            .iter()
            .filter(|file| file.is_attached(tag))
            .map(|file| file.handle())
            .collect();

        let mut txn = ActivationStateManager::new(files);
        for file in attached {
            {
                let mut active_state = ActiveState::new(&info.tag, active_lists, &mut txn);
                info.strategy.removing_file_from_workflow(file, &mut active_state);
            }
            txn.set_file_active_workflow(file, &info.tag, false);
            txn.remove_workflow_tag(file, &info.tag);
        }

        debug!(%tag, "Detached workflow from all files");
        self.apply_and_notify(&txn, active_lists)
    }

    /// Re-arbitrates a file whose content was replaced: attached workflows may
    /// let go of it and unattached ones may now want it.
    pub fn changed_file(
        &self,
        file: FileHandle,
        old_file: &File,
        files: &mut FileNodes,
        active_lists: &mut ActiveListsManager,
    ) -> ActivationChanges {
        let mut txn = ActivationStateManager::new(files);

        let mut claimed_by_higher_priority = false;
        for info in self.workflows() {
            let file_ref = txn.file(file);
            if !file_ref.is_attached(&info.tag) {
                if self.offer_file(info, file, &mut txn, active_lists, claimed_by_higher_priority) {
                    claimed_by_higher_priority = true;
                }
                continue;
            }

            if info
                .workflow
                .changed_file(file_ref, old_file, file_ref.classification())
            {
                claimed_by_higher_priority = true;
                continue;
            }

            debug!(%file, tag = %info.tag, "Workflow rejected changed file");
            {
                let mut active_state = ActiveState::new(&info.tag, active_lists, &mut txn);
                info.strategy.workflow_rejected_changed_file(file, &mut active_state);
            }
            txn.set_file_active_workflow(file, &info.tag, false);
            txn.remove_workflow_tag(file, &info.tag);
        }

        self.apply_and_notify(&txn, active_lists)
    }

    /// Asks the workflow's strategy to (de)activate a file. The strategy may
    /// touch other files of the same workflow too.
    pub fn set_active(
        &self,
        file: FileHandle,
        tag: &WorkflowTag,
        activate: bool,
        files: &mut FileNodes,
        active_lists: &mut ActiveListsManager,
    ) -> ActivationChanges {
        let info = self.expect_workflow(tag);
        let mut txn = ActivationStateManager::new(files);
        {
            let mut active_state = ActiveState::new(&info.tag, active_lists, &mut txn);
            info.strategy.set_active(file, activate, &mut active_state);
        }
        self.apply_and_notify(&txn, active_lists)
    }

    fn offer_file(
        &self,
        info: &WorkflowInfo,
        file: FileHandle,
        txn: &mut ActivationStateManager<'_>,
        active_lists: &ActiveListsManager,
        claimed_by_higher_priority: bool,
    ) -> bool {
        let file_ref = txn.file(file);
        let interested = info.workflow.add_file(
            file_ref,
            file_ref.classification(),
            claimed_by_higher_priority,
        );
        if !interested {
            return false;
        }

        debug!(%file, tag = %info.tag, claimed_by_higher_priority, "Workflow took file");
        txn.add_workflow_tag(file, &info.tag);
        let mut active_state = ActiveState::new(&info.tag, active_lists, txn);
        info.strategy.added_file_to_workflow(file, &mut active_state);
        true
    }

    fn apply_and_notify(
        &self,
        txn: &ActivationStateManager<'_>,
        active_lists: &mut ActiveListsManager,
    ) -> ActivationChanges {
        active_lists.update_active_lists(txn);

        let changes = txn.get_changed_activation_workflow_files();
        if let Some(tag) = changes
            .workflow_tags()
            .find(|tag| !self.registry.contains_key(*tag))
        {
            panic!("activation changed for unregistered workflow '{tag}'");
        }

        for info in self.workflows() {
            for change in changes.workflow(&info.tag) {
                debug!(file = %change.file, tag = %info.tag, active = change.active, "Notifying workflow");
                info.workflow.set_file_active(txn.file(change.file), change.active);
            }
        }

        changes
    }
}
