use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::activation::{ActivationStateManager, ActiveFiles, ActiveListsManager};
use crate::file::FileHandle;
use crate::workflow::WorkflowTag;

pub type SharedStrategy = Arc<dyn ActivationStrategy>;

/// A strategy's window onto the running transaction, limited to the one
/// workflow the strategy belongs to.
pub struct ActiveState<'t, 'f> {
    tag: &'t WorkflowTag,
    active_lists: &'t ActiveListsManager,
    txn: &'t mut ActivationStateManager<'f>,
}

impl<'t, 'f> ActiveState<'t, 'f> {
    pub(crate) fn new(
        tag: &'t WorkflowTag,
        active_lists: &'t ActiveListsManager,
        txn: &'t mut ActivationStateManager<'f>,
    ) -> Self {
        Self {
            tag,
            active_lists,
            txn,
        }
    }

    pub fn tag(&self) -> &WorkflowTag {
        self.tag
    }

    /// Files active for this workflow as of the start of the operation.
    pub fn get_active_workflow_files(&self) -> ActiveFiles<'_> {
        self.active_lists.get_active_files(self.tag)
    }

    pub fn set_file_active_workflow(&mut self, file: FileHandle, activate: bool) {
        self.txn.set_file_active_workflow(file, self.tag, activate);
    }
}

/// Decides which of a workflow's files are active. Each method is invoked at
/// one point in a file's lifecycle; the defaults activate on add and
/// deactivate on removal or rejection.
pub trait ActivationStrategy: Send + Sync {
    fn added_file_to_workflow(&self, file: FileHandle, active_state: &mut ActiveState<'_, '_>) {
        active_state.set_file_active_workflow(file, true);
    }

    fn removing_file_from_workflow(
        &self,
        file: FileHandle,
        active_state: &mut ActiveState<'_, '_>,
    ) {
        active_state.set_file_active_workflow(file, false);
    }

    fn workflow_rejected_changed_file(
        &self,
        file: FileHandle,
        active_state: &mut ActiveState<'_, '_>,
    ) {
        active_state.set_file_active_workflow(file, false);
    }

    fn set_active(&self, file: FileHandle, activate: bool, active_state: &mut ActiveState<'_, '_>) {
        active_state.set_file_active_workflow(file, activate);
    }
}

/// Every file a workflow takes is active until deactivated.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultActivationStrategy;

impl ActivationStrategy for DefaultActivationStrategy {}

/// At most one active file per workflow: activating a file deactivates
/// whichever file was active before.
#[derive(Debug, Clone, Copy, Default)]
pub struct MutuallyExclusiveActivationStrategy;

impl MutuallyExclusiveActivationStrategy {
    fn deactivate_all(active_state: &mut ActiveState<'_, '_>) {
        let active: Vec<FileHandle> = active_state.get_active_workflow_files().collect();
        for file in active {
            active_state.set_file_active_workflow(file, false);
        }
    }
}

impl ActivationStrategy for MutuallyExclusiveActivationStrategy {
    fn added_file_to_workflow(&self, file: FileHandle, active_state: &mut ActiveState<'_, '_>) {
        Self::deactivate_all(active_state);
        active_state.set_file_active_workflow(file, true);
    }

    fn set_active(&self, file: FileHandle, activate: bool, active_state: &mut ActiveState<'_, '_>) {
        if activate {
            Self::deactivate_all(active_state);
        }
        active_state.set_file_active_workflow(file, activate);
    }
}

/// Strategy selection as it appears in settings.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Default,
    MutuallyExclusive,
}

impl StrategyKind {
    pub fn build(self) -> SharedStrategy {
        match self {
            StrategyKind::Default => Arc::new(DefaultActivationStrategy),
            StrategyKind::MutuallyExclusive => Arc::new(MutuallyExclusiveActivationStrategy),
        }
    }
}
