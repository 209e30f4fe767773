use serde::{Deserialize, Serialize};

use crate::file::{Classification, File, FileRef};

pub mod builtin;
pub mod manager;

pub use builtin::{ReconstructableWorkflow, ReconstructionWorkflow};
pub use manager::{SharedWorkflow, WorkflowInfo, WorkflowManager};

/// Unique name of a registered workflow.
#[derive(Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowTag(String);

impl WorkflowTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkflowTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Arbitration order between workflows; higher values are asked first.
///
/// Negative values are reserved for the built-in workflows so that user
/// workflows at [`Priority::NORMAL`] or above always outrank them.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Priority(pub i32);

impl Priority {
    pub const NORMAL: Priority = Priority(0);
    pub const RECONSTRUCTION: Priority = Priority(-1);
    pub const RECONSTRUCTABLE: Priority = Priority(-2);
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A consumer of loaded files.
///
/// The workflow decides whether a file's content interests it; whether an
/// interesting file is *active* is decided by the workflow's
/// [`ActivationStrategy`](crate::activation::ActivationStrategy), and the
/// outcome is reported back through [`set_file_active`](Workflow::set_file_active).
///
/// Callbacks run synchronously inside a workflow manager operation and must
/// not call back into the manager.
pub trait Workflow: Send + Sync {
    fn tag(&self) -> WorkflowTag;

    fn priority(&self) -> Priority {
        Priority::NORMAL
    }

    /// Returns true if this workflow wants the file. `claimed_by_higher_priority`
    /// is true when a workflow asked earlier in the same operation already
    /// took it.
    fn add_file(
        &self,
        file: FileRef<'_>,
        classification: &Classification,
        claimed_by_higher_priority: bool,
    ) -> bool;

    /// Called after the file has been deactivated and detached from this workflow.
    fn remove_file(&self, file: FileRef<'_>);

    /// The content of an attached file was replaced. Returns false to let go of it.
    fn changed_file(
        &self,
        file: FileRef<'_>,
        old_file: &File,
        new_classification: &Classification,
    ) -> bool;

    /// Net activation change for a file at the end of an operation.
    fn set_file_active(&self, file: FileRef<'_>, is_active: bool);
}
