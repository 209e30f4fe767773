pub mod activation;
pub mod file;
pub mod file_state;
pub mod settings;
pub mod workflow;

// Public library API - the types a caller needs to load files and register
// workflows. Everything else is public too, for custom workflows and strategies.
pub use activation::{ActivationStrategy, ActiveState, StrategyKind};
pub use file::{File, FileHandle, FileRef};
pub use file_state::{EventSender, FileState, FileStateError, FileStateEvent};
pub use settings::{Settings, SettingsManager};
pub use workflow::{Priority, Workflow, WorkflowTag};
