pub mod config;
pub mod manager;

pub use config::{Settings, WorkflowSettings};
pub use manager::SettingsManager;
