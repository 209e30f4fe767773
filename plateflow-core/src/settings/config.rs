use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::activation::StrategyKind;
use crate::workflow::builtin::{RECONSTRUCTABLE_TAG, RECONSTRUCTION_TAG};
use crate::workflow::WorkflowTag;

/// How one workflow is set up when the file state is created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowSettings {
    /// Disabled workflows are not registered at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Activation strategy used for the workflow's files
    #[serde(default)]
    pub strategy: StrategyKind,
}

fn default_enabled() -> bool {
    true
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            strategy: StrategyKind::Default,
        }
    }
}

/// Core application settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    /// `tracing_subscriber::EnvFilter` directive used when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Per-workflow overrides keyed by workflow tag
    #[serde(default = "default_workflows")]
    pub workflows: BTreeMap<String, WorkflowSettings>,
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn builtin_workflow_settings(tag: &str) -> WorkflowSettings {
    match tag {
        // Only one rotation model drives a reconstruction at a time.
        RECONSTRUCTION_TAG => WorkflowSettings {
            enabled: true,
            strategy: StrategyKind::MutuallyExclusive,
        },
        _ => WorkflowSettings::default(),
    }
}

fn default_workflows() -> BTreeMap<String, WorkflowSettings> {
    [RECONSTRUCTABLE_TAG, RECONSTRUCTION_TAG]
        .into_iter()
        .map(|tag| (tag.to_string(), builtin_workflow_settings(tag)))
        .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            workflows: default_workflows(),
        }
    }
}

impl Settings {
    /// Settings for a workflow, falling back to the built-in defaults for
    /// workflows the file does not mention.
    pub fn workflow(&self, tag: &WorkflowTag) -> WorkflowSettings {
        self.workflows
            .get(tag.as_str())
            .cloned()
            .unwrap_or_else(|| builtin_workflow_settings(tag.as_str()))
    }

    pub fn set_workflow(&mut self, tag: &WorkflowTag, settings: WorkflowSettings) {
        self.workflows.insert(tag.to_string(), settings);
    }
}
