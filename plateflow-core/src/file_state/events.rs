use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::activation::ActivationChanges;
use crate::file::FileHandle;
use crate::workflow::WorkflowTag;

/// Everything observers of a [`FileState`](crate::file_state::FileState) can see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStateEvent {
    WorkflowRegistered {
        tag: WorkflowTag,
    },
    WorkflowUnregistered {
        tag: WorkflowTag,
    },
    BeginAddFiles {
        count: usize,
    },
    FileAdded {
        file: FileHandle,
        name: String,
    },
    EndAddFiles {
        files: Vec<FileHandle>,
    },
    FileAboutToBeRemoved {
        file: FileHandle,
    },
    FileRemoved {
        file: FileHandle,
    },
    FileChanged {
        file: FileHandle,
    },
    ActivationChanged {
        file: FileHandle,
        tag: WorkflowTag,
        active: bool,
    },
}

impl fmt::Display for FileStateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStateEvent::WorkflowRegistered { tag } => write!(f, "workflow registered: {tag}"),
            FileStateEvent::WorkflowUnregistered { tag } => {
                write!(f, "workflow unregistered: {tag}")
            }
            FileStateEvent::BeginAddFiles { count } => write!(f, "begin adding {count} file(s)"),
            FileStateEvent::FileAdded { file, name } => write!(f, "added {file} ({name})"),
            FileStateEvent::EndAddFiles { files } => write!(f, "end adding {} file(s)", files.len()),
            FileStateEvent::FileAboutToBeRemoved { file } => write!(f, "removing {file}"),
            FileStateEvent::FileRemoved { file } => write!(f, "removed {file}"),
            FileStateEvent::FileChanged { file } => write!(f, "changed {file}"),
            FileStateEvent::ActivationChanged { file, tag, active } => {
                let state = if *active { "active" } else { "inactive" };
                write!(f, "{file} is now {state} in {tag}")
            }
        }
    }
}

/// Publishes file state events to a channel and keeps a history of them.
/// Sending never blocks and never fails; a dropped receiver just stops
/// receiving.
#[derive(Clone)]
pub struct EventSender {
    event_tx: mpsc::UnboundedSender<FileStateEvent>,
    event_history: Arc<Mutex<Vec<FileStateEvent>>>,
}

impl EventSender {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FileStateEvent>) {
        let (event_tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                event_tx,
                event_history: Arc::new(Mutex::new(Vec::new())),
            },
            rx,
        )
    }

    pub fn send(&self, event: FileStateEvent) {
        self.event_history.lock().unwrap().push(event.clone());
        let _ = self.event_tx.send(event);
    }

    pub fn send_activation_changes(&self, changes: &ActivationChanges) {
        for (tag, changes) in changes.iter() {
            for change in changes {
                self.send(FileStateEvent::ActivationChanged {
                    file: change.file,
                    tag: tag.clone(),
                    active: change.active,
                });
            }
        }
    }

    pub fn event_history(&self) -> Vec<FileStateEvent> {
        self.event_history.lock().unwrap().clone()
    }

    pub fn clear_history(&self) {
        self.event_history.lock().unwrap().clear();
    }
}
