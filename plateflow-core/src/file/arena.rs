use std::cmp::Ordering;
use std::fmt;

use crate::file::{Classification, File, FileNode, FileNodeActiveState};
use crate::workflow::WorkflowTag;

/// Stable identity of a loaded file.
///
/// Handles are only minted by [`FileNodes`]. A handle to a removed file never
/// aliases a later file because each slot carries a generation counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileHandle {
    index: u32,
    generation: u32,
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}.{}", self.index, self.generation)
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    node: Option<FileNode>,
}

/// Arena owning every loaded [`FileNode`], remembering load order.
#[derive(Debug, Default)]
pub struct FileNodes {
    slots: Vec<Slot>,
    free: Vec<u32>,
    order: Vec<FileHandle>,
}

impl FileNodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, node: FileNode) -> FileHandle {
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.generation = slot.generation.wrapping_add(1);
                slot.node = Some(node);
                FileHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = u32::try_from(self.slots.len()).expect("file arena exhausted");
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                FileHandle {
                    index,
                    generation: 0,
                }
            }
        };
        self.order.push(handle);
        handle
    }

    pub(crate) fn remove(&mut self, handle: FileHandle) -> Option<FileNode> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let node = slot.node.take()?;
        self.free.push(handle.index);
        self.order.retain(|loaded| *loaded != handle);
        Some(node)
    }

    pub fn get(&self, handle: FileHandle) -> Option<&FileNode> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub(crate) fn get_mut(&mut self, handle: FileHandle) -> Option<&mut FileNode> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Like [`get`](Self::get) but for handles the core minted itself; a
    /// stale handle here means the core's own bookkeeping is broken.
    pub(crate) fn node(&self, handle: FileHandle) -> &FileNode {
        match self.get(handle) {
            Some(node) => node,
            None => panic!("{handle} does not refer to a loaded file"),
        }
    }

    pub(crate) fn node_mut(&mut self, handle: FileHandle) -> &mut FileNode {
        match self.get_mut(handle) {
            Some(node) => node,
            None => panic!("{handle} does not refer to a loaded file"),
        }
    }

    pub fn contains(&self, handle: FileHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Panics on a stale handle; see [`node`](Self::node).
    pub(crate) fn loaded_ref(&self, handle: FileHandle) -> FileRef<'_> {
        FileRef {
            handle,
            node: self.node(handle),
        }
    }

    pub fn file_ref(&self, handle: FileHandle) -> Option<FileRef<'_>> {
        self.get(handle).map(|node| FileRef { handle, node })
    }

    pub fn iter(&self) -> LoadedFiles<'_> {
        LoadedFiles {
            handles: self.order.iter(),
            nodes: self,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Read-only view of a loaded file.
///
/// Gives out `&File` and activation flags but never the owned file, so
/// holders can observe a file without extending its lifetime or mutating it.
/// Equality and ordering follow the handle, not the file's content.
#[derive(Clone, Copy)]
pub struct FileRef<'a> {
    handle: FileHandle,
    node: &'a FileNode,
}

impl<'a> FileRef<'a> {
    pub fn handle(&self) -> FileHandle {
        self.handle
    }

    pub fn file(&self) -> &'a File {
        &self.node.file
    }

    pub fn classification(&self) -> &'a Classification {
        &self.node.state.classification
    }

    pub fn active_state(&self) -> &'a FileNodeActiveState {
        &self.node.state.active_state
    }

    pub fn is_attached(&self, tag: &WorkflowTag) -> bool {
        self.active_state().has_workflow_tag(tag)
    }

    /// `false` for workflows that are not attached to the file.
    pub fn is_active(&self, tag: &WorkflowTag) -> bool {
        self.active_state().get(tag).unwrap_or(false)
    }

    pub fn workflow_tags(&self) -> impl Iterator<Item = &'a WorkflowTag> {
        self.node.state.active_state.workflow_tags()
    }
}

impl fmt::Debug for FileRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileRef")
            .field("handle", &self.handle)
            .field("name", &self.node.file.display_name())
            .finish()
    }
}

impl PartialEq for FileRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for FileRef<'_> {}

impl PartialOrd for FileRef<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FileRef<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.handle.cmp(&other.handle)
    }
}

/// Loaded files in load order.
pub struct LoadedFiles<'a> {
    handles: std::slice::Iter<'a, FileHandle>,
    nodes: &'a FileNodes,
}

impl<'a> Iterator for LoadedFiles<'a> {
    type Item = FileRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let handle = *self.handles.next()?;
        Some(self.nodes.loaded_ref(handle))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.handles.size_hint()
    }
}

impl DoubleEndedIterator for LoadedFiles<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let handle = *self.handles.next_back()?;
        Some(self.nodes.loaded_ref(handle))
    }
}

impl ExactSizeIterator for LoadedFiles<'_> {}
