//! DOM observation for the player page.
//!
//! The page is reached through the [`Dom`] capability. [`Document`] is the
//! in-memory implementation hosts use to mirror the page (and tests use to
//! script it). [`MutationWatcher`] turns batches of [`MutationRecord`]s into
//! per-selector structural events, and [`retry`] provides the bounded wait
//! for the player to appear.

pub mod document;
pub mod error;
pub mod retry;
pub mod selector;
pub mod watcher;

use std::sync::{Arc, Mutex, MutexGuard};

pub use document::{Document, MediaState, MutationRecord, NodeId};
pub use error::DomError;
pub use retry::{poll_until, wait_for_selector, RetryError, RetryPolicy};
pub use selector::Selector;
pub use watcher::{MutationWatcher, ObserveOptions, ObserverId, WatchEvent, WatchEventKind};

/// Ready state at which a media element has data for the current position.
pub const HAVE_CURRENT_DATA: u8 = 2;

/// Read access to a page's element tree.
///
/// Getters return `None` for node ids the implementation doesn't know.
pub trait Dom {
    /// The document node. Selectors are evaluated beneath it.
    fn root(&self) -> NodeId;

    /// Current page URL.
    fn url(&self) -> String;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Child elements in document order.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Lowercase tag name.
    fn tag(&self, node: NodeId) -> Option<String>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// Concatenated text of the node and its descendants.
    fn text_content(&self, node: NodeId) -> Option<String>;

    /// Playback properties, for media elements only.
    fn media(&self, node: NodeId) -> Option<MediaState>;

    /// Drain the mutation records produced since the last call.
    fn take_records(&mut self) -> Vec<MutationRecord>;

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Whether `node` is still attached to the document.
    fn is_connected(&self, node: NodeId) -> bool {
        let root = self.root();
        let mut current = Some(node);
        while let Some(n) = current {
            if n == root {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Descendants of `scope` (excluding `scope`) matching `selector`, in
    /// document order.
    fn query_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId>
    where
        Self: Sized,
    {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            if selector.matches(self, node) {
                found.push(node);
            }
            stack.extend(self.children(node).into_iter().rev());
        }
        found
    }

    fn query(&self, scope: NodeId, selector: &Selector) -> Option<NodeId>
    where
        Self: Sized,
    {
        self.query_all(scope, selector).into_iter().next()
    }
}

/// A page shared between the host (which edits it) and the runtime.
pub type SharedDom<D> = Arc<Mutex<D>>;

/// Lock a shared page, recovering from a poisoned lock.
pub fn lock<D>(dom: &SharedDom<D>) -> MutexGuard<'_, D> {
    dom.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
