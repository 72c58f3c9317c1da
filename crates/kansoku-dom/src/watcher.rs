use std::collections::{HashMap, HashSet};

use crate::document::{MutationRecord, NodeId};
use crate::error::DomError;
use crate::selector::Selector;
use crate::Dom;

/// Handle to a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(usize);

/// What to report about matched nodes beyond adds and removes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    /// Attribute names whose value changes are reported.
    pub attributes: Vec<String>,
    /// Report changes to the matched node's text content.
    pub text: bool,
}

impl ObserveOptions {
    pub fn attributes<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attributes: names.into_iter().map(Into::into).collect(),
            text: false,
        }
    }

    pub fn text() -> Self {
        Self {
            attributes: Vec::new(),
            text: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEventKind {
    Added(NodeId),
    Removed(NodeId),
    AttributeChanged { node: NodeId, name: String },
    /// Text content of a matched node changed.
    Mutation(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub observer: ObserverId,
    pub kind: WatchEventKind,
}

#[derive(Debug)]
struct Observer {
    parent: Option<ObserverId>,
    selector: Selector,
    options: ObserveOptions,
    matches: Vec<NodeId>,
    attributes: HashMap<NodeId, Vec<Option<String>>>,
    texts: HashMap<NodeId, Option<String>>,
}

impl Observer {
    fn snapshot<D: Dom>(&mut self, dom: &D, node: NodeId) {
        let values = self
            .options
            .attributes
            .iter()
            .map(|name| dom.attribute(node, name))
            .collect();
        self.attributes.insert(node, values);
        if self.options.text {
            self.texts.insert(node, dom.text_content(node));
        }
    }

    fn forget(&mut self, node: NodeId) {
        self.attributes.remove(&node);
        self.texts.remove(&node);
    }
}

/// Tree of selector observers over one page.
///
/// A child observer matches beneath every node its parent currently
/// matches, so when an ancestor goes away its descendants are reported
/// removed in the same refresh. Changes are found by diffing against the
/// previous refresh, which makes the result independent of how the page
/// batched its records.
#[derive(Debug, Default)]
pub struct MutationWatcher {
    observers: Vec<Observer>,
}

impl MutationWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer for `selector`, nested under `parent` when given.
    ///
    /// Nothing is matched until the next [`refresh`](Self::refresh).
    pub fn observe(
        &mut self,
        parent: Option<ObserverId>,
        selector: &str,
        options: ObserveOptions,
    ) -> Result<ObserverId, DomError> {
        if let Some(parent) = parent {
            if parent.0 >= self.observers.len() {
                return Err(DomError::UnknownObserver);
            }
        }
        let selector = Selector::parse(selector)?;
        self.observers.push(Observer {
            parent,
            selector,
            options,
            matches: Vec::new(),
            attributes: HashMap::new(),
            texts: HashMap::new(),
        });
        Ok(ObserverId(self.observers.len() - 1))
    }

    /// First current match of an observer.
    pub fn first(&self, id: ObserverId) -> Option<NodeId> {
        self.all(id).first().copied()
    }

    /// Current matches of an observer, in document order per scope.
    pub fn all(&self, id: ObserverId) -> &[NodeId] {
        self.observers
            .get(id.0)
            .map(|o| o.matches.as_slice())
            .unwrap_or_default()
    }

    /// Handle a batch of records. An empty batch changes nothing.
    pub fn process<D: Dom>(&mut self, dom: &D, records: &[MutationRecord]) -> Vec<WatchEvent> {
        if records.is_empty() {
            return Vec::new();
        }
        tracing::trace!(records = records.len(), "Processing mutation batch");
        self.refresh(dom)
    }

    /// Re-evaluate every observer against the page.
    ///
    /// Events come per observer in registration order; within one observer,
    /// removals first, then additions, attribute changes and text changes.
    pub fn refresh<D: Dom>(&mut self, dom: &D) -> Vec<WatchEvent> {
        let mut events = Vec::new();

        for index in 0..self.observers.len() {
            let scopes = match self.observers[index].parent {
                Some(parent) => self.observers[parent.0].matches.clone(),
                None => vec![dom.root()],
            };

            let observer = &mut self.observers[index];
            let id = ObserverId(index);

            let mut seen = HashSet::new();
            let current: Vec<NodeId> = scopes
                .iter()
                .flat_map(|&scope| dom.query_all(scope, &observer.selector))
                .filter(|node| seen.insert(*node))
                .collect();

            let previous = std::mem::replace(&mut observer.matches, current.clone());
            let previous_set: HashSet<NodeId> = previous.iter().copied().collect();

            for &node in previous.iter().filter(|n| !seen.contains(n)) {
                observer.forget(node);
                events.push(WatchEvent {
                    observer: id,
                    kind: WatchEventKind::Removed(node),
                });
            }

            let mut retained = Vec::new();
            for &node in &current {
                if previous_set.contains(&node) {
                    retained.push(node);
                } else {
                    observer.snapshot(dom, node);
                    events.push(WatchEvent {
                        observer: id,
                        kind: WatchEventKind::Added(node),
                    });
                }
            }

            for &node in &retained {
                for (i, name) in observer.options.attributes.iter().enumerate() {
                    let value = dom.attribute(node, name);
                    let Some(slot) = observer
                        .attributes
                        .get_mut(&node)
                        .and_then(|values| values.get_mut(i))
                    else {
                        continue;
                    };
                    if *slot != value {
                        *slot = value;
                        events.push(WatchEvent {
                            observer: id,
                            kind: WatchEventKind::AttributeChanged {
                                node,
                                name: name.clone(),
                            },
                        });
                    }
                }
            }

            if observer.options.text {
                for &node in &retained {
                    let text = dom.text_content(node);
                    let entry = observer.texts.entry(node).or_default();
                    if *entry != text {
                        *entry = text;
                        events.push(WatchEvent {
                            observer: id,
                            kind: WatchEventKind::Mutation(node),
                        });
                    }
                }
            }
        }

        events
    }
}
