use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DomError;
use crate::Dom;

/// Handle to an element in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Playback properties of a media element, as the page reports them.
///
/// Times are in seconds. A zero duration means the element doesn't know it
/// yet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaState {
    pub current_time: f64,
    pub duration: f64,
    pub ready_state: u8,
}

impl Default for MediaState {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            duration: 0.0,
            ready_state: 0,
        }
    }
}

/// One raw change, in the order the page made it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MutationRecord {
    ChildList {
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    Attributes {
        target: NodeId,
        name: String,
    },
    CharacterData {
        target: NodeId,
    },
}

#[derive(Debug, Clone, Default)]
struct NodeData {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    media: Option<MediaState>,
}

/// In-memory element tree that records its own mutations.
///
/// Nodes are never freed; a removed node keeps its id and subtree and can
/// be re-attached. Only edits to connected nodes produce records.
#[derive(Debug, Clone)]
pub struct Document {
    url: String,
    nodes: Vec<NodeData>,
    records: Vec<MutationRecord>,
}

impl Document {
    /// A document at `url` holding an empty `body`.
    pub fn new(url: impl Into<String>) -> Self {
        let mut doc = Self {
            url: url.into(),
            nodes: vec![NodeData {
                tag: "#document".into(),
                ..Default::default()
            }],
            records: Vec::new(),
        };
        let body = doc.create_element("body");
        doc.nodes[body.0].parent = Some(NodeId(0));
        doc.nodes[0].children.push(body);
        doc
    }

    pub fn body(&self) -> NodeId {
        self.nodes[0].children[0]
    }

    /// Create a detached element. `video` and `audio` elements get a
    /// default [`MediaState`].
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let tag = tag.to_ascii_lowercase();
        let media = matches!(tag.as_str(), "video" | "audio").then(MediaState::default);
        self.nodes.push(NodeData {
            tag,
            media,
            ..Default::default()
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Create an element with attributes and append it to `parent`.
    pub fn append_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> Result<NodeId, DomError> {
        let node = self.create_element(tag);
        for (name, value) in attributes {
            self.set_attribute(node, name, value)?;
        }
        self.append_child(parent, node)?;
        Ok(node)
    }

    /// Append `child` to `parent`, detaching it from its old parent first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check(parent)?;
        self.check(child)?;
        if child == self.root() || self.is_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }

        if self.nodes[child.0].parent.is_some() {
            self.remove(child)?;
        }

        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        if self.is_connected(parent) {
            self.records.push(MutationRecord::ChildList {
                target: parent,
                added: vec![child],
                removed: Vec::new(),
            });
        }
        Ok(())
    }

    /// Detach `node` from its parent. Detached nodes are left alone.
    pub fn remove(&mut self, node: NodeId) -> Result<(), DomError> {
        self.check(node)?;
        let Some(parent) = self.nodes[node.0].parent else {
            return Ok(());
        };
        let connected = self.is_connected(parent);

        self.nodes[parent.0].children.retain(|&c| c != node);
        self.nodes[node.0].parent = None;
        if connected {
            self.records.push(MutationRecord::ChildList {
                target: parent,
                added: Vec::new(),
                removed: vec![node],
            });
        }
        Ok(())
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.check(node)?;
        self.nodes[node.0]
            .attributes
            .insert(name.to_string(), value.to_string());
        self.record_attribute(node, name);
        Ok(())
    }

    /// Replace the node's own text.
    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), DomError> {
        self.check(node)?;
        self.nodes[node.0].text = text.to_string();
        if self.is_connected(node) {
            self.records
                .push(MutationRecord::CharacterData { target: node });
        }
        Ok(())
    }

    /// Mutable playback properties of a media element.
    ///
    /// Media properties aren't attributes, so editing them produces no
    /// mutation records.
    pub fn media_mut(&mut self, node: NodeId) -> Option<&mut MediaState> {
        self.nodes.get_mut(node.0)?.media.as_mut()
    }

    fn record_attribute(&mut self, node: NodeId, name: &str) {
        if self.is_connected(node) {
            self.records.push(MutationRecord::Attributes {
                target: node,
                name: name.to_string(),
            });
        }
    }

    fn check(&self, node: NodeId) -> Result<(), DomError> {
        if node.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(DomError::UnknownNode(node))
        }
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.nodes[n.0].parent;
        }
        false
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let data = &self.nodes[node.0];
        out.push_str(&data.text);
        for &child in &data.children {
            self.collect_text(child, out);
        }
    }
}

impl Dom for Document {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn url(&self) -> String {
        self.url.clone()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0)?.parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(node.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn tag(&self, node: NodeId) -> Option<String> {
        self.nodes.get(node.0).map(|n| n.tag.clone())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.nodes.get(node.0)?.attributes.get(name).cloned()
    }

    fn text_content(&self, node: NodeId) -> Option<String> {
        self.check(node).ok()?;
        let mut out = String::new();
        self.collect_text(node, &mut out);
        Some(out)
    }

    fn media(&self, node: NodeId) -> Option<MediaState> {
        self.nodes.get(node.0)?.media
    }

    fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }
}
