//! In-memory document used by tests, benchmarks and scenario replay.

use super::{Dom, DomError, NodeId, Selector};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    attributes: BTreeMap<String, String>,
    classes: Vec<String>,
    style: BTreeMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
            classes: Vec::new(),
            style: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Arena-backed element tree.
///
/// Nodes are never freed: a removed node keeps its handle and can be
/// re-appended, which mirrors how a detached browser element survives as
/// long as someone holds a reference to it.
#[derive(Debug, Clone)]
pub struct MemoryDom {
    nodes: Vec<NodeData>,
    body: NodeId,
}

impl MemoryDom {
    /// Empty document with a connected `body` root.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new("body")],
            body: NodeId::from_raw(0),
        }
    }

    /// The document root.
    pub fn body(&self) -> NodeId {
        self.body
    }

    fn node(&self, id: NodeId) -> Option<&NodeData> {
        usize::try_from(id.raw()).ok().and_then(|i| self.nodes.get(i))
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        usize::try_from(id.raw())
            .ok()
            .and_then(|i| self.nodes.get_mut(i))
    }

    /// Create an element with an optional id and append it to `parent`.
    pub fn create_child(&mut self, parent: NodeId, tag: &str, id: Option<&str>) -> NodeId {
        let child = self.create_element(tag);
        if let Some(id) = id {
            self.set_attribute(child, "id", id);
        }
        // A freshly created node cannot be an ancestor of `parent`.
        let _ = self.append_child(parent, child);
        child
    }

    /// Detach every child of `parent` and append `count` fresh `tag` items.
    ///
    /// Models a host re-render that replaces the list content wholesale,
    /// dropping anything the controller appended.
    pub fn replace_children(&mut self, parent: NodeId, tag: &str, count: usize) -> Vec<NodeId> {
        let old = self
            .node_mut(parent)
            .map(|p| std::mem::take(&mut p.children))
            .unwrap_or_default();
        for child in old {
            if let Some(c) = self.node_mut(child) {
                c.parent = None;
            }
        }
        (0..count)
            .map(|_| self.create_child(parent, tag, None))
            .collect()
    }

    /// Children of `node` in order.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Inline style value set through [`Dom::set_style`].
    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        self.node(node)
            .and_then(|n| n.style.get(property))
            .map(String::as_str)
    }

    /// Whether `node` is reachable from the document body.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.contains(self.body, node)
    }

    /// Number of descendants of `scope` matching `selector`.
    pub fn count_matching(&self, scope: NodeId, selector: &Selector) -> usize {
        self.query_selector_all(scope, selector).len()
    }

    /// Number of connected elements matching `selector`.
    pub fn count_in_document(&self, selector: &Selector) -> usize {
        self.count_matching(self.body, selector)
    }

    fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        self.node(node).is_some_and(|n| {
            selector.matches(&n.tag, n.classes.iter().map(String::as_str))
        })
    }

    /// Descendants of `scope` in document order, excluding `scope`.
    fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom for MemoryDom {
    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.body).into_iter().find(|&n| {
            self.node(n)
                .and_then(|d| d.attributes.get("id"))
                .is_some_and(|v| v == id)
        })
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.node(node).map(|n| n.tag.clone())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        let data = self.node(node)?;
        if name == "class" {
            return (!data.classes.is_empty()).then(|| data.classes.join(" "));
        }
        data.attributes.get(name).cloned()
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(data) = self.node_mut(node) else {
            return;
        };
        if name == "class" {
            data.classes = value.split_whitespace().map(str::to_string).collect();
        } else {
            data.attributes.insert(name.to_string(), value.to_string());
        }
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.node(node)
            .is_some_and(|n| n.classes.iter().any(|c| c == class))
    }

    fn set_class(&mut self, node: NodeId, class: &str, present: bool) {
        let Some(data) = self.node_mut(node) else {
            return;
        };
        let has = data.classes.iter().any(|c| c == class);
        if present && !has {
            data.classes.push(class.to_string());
        } else if !present && has {
            data.classes.retain(|c| c != class);
        }
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        if let Some(data) = self.node_mut(node) {
            data.style.insert(property.to_string(), value.to_string());
        }
    }

    fn query_selector(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|&n| self.matches(n, selector))
    }

    fn query_selector_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&n| self.matches(n, selector))
            .collect()
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId::from_raw(self.nodes.len() as u64);
        self.nodes.push(NodeData::new(tag));
        id
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if self.node(parent).is_none() {
            return Err(DomError::UnknownNode(parent));
        }
        if self.node(child).is_none() {
            return Err(DomError::UnknownNode(child));
        }
        if self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }

        self.remove(child);
        if let Some(p) = self.node_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
        Ok(())
    }

    fn remove(&mut self, node: NodeId) {
        let Some(parent) = self.parent(node) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|&c| c != node);
        }
        if let Some(n) = self.node_mut(node) {
            n.parent = None;
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    fn last_child(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.children.last().copied())
    }
}
