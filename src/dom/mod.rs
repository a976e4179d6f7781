//! Document seam.
//!
//! The controller never holds live element references across hooks. It keeps
//! [`NodeId`] handles and re-resolves containers and lists through this trait
//! at the start of each hook, so a host re-render can replace any node
//! without leaving the controller pointing at a detached copy.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub mod memory;

pub use memory::MemoryDom;

/// Opaque handle to an element owned by a [`Dom`] implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Wrap a raw handle minted by a `Dom` implementation.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw handle.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node:{}", self.0)
    }
}

/// Minimal `tag.class` selector.
///
/// Covers the two lookups the controller needs: the nested filter list
/// (`ul.menu`) and the sentinel marker (`.loading-sentinel`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector {
    tag: Option<String>,
    class: Option<String>,
}

impl Selector {
    /// Selector matching a single class.
    pub fn class(class: &str) -> Self {
        Self {
            tag: None,
            class: Some(class.to_string()),
        }
    }

    /// Selector matching `tag.class`.
    pub fn tag_class(tag: &str, class: &str) -> Self {
        Self {
            tag: Some(tag.to_ascii_lowercase()),
            class: Some(class.to_string()),
        }
    }

    /// Whether an element with this tag and these classes matches.
    pub fn matches<'a>(&self, tag: &str, mut classes: impl Iterator<Item = &'a str>) -> bool {
        let tag_ok = self
            .tag
            .as_deref()
            .is_none_or(|wanted| wanted.eq_ignore_ascii_case(tag));
        let class_ok = match self.class.as_deref() {
            Some(wanted) => classes.any(|c| c == wanted),
            None => true,
        };
        tag_ok && class_ok
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tag) = &self.tag {
            f.write_str(tag)?;
        }
        if let Some(class) = &self.class {
            write!(f, ".{class}")?;
        }
        Ok(())
    }
}

/// Failures of document mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// The handle does not name a node of this document.
    #[error("Unknown node {0}")]
    UnknownNode(NodeId),
    /// The append would make a node its own ancestor.
    #[error("Cannot append {child} into its own descendant {parent}")]
    HierarchyRequest {
        /// Intended parent.
        parent: NodeId,
        /// Node being appended.
        child: NodeId,
    },
}

/// Operations the controller performs on the host document.
pub trait Dom {
    /// Connected element with the given `id` attribute.
    fn element_by_id(&self, id: &str) -> Option<NodeId>;

    /// Lower-case tag name, `None` for unknown nodes.
    fn tag_name(&self, node: NodeId) -> Option<String>;

    /// Value of attribute `name`, if set.
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// Set attribute `name`, replacing any previous value.
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    /// Whether `class` is in the node's class list.
    fn has_class(&self, node: NodeId, class: &str) -> bool;

    /// Add (`present == true`) or remove a class.
    fn set_class(&mut self, node: NodeId, class: &str, present: bool);

    /// Set one inline style property.
    fn set_style(&mut self, node: NodeId, property: &str, value: &str);

    /// First descendant of `scope` (excluding `scope`) matching `selector`,
    /// in document order.
    fn query_selector(&self, scope: NodeId, selector: &Selector) -> Option<NodeId>;

    /// Every descendant of `scope` matching `selector`, in document order.
    fn query_selector_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId>;

    /// Create a detached element.
    fn create_element(&mut self, tag: &str) -> NodeId;

    /// Append `child` as the last child of `parent`, moving it if it is
    /// already attached elsewhere.
    fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError>;

    /// Detach `node` from its parent. No-op for detached nodes.
    fn remove(&mut self, node: NodeId);

    /// Parent element, `None` for detached nodes and the root.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Last element child.
    fn last_child(&self, node: NodeId) -> Option<NodeId>;

    /// Whether `node` is `ancestor` or one of its descendants.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }
}
