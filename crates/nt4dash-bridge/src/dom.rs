//! In-process document model.
//!
//! A small element/text tree with the mutation semantics the dashboard page
//! depends on: attribute writes and child insertions/removals produce
//! [`MutationRecord`]s, and observers see them only when the owner runs a
//! checkpoint with [`Document::flush`].
//!
//! The model is single-threaded like the page's event loop; [`Document`] is
//! a cheap `Rc` handle and every clone refers to the same tree.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;
use tracing::trace;

use crate::observer::{MutationRecord, Registry};

/// Identifier of a node inside one [`Document`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors from tree manipulation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("Unknown node {0:?}")]
    UnknownNode(NodeId),
    #[error("Node {0:?} is not an element")]
    NotAnElement(NodeId),
    #[error("Node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("Inserting {child:?} under {parent:?} would create a cycle")]
    HierarchyRequest { parent: NodeId, child: NodeId },
    #[error("Invalid observe options: {0}")]
    InvalidOptions(&'static str),
    #[error("Document has been dropped")]
    Detached,
}

enum NodeData {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
    },
    Text(String),
}

pub(crate) struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

pub(crate) struct Inner {
    nodes: Vec<Node>,
    root: NodeId,
    body: NodeId,
    flushing: bool,
    pub(crate) registry: Registry,
}

impl Inner {
    pub(crate) fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id.0 as usize).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DomError> {
        self.nodes.get_mut(id.0 as usize).ok_or(DomError::UnknownNode(id))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn attributes_mut(&mut self, id: NodeId) -> Result<&mut BTreeMap<String, String>, DomError> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element { attributes, .. } => Ok(attributes),
            NodeData::Text(_) => Err(DomError::NotAnElement(id)),
        }
    }

    /// `id` followed by its ancestors, nearest first.
    fn chain(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut cursor = self.nodes[id.0 as usize].parent;
        while let Some(parent) = cursor {
            chain.push(parent);
            cursor = self.nodes[parent.0 as usize].parent;
        }
        chain
    }

    fn is_connected(&self, id: NodeId) -> bool {
        self.chain(id).last() == Some(&self.root)
    }

    /// `id` and all its descendants, in document order.
    fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next.0 as usize].children.iter().rev());
        }
        out
    }

    /// Hand `record` to interested observers.  Detached targets report
    /// nothing.
    fn queue(&mut self, record: MutationRecord) {
        if !self.is_connected(record.target) {
            return;
        }
        let chain = self.chain(record.target);
        self.registry.enqueue(&chain, &record);
    }

    fn detach(&mut self, parent: NodeId, child: NodeId) {
        let was_connected = self.is_connected(parent);
        self.nodes[parent.0 as usize].children.retain(|c| *c != child);
        self.nodes[child.0 as usize].parent = None;
        self.queue(MutationRecord::child_list(parent, Vec::new(), vec![child]));
        if was_connected {
            let gone = self.subtree(child);
            self.registry.forget_targets(&gone);
        }
    }
}

/// Shared handle to a document tree.
#[derive(Clone)]
pub struct Document {
    inner: Rc<RefCell<Inner>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document with an `<html>` root and an empty `<body>`.
    pub fn new() -> Self {
        let mut inner = Inner {
            nodes: Vec::new(),
            root: NodeId(0),
            body: NodeId(0),
            flushing: false,
            registry: Registry::default(),
        };
        let root = inner.push(NodeData::Element {
            tag: "html".to_string(),
            attributes: BTreeMap::new(),
        });
        let body = inner.push(NodeData::Element {
            tag: "body".to_string(),
            attributes: BTreeMap::new(),
        });
        inner.nodes[root.0 as usize].children.push(body);
        inner.nodes[body.0 as usize].parent = Some(root);
        inner.root = root;
        inner.body = body;
        Self {
            inner: Rc::new(RefCell::new(inner)),
        }
    }

    pub(crate) fn inner(&self) -> &Rc<RefCell<Inner>> {
        &self.inner
    }

    pub fn root(&self) -> NodeId {
        self.inner.borrow().root
    }

    pub fn body(&self) -> NodeId {
        self.inner.borrow().body
    }

    /// Create a detached element.
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.inner.borrow_mut().push(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: BTreeMap::new(),
        })
    }

    /// Create a detached text node.
    pub fn create_text_node(&self, text: &str) -> NodeId {
        self.inner.borrow_mut().push(NodeData::Text(text.to_string()))
    }

    /// Append `child` as the last child of `parent`, moving it out of its
    /// current parent first.
    ///
    /// # Errors
    ///
    /// [`DomError::NotAnElement`] if `parent` is a text node,
    /// [`DomError::HierarchyRequest`] if `child` is `parent` or one of its
    /// ancestors.
    pub fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        inner.node(child)?;
        if let NodeData::Text(_) = inner.node(parent)?.data {
            return Err(DomError::NotAnElement(parent));
        }
        if inner.chain(parent).contains(&child) {
            return Err(DomError::HierarchyRequest { parent, child });
        }
        if let Some(old_parent) = inner.nodes[child.0 as usize].parent {
            inner.detach(old_parent, child);
        }
        inner.nodes[parent.0 as usize].children.push(child);
        inner.nodes[child.0 as usize].parent = Some(parent);
        inner.queue(MutationRecord::child_list(parent, vec![child], Vec::new()));
        trace!(parent = ?parent, child = ?child, "append_child");
        Ok(())
    }

    /// Remove `child` from `parent`.
    ///
    /// Observers registered on `child` or anything beneath it stop
    /// receiving records once it leaves the document.
    pub fn remove_child(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        inner.node(parent)?;
        if inner.node(child)?.parent != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        inner.detach(parent, child);
        trace!(parent = ?parent, child = ?child, "remove_child");
        Ok(())
    }

    /// Remove `node` from its parent, if it has one.
    pub fn remove(&self, node: NodeId) -> Result<(), DomError> {
        let parent = self.parent(node)?;
        match parent {
            Some(parent) => self.remove_child(parent, node),
            None => Ok(()),
        }
    }

    /// Set an attribute.  A record is produced even when the value does not
    /// change.
    pub fn set_attribute(&self, element: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        let old = inner
            .attributes_mut(element)?
            .insert(name.to_string(), value.to_string());
        inner.queue(MutationRecord::attribute(
            element,
            name,
            old,
            Some(value.to_string()),
        ));
        Ok(())
    }

    /// Remove an attribute.  Removing an absent attribute is a no-op and
    /// produces no record.
    pub fn remove_attribute(&self, element: NodeId, name: &str) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        if let Some(old) = inner.attributes_mut(element)?.remove(name) {
            inner.queue(MutationRecord::attribute(element, name, Some(old), None));
        }
        Ok(())
    }

    pub fn get_attribute(&self, element: NodeId, name: &str) -> Option<String> {
        let inner = self.inner.borrow();
        match &inner.node(element).ok()?.data {
            NodeData::Element { attributes, .. } => attributes.get(name).cloned(),
            NodeData::Text(_) => None,
        }
    }

    /// First connected element, in document order, whose `id` attribute is
    /// `id`.
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        let inner = self.inner.borrow();
        inner.subtree(inner.root).into_iter().find(|n| {
            matches!(
                &inner.nodes[n.0 as usize].data,
                NodeData::Element { attributes, .. } if attributes.get("id").map(String::as_str) == Some(id)
            )
        })
    }

    pub fn parent(&self, node: NodeId) -> Result<Option<NodeId>, DomError> {
        Ok(self.inner.borrow().node(node)?.parent)
    }

    pub fn children(&self, node: NodeId) -> Result<Vec<NodeId>, DomError> {
        Ok(self.inner.borrow().node(node)?.children.clone())
    }

    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        match &self.inner.borrow().node(node).ok()?.data {
            NodeData::Element { tag, .. } => Some(tag.clone()),
            NodeData::Text(_) => None,
        }
    }

    pub fn text(&self, node: NodeId) -> Option<String> {
        match &self.inner.borrow().node(node).ok()?.data {
            NodeData::Text(text) => Some(text.clone()),
            NodeData::Element { .. } => None,
        }
    }

    /// Whether `node` is reachable from the document root.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let inner = self.inner.borrow();
        inner.node(node).is_ok() && inner.is_connected(node)
    }

    /// Deliver queued records to their observers.
    ///
    /// Observers run in creation order, each with all records queued for it
    /// so far.  Records produced by the callbacks themselves are delivered
    /// in a further round before this returns.  Calling `flush` from inside
    /// an observer callback does nothing.
    ///
    /// Returns the number of batches delivered.
    pub fn flush(&self) -> usize {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.flushing {
                return 0;
            }
            inner.flushing = true;
        }

        let mut delivered = 0;
        loop {
            let pending = self.inner.borrow().registry.pending();
            if pending.is_empty() {
                break;
            }
            for id in pending {
                let batch = self.inner.borrow_mut().registry.take(id);
                if let Some((callback, records)) = batch {
                    trace!(records = records.len(), "delivering mutation batch");
                    (&mut *callback.borrow_mut())(records);
                    delivered += 1;
                }
            }
        }

        self.inner.borrow_mut().flushing = false;
        delivered
    }
}
