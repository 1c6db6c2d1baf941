//! Generic mutation observation over a [`Document`].
//!
//! Mirrors the browser facility the page relies on:
//!
//! * a [`MutationObserver`] registers interest in one or more nodes with
//!   [`ObserveOptions`];
//! * every qualifying DOM change appends a [`MutationRecord`] to that
//!   observer's queue, in the order the changes happened;
//! * queues are handed to the observer callbacks only at a checkpoint
//!   ([`Document::flush`]), never synchronously inside the mutating call.
//!
//! Registrations on a node are dropped when the node leaves the document.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::dom::{Document, DomError, Inner, NodeId};

/// What kind of change a [`MutationRecord`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Attributes,
    ChildList,
}

/// One observed DOM change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    /// Element whose attribute changed, or parent whose children changed.
    pub target: NodeId,
    pub attribute_name: Option<String>,
    /// Attribute value before this change (`None` if it was absent).
    pub old_value: Option<String>,
    /// Attribute value right after this change (`None` if removed).
    pub new_value: Option<String>,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
}

impl MutationRecord {
    pub(crate) fn attribute(
        target: NodeId,
        name: &str,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        Self {
            kind: MutationKind::Attributes,
            target,
            attribute_name: Some(name.to_string()),
            old_value,
            new_value,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
        }
    }

    pub(crate) fn child_list(target: NodeId, added: Vec<NodeId>, removed: Vec<NodeId>) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target,
            attribute_name: None,
            old_value: None,
            new_value: None,
            added_nodes: added,
            removed_nodes: removed,
        }
    }
}

/// Which changes an observer wants to hear about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    pub attributes: bool,
    pub child_list: bool,
    /// Also report changes on descendants of the target.
    pub subtree: bool,
    /// Restrict attribute records to these names.
    pub attribute_filter: Option<Vec<String>>,
}

impl ObserveOptions {
    /// Attribute changes on the target only, limited to `names`.
    pub fn attribute_filter<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attributes: true,
            attribute_filter: Some(names.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Direct child insertions and removals on the target only.
    pub fn child_list() -> Self {
        Self {
            child_list: true,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), DomError> {
        if self.attribute_filter.is_some() && !self.attributes {
            return Err(DomError::InvalidOptions(
                "attribute_filter requires attributes",
            ));
        }
        if !self.attributes && !self.child_list {
            return Err(DomError::InvalidOptions(
                "one of attributes or child_list must be set",
            ));
        }
        Ok(())
    }

    fn accepts(&self, record: &MutationRecord) -> bool {
        match record.kind {
            MutationKind::ChildList => self.child_list,
            MutationKind::Attributes => {
                self.attributes
                    && match (&self.attribute_filter, &record.attribute_name) {
                        (None, _) => true,
                        (Some(filter), Some(name)) => filter.iter().any(|f| f == name),
                        (Some(_), None) => false,
                    }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Registry (lives inside the document)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct ObserverId(u64);

type Callback = Rc<RefCell<dyn FnMut(Vec<MutationRecord>)>>;

struct Slot {
    callback: Callback,
    targets: Vec<(NodeId, ObserveOptions)>,
    queue: Vec<MutationRecord>,
}

/// Per-document observer bookkeeping.  Observers are kept in creation
/// order, which is also their delivery order.
#[derive(Default)]
pub(crate) struct Registry {
    next_id: u64,
    observers: BTreeMap<ObserverId, Slot>,
}

impl Registry {
    fn register(&mut self, callback: Callback) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.insert(
            id,
            Slot {
                callback,
                targets: Vec::new(),
                queue: Vec::new(),
            },
        );
        id
    }

    /// Queue `record` for every observer interested in it.  `chain` is the
    /// target followed by its ancestors, nearest first.
    pub(crate) fn enqueue(&mut self, chain: &[NodeId], record: &MutationRecord) {
        for slot in self.observers.values_mut() {
            let interested = slot.targets.iter().any(|(target, opts)| {
                match chain.iter().position(|n| n == target) {
                    Some(0) => opts.accepts(record),
                    Some(_) => opts.subtree && opts.accepts(record),
                    None => false,
                }
            });
            if interested {
                slot.queue.push(record.clone());
            }
        }
    }

    /// Drop registrations whose target is one of `nodes`.
    pub(crate) fn forget_targets(&mut self, nodes: &[NodeId]) {
        for slot in self.observers.values_mut() {
            slot.targets.retain(|(target, _)| !nodes.contains(target));
        }
    }

    pub(crate) fn pending(&self) -> Vec<ObserverId> {
        self.observers
            .iter()
            .filter(|(_, slot)| !slot.queue.is_empty())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Empty `id`'s queue and hand back its callback with the records.
    pub(crate) fn take(&mut self, id: ObserverId) -> Option<(Callback, Vec<MutationRecord>)> {
        let slot = self.observers.get_mut(&id)?;
        if slot.queue.is_empty() {
            return None;
        }
        Some((Rc::clone(&slot.callback), std::mem::take(&mut slot.queue)))
    }
}

// ---------------------------------------------------------------------------
// MutationObserver
// ---------------------------------------------------------------------------

/// Handle to one observer registered with a [`Document`].
///
/// Dropping the handle does not stop observation; call
/// [`MutationObserver::disconnect`].
pub struct MutationObserver {
    id: ObserverId,
    doc: Weak<RefCell<Inner>>,
}

impl MutationObserver {
    /// Create an observer whose `callback` receives each delivered batch.
    pub fn new<F>(doc: &Document, callback: F) -> Self
    where
        F: FnMut(Vec<MutationRecord>) + 'static,
    {
        let callback: Callback = Rc::new(RefCell::new(callback));
        let id = doc.inner().borrow_mut().registry.register(callback);
        Self {
            id,
            doc: Rc::downgrade(doc.inner()),
        }
    }

    /// Start observing `target`.  Observing the same target again replaces
    /// its options.
    ///
    /// # Errors
    ///
    /// [`DomError::InvalidOptions`] for an empty or inconsistent option set,
    /// [`DomError::UnknownNode`] if `target` does not exist, and
    /// [`DomError::Detached`] if the document is gone.
    pub fn observe(&self, target: NodeId, options: ObserveOptions) -> Result<(), DomError> {
        options.validate()?;
        let doc = self.doc.upgrade().ok_or(DomError::Detached)?;
        let mut inner = doc.borrow_mut();
        inner.node(target)?;
        let slot = inner
            .registry
            .observers
            .get_mut(&self.id)
            .ok_or(DomError::Detached)?;
        slot.targets.retain(|(t, _)| *t != target);
        slot.targets.push((target, options));
        trace!(observer = self.id.0, target = ?target, "observe");
        Ok(())
    }

    /// Stop observing every target and discard undelivered records.
    pub fn disconnect(&self) {
        let Some(doc) = self.doc.upgrade() else {
            return;
        };
        let mut inner = doc.borrow_mut();
        if let Some(slot) = inner.registry.observers.get_mut(&self.id) {
            slot.targets.clear();
            slot.queue.clear();
        }
    }

    /// Remove and return the undelivered records without invoking the
    /// callback.
    pub fn take_records(&self) -> Vec<MutationRecord> {
        let Some(doc) = self.doc.upgrade() else {
            return Vec::new();
        };
        let mut inner = doc.borrow_mut();
        inner
            .registry
            .observers
            .get_mut(&self.id)
            .map(|slot| std::mem::take(&mut slot.queue))
            .unwrap_or_default()
    }

    /// Whether the observer currently watches at least one node.
    pub fn is_observing(&self) -> bool {
        let Some(doc) = self.doc.upgrade() else {
            return false;
        };
        let inner = doc.borrow();
        inner
            .registry
            .observers
            .get(&self.id)
            .is_some_and(|slot| !slot.targets.is_empty())
    }
}
