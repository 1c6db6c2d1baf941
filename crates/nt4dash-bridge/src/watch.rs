//! The two page-facing primitives: [`watch_value`] and [`watch_tree`].
//!
//! Both look the element up once, at call time.  If it is absent the
//! returned [`Subscription`] is inert: installed, never firing, and not an
//! error.  A subscription stays bound to that one element; once the
//! element leaves the document it stops reporting.

use nt4dash_types::{BridgeValue, DashError};
use tracing::{debug, warn};

use crate::dom::{Document, NodeId};
use crate::observer::{MutationObserver, MutationRecord, ObserveOptions};

/// Attribute the client module writes live values into.
pub const VALUE_ATTRIBUTE: &str = "value";

/// Handle returned by [`watch_value`] and [`watch_tree`].
///
/// Dropping a subscription leaves it installed for the life of the
/// document; call [`Subscription::disconnect`] to stop it.
pub struct Subscription {
    observer: Option<MutationObserver>,
    element_id: String,
    target: Option<NodeId>,
}

impl Subscription {
    fn inert(element_id: &str) -> Self {
        Self {
            observer: None,
            element_id: element_id.to_string(),
            target: None,
        }
    }

    pub fn element_id(&self) -> &str {
        &self.element_id
    }

    /// The node this subscription is bound to, if the element existed.
    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    /// Whether the subscription is still reporting.
    pub fn is_bound(&self) -> bool {
        self.observer.as_ref().is_some_and(MutationObserver::is_observing)
    }

    /// Stop observing and discard anything not yet delivered.
    pub fn disconnect(&self) {
        if let Some(observer) = &self.observer {
            observer.disconnect();
        }
    }
}

/// Decode the new `value` attribute carried by `record`.
fn decode_record(record: &MutationRecord) -> Result<BridgeValue, DashError> {
    BridgeValue::decode(record.new_value.as_deref())
}

/// Call `callback` with the JSON-decoded `value` attribute of `element_id`
/// each time it is written.
///
/// Writes are reported one by one in the order they happened; two writes
/// before a checkpoint produce two calls.  Malformed JSON reaches the
/// callback as [`DashError::Decode`] and the subscription keeps running.
/// Attribute removal is reported as [`BridgeValue::Null`].
pub fn watch_value<F>(doc: &Document, element_id: &str, mut callback: F) -> Subscription
where
    F: FnMut(Result<BridgeValue, DashError>) + 'static,
{
    let Some(target) = doc.get_element_by_id(element_id) else {
        debug!(element_id, "watch_value: element not found, subscription is inert");
        return Subscription::inert(element_id);
    };

    let id = element_id.to_string();
    let observer = MutationObserver::new(doc, move |records| {
        for record in &records {
            let decoded = decode_record(record);
            if let Err(e) = &decoded {
                warn!(element_id = %id, error = %e, "value update could not be decoded");
            }
            callback(decoded);
        }
    });

    bind(observer, target, element_id, ObserveOptions::attribute_filter([VALUE_ATTRIBUTE]))
}

/// Rebuild each write's new value for a batch of attribute records that
/// only carry the value *before* each write (as browsers report them).
///
/// Write `i`'s new value is record `i + 1`'s old value; the last write's is
/// the live attribute.  One output per record, in order.
pub fn values_from_old<I>(old_values: I, live: Option<String>) -> Vec<Option<String>>
where
    I: IntoIterator<Item = Option<String>>,
{
    let mut old = old_values.into_iter();
    if old.next().is_none() {
        return Vec::new();
    }
    let mut values: Vec<Option<String>> = old.collect();
    values.push(live);
    values
}

type NodeHandler<N> = Box<dyn FnMut(N)>;

/// Callbacks for [`watch_tree`].  Either side may be left unset.
pub struct TreeHandlers<N = NodeId> {
    on_add: Option<NodeHandler<N>>,
    on_remove: Option<NodeHandler<N>>,
}

impl<N> Default for TreeHandlers<N> {
    fn default() -> Self {
        Self {
            on_add: None,
            on_remove: None,
        }
    }
}

impl<N> TreeHandlers<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once per inserted child.
    pub fn on_add(mut self, f: impl FnMut(N) + 'static) -> Self {
        self.on_add = Some(Box::new(f));
        self
    }

    /// Called once per removed child.
    pub fn on_remove(mut self, f: impl FnMut(N) + 'static) -> Self {
        self.on_remove = Some(Box::new(f));
        self
    }

    pub(crate) fn added(&mut self, node: N) {
        if let Some(f) = self.on_add.as_mut() {
            f(node);
        }
    }

    pub(crate) fn removed(&mut self, node: N) {
        if let Some(f) = self.on_remove.as_mut() {
            f(node);
        }
    }
}

/// Report direct children inserted into or removed from `element_id`.
///
/// For each record, additions are reported before removals, each in the
/// order the record lists them.
pub fn watch_tree(doc: &Document, element_id: &str, mut handlers: TreeHandlers) -> Subscription {
    let Some(target) = doc.get_element_by_id(element_id) else {
        debug!(element_id, "watch_tree: element not found, subscription is inert");
        return Subscription::inert(element_id);
    };

    let observer = MutationObserver::new(doc, move |records| {
        for record in records {
            for node in record.added_nodes {
                handlers.added(node);
            }
            for node in record.removed_nodes {
                handlers.removed(node);
            }
        }
    });

    bind(observer, target, element_id, ObserveOptions::child_list())
}

fn bind(
    observer: MutationObserver,
    target: NodeId,
    element_id: &str,
    options: ObserveOptions,
) -> Subscription {
    match observer.observe(target, options) {
        Ok(()) => Subscription {
            observer: Some(observer),
            element_id: element_id.to_string(),
            target: Some(target),
        },
        Err(e) => {
            warn!(element_id, error = %e, "could not observe element");
            Subscription::inert(element_id)
        }
    }
}
