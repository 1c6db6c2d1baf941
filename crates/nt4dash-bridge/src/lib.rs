//! `nt4dash-bridge` – lets dashboard page logic react to state the NT4
//! client module writes into the document.
//!
//! The client module exposes live values in two ways, and this crate has
//! one primitive for each:
//!
//! | Module writes | Primitive | Callback gets |
//! |---|---|---|
//! | `value` attribute on an element | [`watch_value`] | decoded [`BridgeValue`] per write |
//! | children under a container | [`watch_tree`] | each added / removed node |
//!
//! Both sit on a generic [`MutationObserver`] over the in-process
//! [`Document`] model.  With the `web` feature on `wasm32` the [`web`]
//! module provides the same operations against the browser DOM.
//!
//! ```rust
//! use nt4dash_bridge::{Document, watch_value};
//!
//! let doc = Document::new();
//! let gauge = doc.create_element("meter");
//! doc.set_attribute(gauge, "id", "voltage").unwrap();
//! doc.append_child(doc.body(), gauge).unwrap();
//!
//! let _sub = watch_value(&doc, "voltage", |v| println!("{v:?}"));
//! doc.set_attribute(gauge, "value", "12.6").unwrap();
//! doc.flush();
//! ```

pub mod dom;
pub mod observer;
pub mod watch;

#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub mod web;

pub use dom::{Document, DomError, NodeId};
pub use nt4dash_types::BridgeValue;
pub use observer::{MutationKind, MutationObserver, MutationRecord, ObserveOptions};
pub use watch::{
    Subscription, TreeHandlers, VALUE_ATTRIBUTE, values_from_old, watch_tree, watch_value,
};
