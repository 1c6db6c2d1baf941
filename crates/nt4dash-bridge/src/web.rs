//! Browser backend over `web_sys::MutationObserver`.
//!
//! Same contract as [`crate::watch`], with the browser's own microtask
//! checkpoint standing in for [`crate::Document::flush`].  The JS exports
//! `watchValue` and `watchTree` are what the dashboard page calls.

use std::cell::Cell;

use js_sys::{Array, Function};
use nt4dash_types::{BridgeValue, DashError};
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, MutationObserver, MutationObserverInit, MutationRecord, Node, NodeList};

use crate::watch::{TreeHandlers, VALUE_ATTRIBUTE, values_from_old};

type ObserverCallback = Closure<dyn FnMut(Array, MutationObserver)>;

/// Browser-side subscription handle.
///
/// Dropping it leaves the observer installed.
#[wasm_bindgen]
pub struct WebSubscription {
    observer: Option<MutationObserver>,
    callback: Option<ObserverCallback>,
    target: Option<Element>,
    bound: Cell<bool>,
}

#[wasm_bindgen]
impl WebSubscription {
    pub fn disconnect(&self) {
        if let Some(observer) = &self.observer {
            observer.disconnect();
        }
        self.bound.set(false);
    }

    /// False after `disconnect`, and while the element is outside the
    /// document.  Records made while detached are discarded.
    #[wasm_bindgen(getter, js_name = isBound)]
    pub fn is_bound(&self) -> bool {
        self.bound.get() && self.target.as_ref().is_some_and(|t| t.is_connected())
    }
}

impl WebSubscription {
    fn inert() -> Self {
        Self {
            observer: None,
            callback: None,
            target: None,
            bound: Cell::new(false),
        }
    }
}

impl Drop for WebSubscription {
    fn drop(&mut self) {
        // The observer still calls into the closure after the handle is gone.
        if self.bound.get()
            && let Some(callback) = self.callback.take()
        {
            callback.forget();
        }
    }
}

fn element_by_id(element_id: &str) -> Option<Element> {
    web_sys::window()?.document()?.get_element_by_id(element_id)
}

fn records_of(batch: &Array) -> impl Iterator<Item = MutationRecord> + '_ {
    batch.iter().filter_map(|r| r.dyn_into::<MutationRecord>().ok())
}

fn nodes_of(list: &NodeList) -> impl Iterator<Item = Node> + '_ {
    (0..list.length()).filter_map(|i| list.item(i))
}

fn value_sequence(element: &Element, records: &[MutationRecord]) -> Vec<Option<String>> {
    values_from_old(
        records.iter().map(MutationRecord::old_value),
        element.get_attribute(VALUE_ATTRIBUTE),
    )
}

fn call_js(f: &Function, arg: &JsValue) {
    if let Err(e) = f.call1(&JsValue::NULL, arg) {
        web_sys::console::error_1(&e);
    }
}

fn install(
    element: &Element,
    init: &MutationObserverInit,
    callback: ObserverCallback,
) -> Result<WebSubscription, JsValue> {
    let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;
    observer.observe_with_options(element, init)?;
    Ok(WebSubscription {
        observer: Some(observer),
        callback: Some(callback),
        target: Some(element.clone()),
        bound: Cell::new(true),
    })
}

/// [`crate::watch_value`] against the live page.
pub fn watch_value<F>(element_id: &str, mut callback: F) -> WebSubscription
where
    F: FnMut(Result<BridgeValue, DashError>) + 'static,
{
    let Some(element) = element_by_id(element_id) else {
        debug!(element_id, "watch_value: element not found, subscription is inert");
        return WebSubscription::inert();
    };

    let watched = element.clone();
    let handler: ObserverCallback = Closure::new(move |batch: Array, _: MutationObserver| {
        if !watched.is_connected() {
            return;
        }
        let records: Vec<MutationRecord> = records_of(&batch).collect();
        for raw in value_sequence(&watched, &records) {
            callback(BridgeValue::decode(raw.as_deref()));
        }
    });

    let init = MutationObserverInit::new();
    init.set_attributes(true);
    init.set_attribute_old_value(true);
    init.set_attribute_filter(&Array::of1(&JsValue::from_str(VALUE_ATTRIBUTE)));

    install(&element, &init, handler).unwrap_or_else(|e| {
        warn!(element_id, error = ?e, "could not observe element");
        WebSubscription::inert()
    })
}

/// [`crate::watch_tree`] against the live page.
pub fn watch_tree(element_id: &str, mut handlers: TreeHandlers<Node>) -> WebSubscription {
    let Some(element) = element_by_id(element_id) else {
        debug!(element_id, "watch_tree: element not found, subscription is inert");
        return WebSubscription::inert();
    };

    let watched = element.clone();
    let handler: ObserverCallback = Closure::new(move |batch: Array, _: MutationObserver| {
        if !watched.is_connected() {
            return;
        }
        for record in records_of(&batch) {
            for node in nodes_of(&record.added_nodes()) {
                handlers.added(node);
            }
            for node in nodes_of(&record.removed_nodes()) {
                handlers.removed(node);
            }
        }
    });

    let init = MutationObserverInit::new();
    init.set_child_list(true);

    install(&element, &init, handler).unwrap_or_else(|e| {
        warn!(element_id, error = ?e, "could not observe element");
        WebSubscription::inert()
    })
}

// ---------------------------------------------------------------------------
// JS exports
// ---------------------------------------------------------------------------

fn to_js(value: &BridgeValue) -> JsValue {
    match value {
        BridgeValue::Null => JsValue::NULL,
        BridgeValue::Bool(b) => JsValue::from_bool(*b),
        BridgeValue::Number(n) => JsValue::from_f64(*n),
        BridgeValue::Text(s) => JsValue::from_str(s),
        BridgeValue::Structured(v) => serde_json::to_string(v)
            .ok()
            .and_then(|text| js_sys::JSON::parse(&text).ok())
            .unwrap_or(JsValue::NULL),
    }
}

fn report(on_error: Option<&Function>, error: &DashError) {
    let message = JsValue::from_str(&error.to_string());
    match on_error {
        Some(f) => call_js(f, &message),
        None => web_sys::console::error_1(&message),
    }
}

/// `watchValue(elementId, callback, onError?)`
#[wasm_bindgen(js_name = watchValue)]
pub fn watch_value_js(
    element_id: &str,
    callback: Function,
    on_error: Option<Function>,
) -> WebSubscription {
    watch_value(element_id, move |result| match result {
        Ok(value) => call_js(&callback, &to_js(&value)),
        Err(e) => report(on_error.as_ref(), &e),
    })
}

/// `watchTree(elementId, onAdd?, onRemove?)`
#[wasm_bindgen(js_name = watchTree)]
pub fn watch_tree_js(
    element_id: &str,
    on_add: Option<Function>,
    on_remove: Option<Function>,
) -> WebSubscription {
    let mut handlers = TreeHandlers::new();
    if let Some(f) = on_add {
        handlers = handlers.on_add(move |node: Node| call_js(&f, &node));
    }
    if let Some(f) = on_remove {
        handlers = handlers.on_remove(move |node: Node| call_js(&f, &node));
    }
    watch_tree(element_id, handlers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen_futures::JsFuture;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn mount(tag: &str, id: &str) -> Element {
        let doc = web_sys::window().unwrap().document().unwrap();
        let el = doc.create_element(tag).unwrap();
        el.set_id(id);
        doc.body().unwrap().append_child(&el).unwrap();
        el
    }

    /// Resolves after pending observer callbacks have run.
    async fn checkpoint() {
        JsFuture::from(js_sys::Promise::resolve(&JsValue::NULL))
            .await
            .unwrap();
    }

    type Values = Rc<RefCell<Vec<Result<BridgeValue, DashError>>>>;

    #[wasm_bindgen_test]
    async fn two_writes_reach_callback_in_order() {
        let el = mount("output", "web-battery");
        let values: Values = Rc::default();
        let sink = Rc::clone(&values);
        let sub = watch_value("web-battery", move |v| sink.borrow_mut().push(v));

        el.set_attribute("value", "1").unwrap();
        el.set_attribute("value", "2").unwrap();
        checkpoint().await;

        assert_eq!(
            *values.borrow(),
            vec![Ok(BridgeValue::Number(1.0)), Ok(BridgeValue::Number(2.0))]
        );
        sub.disconnect();
        el.remove();
    }

    #[wasm_bindgen_test]
    async fn detached_target_is_unbound_and_silent() {
        let el = mount("output", "web-detached");
        let values: Values = Rc::default();
        let sink = Rc::clone(&values);
        let sub = watch_value("web-detached", move |v| sink.borrow_mut().push(v));
        assert!(sub.is_bound());

        el.remove();
        assert!(!sub.is_bound());

        el.set_attribute("value", "3").unwrap();
        checkpoint().await;
        assert!(values.borrow().is_empty());
        sub.disconnect();
    }

    #[wasm_bindgen_test]
    fn missing_element_gives_unbound_handle() {
        assert!(!watch_value("web-nowhere", |_| {}).is_bound());
    }

    #[wasm_bindgen_test]
    async fn throwing_tree_handler_keeps_receiving_nodes() {
        let list = mount("ul", "web-alerts");
        let on_add = Function::new_with_args(
            "node",
            "globalThis.nt4dashAdds = (globalThis.nt4dashAdds || 0) + 1; \
             throw new Error('handler failed');",
        );
        let sub = watch_tree_js("web-alerts", Some(on_add), None);

        let doc = web_sys::window().unwrap().document().unwrap();
        for _ in 0..2 {
            list.append_child(&doc.create_element("li").unwrap()).unwrap();
        }
        checkpoint().await;

        let adds = js_sys::Reflect::get(&js_sys::global(), &JsValue::from_str("nt4dashAdds"))
            .unwrap();
        assert_eq!(adds.as_f64(), Some(2.0));
        sub.disconnect();
        list.remove();
    }
}
