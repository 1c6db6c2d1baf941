//! Start arguments handed to the dashboard page.
//!
//! The page fetches [`PAGE_CONFIG_PATH`] before starting the client module
//! and passes the two values to its `start(clientName, targetAddress)`.
//!
//! It then loads the DOM bridge from [`BRIDGE_GLUE_PATH`] under the asset
//! root.  That glue is build output, produced with
//!
//! ```text
//! wasm-pack build crates/nt4dash-bridge --target web \
//!     --out-dir ../../dashboard/bridge --out-name nt4dash_bridge -- --features web
//! ```

use serde::{Deserialize, Serialize};

use crate::mime::types;

/// Request path the page config is served under.
pub const PAGE_CONFIG_PATH: &str = "/nt4dash-config.json";

/// Request path of the bridge's generated JS glue.
pub const BRIDGE_GLUE_PATH: &str = "/bridge/nt4dash_bridge.js";

/// What the page should start the client module with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageConfig {
    pub client_name: String,
    pub target_address: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            client_name: "nt4dash".to_string(),
            target_address: "localhost".to_string(),
        }
    }
}

impl PageConfig {
    pub fn new(client_name: impl Into<String>, target_address: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            target_address: target_address.into(),
        }
    }

    pub const CONTENT_TYPE: &'static str = types::JSON;

    /// JSON body served at [`PAGE_CONFIG_PATH`].
    pub fn to_json(&self) -> Vec<u8> {
        // Two string fields; serialisation cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialises_with_page_field_names() {
        let cfg = PageConfig::new("driver-station", "10.12.34.2");
        let value: serde_json::Value = serde_json::from_slice(&cfg.to_json()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"clientName": "driver-station", "targetAddress": "10.12.34.2"})
        );
    }

    #[test]
    fn escapes_awkward_names() {
        let cfg = PageConfig::new("a\"b", "host</script>");
        let back: PageConfig = serde_json::from_slice(&cfg.to_json()).unwrap();
        assert_eq!(back, cfg);
    }

    const DASHBOARD_PAGE: &str = include_str!("../../../dashboard/index.html");

    #[test]
    fn dashboard_page_starts_with_served_settings() {
        assert!(DASHBOARD_PAGE.contains(&format!("fetch(\"{PAGE_CONFIG_PATH}\")")));
        assert!(DASHBOARD_PAGE.contains("page.clientName"));
        assert!(DASHBOARD_PAGE.contains("page.targetAddress"));
        assert!(DASHBOARD_PAGE.contains("await start(client, target)"));
    }

    #[test]
    fn dashboard_page_subscribes_after_start() {
        let started = DASHBOARD_PAGE.find("await start(").expect("start call");
        let glue = DASHBOARD_PAGE
            .find(&format!("import(\"{BRIDGE_GLUE_PATH}\")"))
            .expect("bridge import");
        let battery = DASHBOARD_PAGE.find("watchValue(\"battery\"").expect("battery watch");
        let alerts = DASHBOARD_PAGE.find("watchTree(").expect("alerts watch");

        assert!(started < glue && glue < battery && glue < alerts);
        assert!(DASHBOARD_PAGE[alerts..].starts_with("watchTree(\n      \"alerts\""));
        assert!(DASHBOARD_PAGE.contains("id=\"battery\""));
        assert!(DASHBOARD_PAGE.contains("id=\"alerts\""));
    }
}
