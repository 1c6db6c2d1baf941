//! `nt4dash-server` – asset server for the browser-hosted NT4 dashboard.
//!
//! Boots a small HTTP server (default port `7070`) that:
//!
//! 1. **Embeds** the NT4 loader script (`/nt4.js`) and the compiled client
//!    module (`/nt4_wasm_bg.wasm`) in the binary, so both are served even
//!    when the dashboard directory is missing.
//!
//! 2. **Serves** every other path from a fixed asset root (conventionally
//!    `<deploy>/dashboard`), typed by extension, with `index.html` appended
//!    to directory requests.
//!
//! 3. **Answers** `/nt4dash-config.json` with the client name and NT4
//!    server address the page should start the module with.
//!
//! 4. **Collapses** every read failure into a bodiless `404`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use nt4dash_server::DashboardServer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let handle = DashboardServer::new("deploy/dashboard")
//!         .with_port(7070)
//!         .start()
//!         .await
//!         .expect("dashboard server failed");
//!     println!("listening on {}", handle.local_addr());
//!     handle.stop().await.expect("clean stop");
//! }
//! ```

pub mod asset;
pub mod embed;
pub mod mime;
pub mod page;
pub mod server;

pub use asset::{AssetRequest, AssetResponse, AssetRoot, ResolvedAsset, Status, serve, serve_page};
pub use embed::{BINARY_MODULE, EmbeddedResource, LOADER_SCRIPT};
pub use page::{BRIDGE_GLUE_PATH, PAGE_CONFIG_PATH, PageConfig};
pub use server::{DEFAULT_PORT, DashboardServer, ServerHandle};
