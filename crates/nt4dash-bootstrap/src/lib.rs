//! `nt4dash-bootstrap` – brings up the compiled NT4 client module.
//!
//! One asynchronous call per page load:
//!
//! 1. fetch the binary module from a [`ModuleSource`];
//! 2. reject it unless it carries the WebAssembly header;
//! 3. instantiate it through a [`ModuleLoader`];
//! 4. call the module's `start(client_name, target_address)`.
//!
//! Any failure is returned to the caller and is final for that
//! [`Bootstrap`].  Reconnecting to the NT4 server is the module's own
//! business.
//!
//! # Example
//!
//! ```rust,no_run
//! # use nt4dash_bootstrap::{Bootstrap, HttpModuleSource, ModuleLoader};
//! # async fn demo(loader: impl ModuleLoader) -> Result<(), nt4dash_types::DashError> {
//! let source = HttpModuleSource::new("http://10.12.34.2:7070");
//! let mut boot = Bootstrap::new(source, loader);
//! boot.start("dashboard", "10.12.34.2").await?;
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod module;
pub mod source;

pub use bootstrap::{BootState, Bootstrap};
pub use module::{
    ClientModule, MODULE_HEADER, ModuleLoader, ModuleSource, fetch_verified, verify_module_header,
};
pub use source::{HttpModuleSource, StaticModuleSource};
