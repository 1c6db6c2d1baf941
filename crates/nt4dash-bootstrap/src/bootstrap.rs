//! The single-shot start sequence.

use nt4dash_types::DashError;
use tracing::{error, info};

use crate::module::{ClientModule, ModuleLoader, ModuleSource, fetch_verified};

/// Where a [`Bootstrap`] is in its one-time lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootState {
    Idle,
    Started,
    Failed,
}

/// Fetches, instantiates and starts the NT4 client module, once.
pub struct Bootstrap<S, L> {
    source: S,
    loader: L,
    state: BootState,
    module: Option<Box<dyn ClientModule>>,
}

impl<S: ModuleSource, L: ModuleLoader> Bootstrap<S, L> {
    pub fn new(source: S, loader: L) -> Self {
        Self {
            source,
            loader,
            state: BootState::Idle,
            module: None,
        }
    }

    pub fn state(&self) -> BootState {
        self.state
    }

    /// The running module, after a successful [`Bootstrap::start`].
    pub fn module(&self) -> Option<&dyn ClientModule> {
        self.module.as_deref()
    }

    /// Initialise the module and call its `start(client_name,
    /// target_address)`.
    ///
    /// # Errors
    ///
    /// Whatever the source, header check, loader or module's own start
    /// returns.  There is no retry: after any outcome, further calls fail
    /// with [`DashError::ModuleInit`].
    pub async fn start(&mut self, client_name: &str, target_address: &str) -> Result<(), DashError> {
        if self.state != BootState::Idle {
            return Err(DashError::ModuleInit(format!(
                "bootstrap already ran ({:?})",
                self.state
            )));
        }

        match self.run(client_name, target_address).await {
            Ok(module) => {
                info!(
                    source = %self.source.describe(),
                    client_name,
                    target_address,
                    "client module started"
                );
                self.module = Some(module);
                self.state = BootState::Started;
                Ok(())
            }
            Err(e) => {
                error!(source = %self.source.describe(), error = %e, "client module failed to start");
                self.state = BootState::Failed;
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        client_name: &str,
        target_address: &str,
    ) -> Result<Box<dyn ClientModule>, DashError> {
        let bytes = fetch_verified(&self.source).await?;
        let mut module = self.loader.instantiate(bytes).await?;
        module.start(client_name, target_address).await?;
        Ok(module)
    }
}
