//! Capabilities the bootstrap is built from.
//!
//! - [`ModuleSource`] – where the compiled module's bytes come from.
//! - [`ModuleLoader`] – turns verified bytes into a running [`ClientModule`].
//! - [`ClientModule`] – the module's exported start entry point.
//!
//! The NT4 protocol client behind [`ClientModule`] is opaque here; this
//! crate only delivers it its two start arguments.

use async_trait::async_trait;
use nt4dash_types::DashError;

/// `\0asm` followed by binary format version 1.
pub const MODULE_HEADER: [u8; 8] = [0x00, 0x61, 0x73, 0x6d, 0x01, 0x00, 0x00, 0x00];

/// Supplies the compiled module's bytes.
#[async_trait]
pub trait ModuleSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>, DashError>;

    /// Human-readable origin, for logs.
    fn describe(&self) -> String;
}

/// Instantiates a compiled module.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn instantiate(&self, bytes: Vec<u8>) -> Result<Box<dyn ClientModule>, DashError>;
}

/// An instantiated client module.
#[async_trait]
pub trait ClientModule: Send {
    /// Invoke the module's exported `start(clientName, targetAddress)`.
    async fn start(&mut self, client_name: &str, target_address: &str) -> Result<(), DashError>;
}

/// Reject anything that is not a version-1 WebAssembly binary.
pub fn verify_module_header(bytes: &[u8]) -> Result<(), DashError> {
    match bytes.get(..MODULE_HEADER.len()) {
        Some(head) if head == MODULE_HEADER => Ok(()),
        Some(_) => Err(DashError::ModuleInit(
            "binary module has an invalid header".to_string(),
        )),
        None => Err(DashError::ModuleInit(format!(
            "binary module is truncated ({} bytes)",
            bytes.len()
        ))),
    }
}

/// Fetch from `source` and verify the header.
pub async fn fetch_verified(source: &dyn ModuleSource) -> Result<Vec<u8>, DashError> {
    let bytes = source.fetch().await?;
    verify_module_header(&bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_minimal_module() {
        assert!(verify_module_header(&MODULE_HEADER).is_ok());
        assert!(verify_module_header(nt4dash_server::BINARY_MODULE.bytes).is_ok());
    }

    #[test]
    fn rejects_html_error_page() {
        let err = verify_module_header(b"<!DOCTYPE html><html></html>").unwrap_err();
        assert!(matches!(err, DashError::ModuleInit(_)));
    }

    #[test]
    fn rejects_wrong_version() {
        let mut bytes = MODULE_HEADER;
        bytes[4] = 0x02;
        assert!(verify_module_header(&bytes).is_err());
    }

    #[test]
    fn rejects_truncated() {
        let err = verify_module_header(b"\0asm").unwrap_err();
        assert_eq!(
            err,
            DashError::ModuleInit("binary module is truncated (4 bytes)".into())
        );
    }
}
