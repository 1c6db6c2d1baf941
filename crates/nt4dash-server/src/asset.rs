//! Request path → bytes resolution.
//!
//! [`serve`] is the whole asset contract and does not touch a socket:
//!
//! 1. Embedded resource names are answered from memory.
//! 2. A path ending in `/` gets `index.html` appended.
//! 3. The content type comes from the last dot-delimited segment.
//! 4. The path is resolved under the [`AssetRoot`]; `..` components and
//!    anything whose canonical form escapes the root are rejected.
//! 5. The whole file is read; any failure is a bodiless `404`.

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use nt4dash_types::DashError;
use percent_encoding::percent_decode_str;
use tracing::debug;

use crate::page::{PAGE_CONFIG_PATH, PageConfig};
use crate::{embed, mime};

/// Response status for an asset lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NotFound => 404,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::NotFound => "Not Found",
        }
    }
}

/// A single inbound asset request, normalised from the HTTP request target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    /// Decoded path without query string or fragment.
    pub path: String,
    pub trailing_slash: bool,
}

impl AssetRequest {
    /// Build a request from a raw HTTP request target such as
    /// `/plots/index.html?v=3`.
    pub fn from_target(target: &str) -> Self {
        let raw = target
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let path = percent_decode_str(raw).decode_utf8_lossy().into_owned();
        let path = if path.is_empty() { "/".to_string() } else { path };
        let trailing_slash = path.ends_with('/');
        Self {
            path,
            trailing_slash,
        }
    }

    /// The path actually looked up: `index.html` is appended to directory
    /// requests.
    pub fn effective_path(&self) -> Cow<'_, str> {
        if self.trailing_slash {
            Cow::Owned(format!("{}index.html", self.path))
        } else {
            Cow::Borrowed(&self.path)
        }
    }
}

/// A file read from the asset root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub location: PathBuf,
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

/// Outcome of [`serve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResponse {
    pub status: Status,
    pub content_type: &'static str,
    pub body: Cow<'static, [u8]>,
}

impl AssetResponse {
    fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            content_type: mime::types::PLAIN,
            body: Cow::Borrowed(&[]),
        }
    }
}

/// The fixed directory filesystem-backed requests are resolved against.
#[derive(Debug, Clone)]
pub struct AssetRoot {
    dir: PathBuf,
}

impl AssetRoot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `deploy_dir/subdir`, the conventional dashboard layout.
    pub fn under(deploy_dir: impl AsRef<Path>, subdir: &str) -> Self {
        Self::new(deploy_dir.as_ref().join(subdir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Join `path` onto the root, refusing anything that could climb out.
    ///
    /// Only lexical checks happen here; [`AssetRoot::read`] also verifies
    /// the canonical location so symlinks cannot escape either.
    pub fn join(&self, path: &str) -> Result<PathBuf, DashError> {
        let relative = Path::new(path.trim_start_matches('/'));
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(DashError::AssetNotFound(format!(
                        "{path}: escapes asset root"
                    )));
                }
            }
        }
        Ok(self.dir.join(relative))
    }

    /// Read the whole file behind `path`.
    ///
    /// # Errors
    ///
    /// Every failure (missing file, directory, permission, escaping the
    /// root, absent root) is [`DashError::AssetNotFound`].
    pub async fn read(&self, path: &str) -> Result<ResolvedAsset, DashError> {
        let not_found = |e: std::io::Error| DashError::AssetNotFound(format!("{path}: {e}"));

        let location = self.join(path)?;
        let root = tokio::fs::canonicalize(&self.dir).await.map_err(not_found)?;
        let location = tokio::fs::canonicalize(&location).await.map_err(not_found)?;
        if !location.starts_with(&root) {
            return Err(DashError::AssetNotFound(format!(
                "{path}: resolves outside asset root"
            )));
        }

        let bytes = tokio::fs::read(&location).await.map_err(not_found)?;
        Ok(ResolvedAsset {
            location,
            bytes,
            content_type: mime::from_path(path),
        })
    }
}

/// Resolve `target` to a status, content type, and body.
pub async fn serve(root: &AssetRoot, target: &str) -> AssetResponse {
    let request = AssetRequest::from_target(target);

    if let Some(resource) = embed::lookup(&request.path) {
        return AssetResponse {
            status: Status::Ok,
            content_type: resource.content_type,
            body: Cow::Borrowed(resource.bytes),
        };
    }

    let path = request.effective_path();
    match root.read(&path).await {
        Ok(asset) => AssetResponse {
            status: Status::Ok,
            content_type: asset.content_type,
            body: Cow::Owned(asset.bytes),
        },
        Err(e) => {
            debug!(path = %path, error = %e, "asset lookup failed");
            AssetResponse::not_found()
        }
    }
}

/// [`serve`], answering [`PAGE_CONFIG_PATH`] from `page` first.
pub async fn serve_page(root: &AssetRoot, page: &PageConfig, target: &str) -> AssetResponse {
    if AssetRequest::from_target(target).path == PAGE_CONFIG_PATH {
        return AssetResponse {
            status: Status::Ok,
            content_type: PageConfig::CONTENT_TYPE,
            body: Cow::Owned(page.to_json()),
        };
    }
    serve(root, target).await
}
