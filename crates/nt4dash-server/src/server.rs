//! [`DashboardServer`] – HTTP server for the NT4 dashboard assets.
//!
//! Listens on `0.0.0.0:7070` by default.
//!
//! * `GET` / `HEAD` → [`asset::serve`] (embedded resources, then the asset
//!   root).
//! * Any other method → `405 Method Not Allowed`.
//!
//! Every connection carries exactly one request and is closed after the
//! response.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use nt4dash_types::DashError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::asset::{self, AssetRoot};
use crate::page::PageConfig;

/// Default TCP port for the dashboard server.
pub const DEFAULT_PORT: u16 = 7070;

/// Upper bound on the time a client may take to send its request head.
const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on header lines accepted per request.
const MAX_HEADER_LINES: usize = 100;

/// Upper bound on the size of the request line plus headers.
const MAX_HEAD_BYTES: u64 = 16 * 1024;

// ---------------------------------------------------------------------------
// DashboardServer
// ---------------------------------------------------------------------------

/// Serves the dashboard page, the loader script, and the compiled client
/// module.
///
/// # Example
///
/// ```rust,no_run
/// use nt4dash_server::DashboardServer;
///
/// #[tokio::main]
/// async fn main() {
///     let handle = DashboardServer::new("/home/lvuser/deploy/dashboard")
///         .start()
///         .await
///         .expect("dashboard server failed to bind");
///     tokio::signal::ctrl_c().await.ok();
///     handle.stop().await.ok();
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DashboardServer {
    root: AssetRoot,
    page: PageConfig,
    bind_address: IpAddr,
    port: u16,
}

impl DashboardServer {
    /// Create a server for `asset_root` on `0.0.0.0:`[`DEFAULT_PORT`].
    pub fn new(asset_root: impl Into<PathBuf>) -> Self {
        Self {
            root: AssetRoot::new(asset_root),
            page: PageConfig::default(),
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
        }
    }

    /// Override the listening port (builder-style).  `0` picks a free port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Override the interface to bind (builder-style).
    pub fn with_bind_address(mut self, addr: IpAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Start arguments served to the page at
    /// [`PAGE_CONFIG_PATH`](crate::page::PAGE_CONFIG_PATH).
    pub fn with_page_config(mut self, page: PageConfig) -> Self {
        self.page = page;
        self
    }

    pub fn page_config(&self) -> &PageConfig {
        &self.page
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn asset_root(&self) -> &AssetRoot {
        &self.root
    }

    /// Bind the listener and spawn the accept loop.
    ///
    /// The returned [`ServerHandle`] owns the server's lifetime; call
    /// [`ServerHandle::stop`] to release the socket.
    ///
    /// # Errors
    ///
    /// Returns [`DashError::Bind`] if the TCP listener cannot bind.
    pub async fn start(self) -> Result<ServerHandle, DashError> {
        let addr = SocketAddr::new(self.bind_address, self.port);
        let listener = TcpListener::bind(addr).await.map_err(|e| DashError::Bind {
            addr: addr.to_string(),
            details: e.to_string(),
        })?;
        let local_addr = listener.local_addr()?;

        info!(
            addr = %local_addr,
            asset_root = %self.root.dir().display(),
            "dashboard listening"
        );
        if !self.root.dir().is_dir() {
            warn!(
                asset_root = %self.root.dir().display(),
                "asset root is missing; only embedded resources will be served"
            );
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(accept_loop(
            listener,
            self.root,
            Arc::new(self.page),
            shutdown_rx,
        ));

        Ok(ServerHandle {
            local_addr,
            shutdown: shutdown_tx,
            task,
        })
    }
}

// ---------------------------------------------------------------------------
// ServerHandle
// ---------------------------------------------------------------------------

/// Owned handle to a running [`DashboardServer`].
///
/// Dropping the handle without calling [`ServerHandle::stop`] also shuts the
/// accept loop down, but does not wait for the socket to be released.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// The address the listener is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait until the listening socket is
    /// closed.  Requests already in flight finish on their own tasks.
    ///
    /// # Errors
    ///
    /// Returns [`DashError::Io`] if the accept loop panicked.
    pub async fn stop(self) -> Result<(), DashError> {
        // The loop may already be gone; a closed channel is fine.
        let _ = self.shutdown.send(());
        self.task
            .await
            .map_err(|e| DashError::Io(format!("accept loop terminated abnormally: {e}")))?;
        info!(addr = %self.local_addr, "dashboard stopped");
        Ok(())
    }
}

async fn accept_loop(
    listener: TcpListener,
    root: AssetRoot,
    page: Arc<PageConfig>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let root = root.clone();
                    let page = Arc::clone(&page);
                    let span = info_span!("request", id = %Uuid::new_v4(), peer = %peer);
                    tokio::spawn(
                        async move {
                            if let Err(e) = handle_connection(stream, &root, &page).await {
                                debug!(error = %e, "connection error");
                            }
                        }
                        .instrument(span),
                    );
                }
                Err(e) => {
                    error!(error = %e, "accept error");
                }
            }
        }
    }
    // `listener` drops here, closing the socket.
}

// ---------------------------------------------------------------------------
// Per-connection handler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Head,
    Other,
}

#[derive(Debug, PartialEq, Eq)]
struct RequestHead {
    method: Method,
    target: String,
}

/// Parse `GET /path HTTP/1.1` into a [`RequestHead`].
fn parse_request_line(line: &str) -> Option<RequestHead> {
    let mut parts = line.split_ascii_whitespace();
    let method = match parts.next()? {
        "GET" => Method::Get,
        "HEAD" => Method::Head,
        _ => Method::Other,
    };
    let target = parts.next()?.to_string();
    let version = parts.next()?;
    if !version.starts_with("HTTP/") || parts.next().is_some() {
        return None;
    }
    Some(RequestHead { method, target })
}

/// Read one `\n`-terminated line.  `None` at end of input, which includes
/// running into the head size limit.
async fn read_line_bytes<R>(reader: &mut R) -> Result<Option<Vec<u8>>, DashError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line).await?;
    Ok((line.last() == Some(&b'\n')).then_some(line))
}

/// Read the request line and drain the headers.  `None` means the head was
/// malformed, truncated or too large.
async fn read_request_head<R>(reader: &mut R) -> Result<Option<RequestHead>, DashError>
where
    R: AsyncBufRead + Unpin,
{
    let Some(line) = read_line_bytes(reader).await? else {
        return Ok(None);
    };
    let head = std::str::from_utf8(&line)
        .ok()
        .and_then(|l| parse_request_line(l.trim_end()));

    // Nothing in the headers changes the response.
    for _ in 0..MAX_HEADER_LINES {
        let Some(header) = read_line_bytes(reader).await? else {
            return Ok(None);
        };
        if header.trim_ascii().is_empty() {
            return Ok(head);
        }
    }
    Ok(None)
}

async fn handle_connection(
    mut stream: TcpStream,
    root: &AssetRoot,
    page: &PageConfig,
) -> Result<(), DashError> {
    let head = {
        let mut reader = BufReader::new((&mut stream).take(MAX_HEAD_BYTES));
        tokio::time::timeout(REQUEST_READ_TIMEOUT, read_request_head(&mut reader))
            .await
            .map_err(|_| DashError::Io("timed out reading request head".to_string()))??
    };

    let Some(head) = head else {
        let bytes = render_response(400, "Bad Request", crate::mime::types::PLAIN, &[], &[], false);
        stream.write_all(&bytes).await?;
        stream.shutdown().await?;
        return Ok(());
    };

    let bytes = match head.method {
        Method::Get | Method::Head => {
            let resp = asset::serve_page(root, page, &head.target).await;
            debug!(
                request_target = %head.target,
                status = resp.status.code(),
                content_type = resp.content_type,
                len = resp.body.len(),
                "served"
            );
            render_response(
                resp.status.code(),
                resp.status.reason(),
                resp.content_type,
                &resp.body,
                &[],
                head.method == Method::Head,
            )
        }
        Method::Other => render_response(
            405,
            "Method Not Allowed",
            crate::mime::types::PLAIN,
            &[],
            &[("Allow", "GET, HEAD")],
            false,
        ),
    };

    stream.write_all(&bytes).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Serialise a complete `HTTP/1.1` response.
///
/// For `HEAD` the `Content-Length` still reports the body size but the body
/// itself is omitted.
fn render_response(
    code: u16,
    reason: &str,
    content_type: &str,
    body: &[u8],
    extra_headers: &[(&str, &str)],
    head_only: bool,
) -> Vec<u8> {
    let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT");
    let mut out = format!(
        "HTTP/1.1 {code} {reason}\r\n\
         Content-Type: {content_type}\r\n\
         Content-Length: {}\r\n\
         Date: {date}\r\n\
         Connection: close\r\n",
        body.len()
    );
    for (name, value) in extra_headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str("\r\n");

    let mut bytes = out.into_bytes();
    if !head_only {
        bytes.extend_from_slice(body);
    }
    bytes
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
