//! The blocking dispatcher.
//!
//! [`Server`] owns the accept loop and wires the pipeline together:
//! decoder -> router -> handler -> response serialization. The serving
//! model is strictly synchronous: one connection is accepted, fully read,
//! parsed, routed, handled and responded to before the next accept, and
//! every response closes the connection.

use std::io;
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, ToSocketAddrs};
use std::path::PathBuf;
use std::time::SystemTime;

use bytes::Bytes;
use thiserror::Error;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use hfs_http::codec::RequestDecoder;
use hfs_http::protocol::{HttpVersion, Request, Response, StatusCode};

use crate::render::RenderContext;
use crate::router::{Resolution, Router};
use crate::static_files::{StaticDir, etag};

/// Server name written into the `Server` response header.
pub const SERVER_NAME: &str = "hfs";

/// Size of the per-connection read buffer; a request head that does not
/// fit is answered 400.
const READ_BUF_SIZE: usize = 8 * 1024;

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("router must be set")]
    MissingRouter,
    #[error("address must be set")]
    MissingAddress,
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

#[derive(Debug)]
pub struct ServerBuilder {
    address: Vec<SocketAddr>,
    router: Option<Router>,
    static_dir: Option<PathBuf>,
    render: Option<RenderContext>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { address: Vec::new(), router: None, static_dir: None, render: None }
    }

    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        self.address = address.to_socket_addrs().map(Iterator::collect).unwrap_or_default();
        self
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    pub fn static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    pub fn render_context(mut self, render: RenderContext) -> Self {
        self.render = Some(render);
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let router = self.router.ok_or(ServerBuildError::MissingRouter)?;
        if self.address.is_empty() {
            return Err(ServerBuildError::MissingAddress);
        }

        Ok(Server {
            address: self.address,
            decoder: RequestDecoder::new(),
            router,
            static_dir: self.static_dir.map(StaticDir::new),
            render: self.render.unwrap_or_default(),
        })
    }
}

/// The HTTP server: router, render environment and static directory are
/// all fixed at build time, so serving needs no further configuration or
/// synchronization.
#[derive(Debug)]
pub struct Server {
    address: Vec<SocketAddr>,
    decoder: RequestDecoder,
    router: Router,
    static_dir: Option<StaticDir>,
    render: RenderContext,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Binds the listener and serves forever.
    pub fn run(&self) -> io::Result<()> {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
        tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

        info!(address = ?self.address, "start listening");
        let listener = TcpListener::bind(self.address.as_slice())?;

        // one connection is fully served and closed before the next accept
        loop {
            let (mut stream, remote_addr) = match listener.accept() {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            info!(%remote_addr, "accepted connection");
            if let Err(e) = self.serve_connection(&mut stream) {
                error!(cause = %e, "serve connection error");
            }

            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    /// Serves exactly one request read from `stream` and writes the
    /// response back to it.
    pub fn serve_connection<S: Read + Write>(&self, stream: &mut S) -> Result<(), ServerError> {
        let head = read_head(stream)?;

        let head_bytes = match head.body_offset {
            Some(offset) => &head.buf[..offset],
            None => &head.buf[..],
        };

        let (mut request, parse_error) = self.decoder.decode_detailed(head_bytes);
        let mut failure = parse_error.map(|e| e.to_string());

        if head.overflowed {
            request.downgrade(StatusCode::BadRequest);
            failure.get_or_insert_with(|| format!("request head exceeds the buffer size limit ({READ_BUF_SIZE})"));
        }

        // the head buffer may already hold part of the body; read the rest
        // up to Content-Length, accepting a short body on EOF
        if request.status().is_ok() && request.method().is_some_and(|m| m.has_body()) {
            match request.content_length() {
                Ok(content_length) => {
                    let prefix = head.body_offset.map(|offset| &head.buf[offset..]).unwrap_or_default();
                    request.set_body(read_body(stream, prefix, content_length)?);
                }
                Err(e) => {
                    request.downgrade(e.status());
                    failure = Some(e.to_string());
                }
            }
        }

        let mut response = Response::new();

        if request.status().is_ok() {
            match self.router.resolve(&mut request) {
                Resolution::Handler(handler) => {
                    if let Err(e) = handler(&request, &mut response) {
                        if response.current_status().is_ok() {
                            response.status(StatusCode::InternalServerError);
                        }
                        failure = Some(e.to_string());
                    }
                }

                Resolution::MethodMissing => {
                    response.status(StatusCode::NotImplemented);
                    failure = Some(format!(
                        "request is valid but the handler '{}' at resource '{}' is not implemented",
                        request.method().map(|m| m.as_str()).unwrap_or_default(),
                        request.path(),
                    ));
                }

                Resolution::NoRoute => {
                    if let Err(reason) = self.serve_static(&request, &mut response) {
                        failure = Some(reason);
                    }
                }
            }
        }

        if let Some(reason) = &failure {
            self.handle_error(&request, &mut response, reason);
        }

        response
            .header("Server", format!("{SERVER_NAME}/{}", HttpVersion::Http11))
            .header("Connection", "close")
            .header("X-Request-ID", request.id().to_string());

        stream.write_all(&response.serialize())?;
        stream.flush()?;

        info!(request_id = %request.id(), status = %response.current_status(), path = request.path(), "request served");
        Ok(())
    }

    /// Falls back to the static directory when no route matched. On
    /// failure returns the reason for the error-handler path.
    fn serve_static(&self, request: &Request, response: &mut Response) -> Result<(), String> {
        let loaded = match &self.static_dir {
            Some(static_dir) => static_dir.load(request.path()),
            None => Ok(None),
        };

        match loaded {
            Ok(Some(file)) => {
                response
                    .status(StatusCode::Ok)
                    .header("Content-Type", file.mime.to_string())
                    .header("Cache-Control", "public, max-age=31536000")
                    .header("Last-Modified", httpdate::fmt_http_date(file.modified))
                    .header("ETag", file.etag)
                    .body(file.content);
                Ok(())
            }
            Ok(None) => {
                response.status(StatusCode::NotFound);
                Err(format!("path not found: {}", request.path()))
            }
            Err(e) => {
                response.status(StatusCode::InternalServerError);
                Err(format!("can't read static file: {e}"))
            }
        }
    }

    /// Resolves and invokes the error handler for the response's status.
    ///
    /// A parse failure recorded on the request takes precedence; a handler
    /// failure that left the response at OK is forced to 500 before
    /// resolution, so the invariant "error handlers always see an error
    /// status" holds.
    fn handle_error(&self, request: &Request, response: &mut Response, reason: &str) {
        if !request.status().is_ok() {
            response.status(request.status());
        } else if response.current_status().is_ok() {
            response.status(StatusCode::InternalServerError);
        }

        let status = response.current_status();
        warn!(request_id = %request.id(), status = %status, reason, "handling request error");

        match self.router.resolve_error_handler(request.path_segments(), status) {
            Some(handler) => handler(status, reason, request, response),
            None => self.default_error_page(status, reason, response),
        }
    }

    /// The process-wide default error handler: a generic status page.
    fn default_error_page(&self, status: StatusCode, reason: &str, response: &mut Response) {
        let body = self.render.error_page(status, reason);

        response
            .status(status)
            .header("Content-Type", "text/html; charset=utf-8")
            .header("Cache-Control", "no-cache, no-store, must-revalidate")
            .header("Pragma", "no-cache")
            .header("Expires", "-1")
            .header("ETag", format!("W/{}", etag(SystemTime::now(), body.len())))
            .body(body);
    }
}

struct HeadRead {
    buf: Vec<u8>,
    /// Offset just past the `\r\n\r\n` terminator, when one was found.
    body_offset: Option<usize>,
    /// The buffer filled up before the head terminator appeared.
    overflowed: bool,
}

/// Reads from the stream until the end of the header section, EOF, or a
/// full buffer.
fn read_head(stream: &mut impl Read) -> io::Result<HeadRead> {
    let mut buf = vec![0u8; READ_BUF_SIZE];
    let mut total = 0;

    loop {
        if total == buf.len() {
            return Ok(HeadRead { buf, body_offset: None, overflowed: true });
        }

        let n = stream.read(&mut buf[total..])?;
        if n == 0 {
            buf.truncate(total);
            return Ok(HeadRead { buf, body_offset: None, overflowed: false });
        }
        total += n;

        if let Some(idx) = find_head_end(&buf[..total]) {
            buf.truncate(total);
            return Ok(HeadRead { buf, body_offset: Some(idx + 4), overflowed: false });
        }
    }
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Reads the request body: `prefix` bytes already pulled in with the head,
/// then up to `content_length` in total from the stream. EOF before the
/// declared length yields the bytes actually received, not an error.
fn read_body(stream: &mut impl Read, prefix: &[u8], content_length: usize) -> io::Result<Bytes> {
    // the declared length is client-controlled; pre-allocate at most one
    // buffer's worth and let the vec grow with the bytes that actually arrive
    let mut body = Vec::with_capacity(content_length.min(READ_BUF_SIZE));
    body.extend_from_slice(&prefix[..prefix.len().min(content_length)]);

    let mut chunk = [0u8; READ_BUF_SIZE];
    while body.len() < content_length {
        let want = (content_length - body.len()).min(chunk.len());
        let n = stream.read(&mut chunk[..want])?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Ok(Bytes::from(body))
}
