//! A from-scratch HTTP/1.1 web server
//!
//! This crate wires the protocol core from `hfs-http` into a complete,
//! deliberately minimal server: a prefix-trie router with positional
//! parameters, templated status pages, static file serving, and a blocking
//! accept loop that serves exactly one request per connection.
//!
//! # Example
//!
//! ```no_run
//! use hfs_http::protocol::Method;
//! use hfs_web::router::Router;
//! use hfs_web::server::Server;
//!
//! let mut router = Router::new();
//! router
//!     .register("/blogs/:slug", Method::Get, |req, res| {
//!         let slug = req.param("slug").unwrap_or_default();
//!         res.header("Content-Type", "text/plain").body(format!("reading {slug}"));
//!         Ok(())
//!     })
//!     .expect("route registration failed");
//!
//! let server = Server::builder()
//!     .address("127.0.0.1:7000")
//!     .router(router)
//!     .static_dir("./public")
//!     .build()
//!     .expect("server misconfigured");
//!
//! server.run().expect("server failed");
//! ```
//!
//! # Serving model
//!
//! Strictly single-threaded and synchronous: one connection is accepted,
//! fully read, parsed, routed, handled and responded to before the next
//! accept, and every response carries `Connection: close`. The routing trie
//! is built during registration and read-only while serving.

pub mod render;
pub mod router;
pub mod server;
pub mod static_files;
