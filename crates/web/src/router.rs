//! Trie-based request routing.
//!
//! Routes are registered as `/`-delimited paths whose segments are either
//! literals or `:name` parameters. Registration builds a trie of
//! [`RouteNode`]s once at startup; the trie is read-only while serving, so
//! it needs no synchronization as long as registration fully completes
//! before serving begins.
//!
//! Resolution walks the trie segment by segment. At each depth an exact
//! literal child always beats the parameter child, and there is no
//! backtracking: a literal branch that dead-ends deeper down does not fall
//! back to try the parameter sibling. This is a documented limitation of
//! the strict longest-literal-prefix policy, kept on purpose.

use std::collections::HashMap;
use std::error::Error;

use thiserror::Error;
use tracing::debug;

use hfs_http::protocol::{Method, Request, Response, StatusCode};
use hfs_http::uri::{ROOT_SEGMENT, split_path};

pub type BoxError = Box<dyn Error + Send + Sync>;

/// A route handler: reads the request, mutates the response. A returned
/// error is translated into a 5xx by the dispatcher.
pub type RouteHandler = Box<dyn Fn(&Request, &mut Response) -> Result<(), BoxError> + Send + Sync>;

/// An error handler: renders a complete response for the given status code
/// and reason. Must not fail further.
pub type ErrorHandler = Box<dyn Fn(StatusCode, &str, &Request, &mut Response) + Send + Sync>;

/// Route registration errors. All of them are configuration mistakes made
/// at startup, never produced while serving.
#[derive(Error, Debug)]
pub enum RouterError {
    #[error("invalid route path: {path} (must start with /)")]
    InvalidPath { path: String },

    #[error("parameter segment has no name in route: {path}")]
    EmptyParameterName { path: String },

    #[error("conflicting parameter names at the same depth: :{existing} vs :{requested}")]
    ParameterConflict { existing: String, requested: String },
}

/// What a segment of the trie matches.
#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
    /// Matches exactly this segment's literal.
    Literal,
    /// Matches any literal at this depth and binds it to the named request
    /// parameter.
    Parameter(String),
}

/// A node in the routing trie.
///
/// Invariant: a node has at most one parameter child, held separately from
/// the literal children.
struct RouteNode {
    kind: NodeKind,
    children: HashMap<String, RouteNode>,
    parameter_child: Option<Box<RouteNode>>,
    method_handlers: HashMap<Method, RouteHandler>,
    error_handlers: HashMap<StatusCode, ErrorHandler>,
}

impl RouteNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: HashMap::new(),
            parameter_child: None,
            method_handlers: HashMap::new(),
            error_handlers: HashMap::new(),
        }
    }

    fn parameter_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Parameter(name) => Some(name),
            NodeKind::Literal => None,
        }
    }
}

/// The outcome of route resolution.
pub enum Resolution<'router> {
    /// A handler is registered for this path and method.
    Handler(&'router RouteHandler),
    /// The path matched a node, but no handler is registered for the
    /// method. The caller maps this to `501 Not Implemented`.
    MethodMissing,
    /// No trie match. The caller decides whether to serve a static file
    /// or answer `404 Not Found`.
    NoRoute,
}

impl std::fmt::Debug for Resolution<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Handler(_) => f.write_str("Handler"),
            Self::MethodMissing => f.write_str("MethodMissing"),
            Self::NoRoute => f.write_str("NoRoute"),
        }
    }
}

/// The path-segment trie used for route resolution.
pub struct Router {
    root: RouteNode,
}

impl Router {
    pub fn new() -> Self {
        Self { root: RouteNode::new(NodeKind::Literal) }
    }

    /// Registers a handler for `method` at `path`.
    ///
    /// A path of `/` binds directly at the root. Segments beginning with
    /// `:` become the parameter child of their depth; registering two
    /// different parameter names at the same depth is rejected as a
    /// configuration conflict.
    pub fn register<H>(&mut self, path: &str, method: Method, handler: H) -> Result<(), RouterError>
    where
        H: Fn(&Request, &mut Response) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        debug!(path, method = %method, "registering route");
        let node = self.node_for_registration(path)?;
        node.method_handlers.insert(method, Box::new(handler));
        Ok(())
    }

    /// Registers an error handler for `status` at `path`.
    ///
    /// During error resolution the deepest registration along the request
    /// path wins over shallower ones.
    pub fn register_error_handler<H>(&mut self, path: &str, status: StatusCode, handler: H) -> Result<(), RouterError>
    where
        H: Fn(StatusCode, &str, &Request, &mut Response) + Send + Sync + 'static,
    {
        debug!(path, status = %status, "registering error handler");
        let node = self.node_for_registration(path)?;
        node.error_handlers.insert(status, Box::new(handler));
        Ok(())
    }

    fn node_for_registration(&mut self, path: &str) -> Result<&mut RouteNode, RouterError> {
        if !path.starts_with('/') {
            return Err(RouterError::InvalidPath { path: path.to_string() });
        }

        let mut node = &mut self.root;

        for segment in split_path(path) {
            if segment == ROOT_SEGMENT {
                continue;
            }

            if let Some(name) = segment.strip_prefix(':') {
                if name.is_empty() {
                    return Err(RouterError::EmptyParameterName { path: path.to_string() });
                }

                match &mut node.parameter_child {
                    Some(child) => {
                        // at most one parameter child per depth
                        if child.parameter_name() != Some(name) {
                            return Err(RouterError::ParameterConflict {
                                existing: child.parameter_name().unwrap_or_default().to_string(),
                                requested: name.to_string(),
                            });
                        }
                    }
                    None => {
                        node.parameter_child = Some(Box::new(RouteNode::new(NodeKind::Parameter(name.to_string()))));
                    }
                }

                node = node.parameter_child.as_mut().unwrap();
            } else {
                node = node.children.entry(segment).or_insert_with(|| RouteNode::new(NodeKind::Literal));
            }
        }

        Ok(node)
    }

    /// Resolves the request's path and method against the trie, binding any
    /// traversed parameter segments onto the request's `params` map.
    pub fn resolve(&self, request: &mut Request) -> Resolution<'_> {
        let Some(method) = request.method() else {
            return Resolution::NoRoute;
        };

        let segments = request.path_segments().to_vec();
        let mut node = &self.root;

        for segment in &segments {
            if segment.as_str() == ROOT_SEGMENT {
                node = &self.root;
            } else if let Some(child) = node.children.get(segment) {
                // exact literal match always beats the parameter child
                node = child;
            } else if let Some(child) = &node.parameter_child {
                if let Some(name) = child.parameter_name() {
                    request.add_param(name, segment.as_str());
                }
                node = child;
            } else {
                return Resolution::NoRoute;
            }
        }

        match node.method_handlers.get(&method) {
            Some(handler) => Resolution::Handler(handler),
            None => Resolution::MethodMissing,
        }
    }

    /// Finds the error handler for `status` along `segments`.
    ///
    /// Walks the same path the request walked and keeps overwriting the
    /// candidate with every node that has a handler registered for the
    /// status, so deeper registrations win over shallower ones. Returns
    /// `None` when no node along the path has one; the caller then falls
    /// back to the process-wide default error handler.
    pub fn resolve_error_handler(&self, segments: &[String], status: StatusCode) -> Option<&ErrorHandler> {
        let mut node = &self.root;
        let mut candidate = node.error_handlers.get(&status);

        for segment in segments {
            if segment.as_str() == ROOT_SEGMENT {
                node = &self.root;
            } else if let Some(child) = node.children.get(segment) {
                node = child;
            } else if let Some(child) = &node.parameter_child {
                node = child;
            } else {
                break;
            }

            if let Some(handler) = node.error_handlers.get(&status) {
                candidate = Some(handler);
            }
        }

        candidate
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hfs_http::codec::RequestDecoder;

    fn request_for(method: &str, path: &str) -> Request {
        RequestDecoder::new().decode(format!("{method} {path} HTTP/1.1\r\n\r\n").as_bytes())
    }

    fn noop(_req: &Request, _res: &mut Response) -> Result<(), BoxError> {
        Ok(())
    }

    #[test]
    fn test_register_then_resolve_literal() {
        let mut router = Router::new();
        router.register("/about", Method::Get, noop).unwrap();

        let mut request = request_for("GET", "/about");
        assert!(matches!(router.resolve(&mut request), Resolution::Handler(_)));
    }

    #[test]
    fn test_register_root() {
        let mut router = Router::new();
        router.register("/", Method::Get, noop).unwrap();

        let mut request = request_for("GET", "/");
        assert!(matches!(router.resolve(&mut request), Resolution::Handler(_)));
    }

    #[test]
    fn test_resolve_binds_parameter() {
        let mut router = Router::new();
        router
            .register("/blogs/:slug", Method::Get, |req: &Request, res: &mut Response| {
                res.body(format!("slug={}", req.param("slug").unwrap_or_default()));
                Ok(())
            })
            .unwrap();

        let mut request = request_for("GET", "/blogs/hello-world");
        let Resolution::Handler(handler) = router.resolve(&mut request) else {
            panic!("expected a handler");
        };

        assert_eq!(request.param("slug"), Some("hello-world"));

        let mut response = Response::new();
        handler(&request, &mut response).unwrap();
        assert_eq!(&response.current_body()[..], b"slug=hello-world");
    }

    #[test]
    fn test_literal_beats_parameter_at_same_depth() {
        let mut router = Router::new();
        router
            .register("/a/:x/b", Method::Get, |req: &Request, res: &mut Response| {
                res.body(format!("param={}", req.param("x").unwrap_or_default()));
                Ok(())
            })
            .unwrap();
        router
            .register("/a/literal/b", Method::Get, |_req: &Request, res: &mut Response| {
                res.body("literal");
                Ok(())
            })
            .unwrap();

        let mut request = request_for("GET", "/a/literal/b");
        let Resolution::Handler(handler) = router.resolve(&mut request) else {
            panic!("expected a handler");
        };

        // the literal child won, so no parameter was bound
        assert_eq!(request.param("x"), None);

        let mut response = Response::new();
        handler(&request, &mut response).unwrap();
        assert_eq!(&response.current_body()[..], b"literal");
    }

    #[test]
    fn test_no_backtracking_after_literal_dead_end() {
        let mut router = Router::new();
        router.register("/a/literal/c", Method::Get, noop).unwrap();
        router.register("/a/:x/b", Method::Get, noop).unwrap();

        // `literal` matches the literal branch, which has no `b` below it;
        // the parameter sibling is not retried
        let mut request = request_for("GET", "/a/literal/b");
        assert!(matches!(router.resolve(&mut request), Resolution::NoRoute));
    }

    #[test]
    fn test_method_missing() {
        let mut router = Router::new();
        router.register("/about", Method::Get, noop).unwrap();

        let mut request = request_for("DELETE", "/about");
        assert!(matches!(router.resolve(&mut request), Resolution::MethodMissing));
    }

    #[test]
    fn test_no_route() {
        let mut router = Router::new();
        router.register("/about", Method::Get, noop).unwrap();

        let mut request = request_for("GET", "/missing");
        assert!(matches!(router.resolve(&mut request), Resolution::NoRoute));
    }

    #[test]
    fn test_parameter_name_conflict_rejected() {
        let mut router = Router::new();
        router.register("/a/:x", Method::Get, noop).unwrap();

        let result = router.register("/a/:y", Method::Post, noop);
        assert!(matches!(result, Err(RouterError::ParameterConflict { .. })));
    }

    #[test]
    fn test_same_parameter_name_allowed() {
        let mut router = Router::new();
        router.register("/a/:x", Method::Get, noop).unwrap();
        router.register("/a/:x", Method::Post, noop).unwrap();

        let mut request = request_for("POST", "/a/42");
        assert!(matches!(router.resolve(&mut request), Resolution::Handler(_)));
        assert_eq!(request.param("x"), Some("42"));
    }

    #[test]
    fn test_invalid_registration_paths() {
        let mut router = Router::new();
        assert!(matches!(router.register("about", Method::Get, noop), Err(RouterError::InvalidPath { .. })));
        assert!(matches!(router.register("/a/:", Method::Get, noop), Err(RouterError::EmptyParameterName { .. })));
    }

    #[test]
    fn test_error_handler_deepest_wins() {
        let mut router = Router::new();
        router.register("/a/b", Method::Get, noop).unwrap();
        router
            .register_error_handler("/", StatusCode::NotFound, |_s, _r, _req, res: &mut Response| {
                res.body("root page");
            })
            .unwrap();
        router
            .register_error_handler("/a/b", StatusCode::NotFound, |_s, _r, _req, res: &mut Response| {
                res.body("deep page");
            })
            .unwrap();

        let segments = vec!["a".to_string(), "b".to_string()];
        let handler = router.resolve_error_handler(&segments, StatusCode::NotFound).unwrap();

        let request = request_for("GET", "/a/b");
        let mut response = Response::new();
        handler(StatusCode::NotFound, "gone", &request, &mut response);
        assert_eq!(&response.current_body()[..], b"deep page");
    }

    #[test]
    fn test_error_handler_none_registered() {
        let router = Router::new();
        let segments = vec!["a".to_string()];
        assert!(router.resolve_error_handler(&segments, StatusCode::NotFound).is_none());
    }
}
