//==============================================
// File: runtime/http.rs
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: HTTP bridge behind the `listen` builtin
// Objective: Accept requests forever, hand each one to a script handler on the
//            task pool, and map the handler's result onto a response
//==============================================

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;

use tiny_http::{Request, Response, Server};
use tracing::{debug, info, warn};

use crate::interpreter::{HashKey, HashPair, Object, RuntimeError, apply_function};

use super::tasks;

pub const NOT_FOUND_BODY: &str = "404 Not Found";

/// Binds every interface on `port` and serves until the process exits. Only
/// returns when binding fails or the pool cannot take more work.
pub fn serve(port: &str, handler: Object) -> Result<Object, RuntimeError> {
    let server = bind(port)?;
    let address = server.server_addr();

    let _ = writeln!(
        io::stdout(),
        "GatoScript server running at http://localhost:{}",
        port
    );
    info!(?address, "listening");

    for request in server.incoming_requests() {
        let handler = handler.clone();
        tasks::spawn_detached(move || dispatch(request, &handler))?;
    }
    Ok(Object::Null)
}

/// The IPv6 wildcard also takes IPv4 traffic on dual-stack hosts; hosts
/// without IPv6 get the IPv4 wildcard.
fn bind(port: &str) -> Result<Server, RuntimeError> {
    let v6 = format!("[::]:{}", port);
    let v4 = format!("0.0.0.0:{}", port);
    Server::http(&v6)
        .or_else(|err| {
            debug!(address = %v6, error = %err, "falling back to IPv4");
            Server::http(&v4)
        })
        .map_err(|err| RuntimeError::Server(format!("could not listen on :{}: {}", port, err)))
}

fn dispatch(request: Request, handler: &Object) {
    let incoming = IncomingRequest::from_request(&request);
    debug!(method = %incoming.method, path = %incoming.path, "dispatching request");

    let result = apply_function(handler, vec![incoming.into_object()]);
    let (status, body) = response_for(&result);
    if status == 500 {
        warn!(path = %request.url(), error = %body, "handler failed");
    }

    let response = Response::from_string(body).with_status_code(status);
    if let Err(err) = request.respond(response) {
        warn!(error = %err, "failed to write response");
    }
}

/// The fields a handler sees, as strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingRequest {
    pub method: String,
    /// URL path with any query string removed.
    pub path: String,
    /// `Host` header, empty when absent.
    pub host: String,
}

impl IncomingRequest {
    fn from_request(request: &Request) -> Self {
        let host = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("Host"))
            .map(|header| header.value.as_str().to_string())
            .unwrap_or_default();
        Self {
            method: request.method().to_string(),
            path: strip_query(request.url()).to_string(),
            host,
        }
    }

    /// `{"method": ..., "path": ..., "host": ...}`
    pub fn into_object(self) -> Object {
        let entries: HashMap<HashKey, HashPair> = [
            ("method", self.method),
            ("path", self.path),
            ("host", self.host),
        ]
        .into_iter()
        .map(|(key, value)| {
            (
                HashKey::String(Arc::from(key)),
                HashPair {
                    key: Object::from(key),
                    value: Object::from(value),
                },
            )
        })
        .collect();
        Object::Hash(Arc::new(entries))
    }
}

fn strip_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(path, _)| path)
}

/// Error values become 500 with the bare message, Null becomes 404, and
/// anything else is a 200 carrying its display form.
pub fn response_for(result: &Object) -> (u16, String) {
    match result {
        Object::Error(message) => (500, message.to_string()),
        Object::Null => (404, NOT_FOUND_BODY.to_string()),
        other => (200, other.to_string()),
    }
}
