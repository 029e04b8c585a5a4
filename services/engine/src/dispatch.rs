//! Request routing.
//!
//! Decodes one request envelope, routes by method, and renders every
//! handler failure into an `{ok: false}` response.  Nothing escapes to
//! the connection loop except I/O; the worker keeps serving after any
//! handler error.

use crate::bus::EventBus;
use crate::eval::ScriptEngine;
use serde_json::Value;
use sl_protocol::{DispatchArgs, PollArgs, Request, Response, methods};
use std::sync::Arc;
use tracing::debug;

pub struct Dispatcher {
    engine: Arc<dyn ScriptEngine>,
    bus: Arc<EventBus>,
}

impl Dispatcher {
    pub fn new(engine: Arc<dyn ScriptEngine>, bus: Arc<EventBus>) -> Self {
        Dispatcher { engine, bus }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Routes one decoded request.  Never fails; errors become
    /// responses carrying the request id.
    pub fn handle(&self, request: Request) -> Response {
        let id = request.id;
        debug!(id, method = %request.method, "request");
        let outcome = match request.method.as_str() {
            methods::DISPATCH_EVENT => self.dispatch_event(request.args),
            methods::POLL_EVENTS => self.poll_events(request.args),
            methods::PING => Ok(Value::String("pong".to_owned())),
            method => Err(format!("Unknown method: {method}")),
        };
        match outcome {
            Ok(result) => Response::success(id, result),
            Err(error) => Response::failure(Some(id), error),
        }
    }

    /// Renders a request whose payload never yielded an envelope; the
    /// id is unknown, so the response omits it.
    pub fn undecodable(error: &serde_json::Error) -> Response {
        Response::failure(None, format!("bad request: {error}"))
    }

    fn dispatch_event(&self, args: Value) -> Result<Value, String> {
        let args: DispatchArgs =
            serde_json::from_value(args).map_err(|e| format!("dispatchEvent args: {e}"))?;
        let result = self
            .engine
            .evaluate(args, &self.bus)
            .map_err(|e| e.to_string())?;
        serde_json::to_value(result).map_err(|e| e.to_string())
    }

    fn poll_events(&self, args: Value) -> Result<Value, String> {
        let args: PollArgs = if args.is_null() {
            PollArgs::default()
        } else {
            serde_json::from_value(args).map_err(|e| format!("pollEvents args: {e}"))?
        };
        serde_json::to_value(self.bus.poll(args.cursor)).map_err(|e| e.to_string())
    }
}
