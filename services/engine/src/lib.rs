// engine: scriptlink script-engine server.
//
// Accepts framed-JSON RPC connections, routes them through the
// dispatcher into the evaluator seam, and serves the append-only event
// log behind cursor polls.

pub mod bus;
pub mod config;
pub mod dispatch;
pub mod eval;
pub mod server;

pub use bus::EventBus;
pub use config::{EngineConfig, load_config};
pub use dispatch::Dispatcher;
pub use eval::{EchoEngine, EngineError, ScriptEngine};
