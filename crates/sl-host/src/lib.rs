// sl-host: script-host client for the scriptlink engine protocol.
//
// One reconnect-per-request transport, one state-tracking session per
// evaluation context, and an optional background follow driver that
// polls the engine's event log.

pub mod error;
pub mod preload;
pub mod session;
pub mod sinks;
pub mod transport;

mod follow;

pub use error::HostError;
pub use preload::{DirResolver, PathResolver, PreloadBuilder, StaticPreload};
pub use session::{HostSession, SessionConfig};
pub use sinks::{CommandSink, EventSink, LogSink, TracingLogSink};
pub use transport::RpcTransport;
