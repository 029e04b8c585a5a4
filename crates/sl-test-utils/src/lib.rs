// sl-test-utils: shared test utilities for the scriptlink suites.
//
// Provides a scripted engine and an in-process TCP server spawner for
// integration testing of host and engine components.

pub mod recording;
pub mod scripted_engine;
pub mod test_server;

pub use recording::{RecordingSinks, host_session};
pub use scripted_engine::ScriptedEngine;
pub use test_server::TestServer;
