// Library surface for headless/integration tests and reuse.
// Terminal rendering and input mapping stay in the binary.
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod game;
pub mod layout;
pub mod logging;
pub mod report;
pub mod runtime;
pub mod schedule;
pub mod session;
pub mod util;
