// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod debounce;
pub mod focus;
pub mod gesture;
pub mod logging;
pub mod runtime;
pub mod session;
pub mod sim;
pub mod spatial;
pub mod steps;
pub mod training;
