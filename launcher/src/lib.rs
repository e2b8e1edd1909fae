// Library interface for the CalcDesk launcher
// Shared by the headless binary and the desktop shell

pub mod bootstrap;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod launcher;
pub mod logging;
pub mod readiness;
pub mod supervisor;
pub mod window;

/// Version string generated by build.rs
pub const BUILD_INFO: &str = env!("BUILD_INFO");
