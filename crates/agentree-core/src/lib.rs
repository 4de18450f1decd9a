// ABOUTME: Core types shared by the gateway, environment, and agent crates
// ABOUTME: Exposes configuration, benchmark capability records, and logging setup

pub mod agent_architecture;
pub mod benchmark;
pub mod config_manager;
pub mod error;
pub mod logging;

pub use agent_architecture::*;
pub use benchmark::*;
pub use config_manager::*;
pub use error::*;
pub use logging::init_tracing;
